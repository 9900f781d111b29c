use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use spitest_core::config::parse_address;
use spitest_core::convert::document_to_hex;
use spitest_core::ToolConfig;

/// Encode an SPI command test script document into an Intel HEX flash image
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Test script document (.json, .yaml)
    input: PathBuf,

    /// Output image; defaults to the input path with a .hex extension
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address of the script header, in hex (overrides the configuration)
    #[arg(short, long, value_parser = parse_address)]
    base_address: Option<u32>,
}

fn run(args: Args) -> Result<()> {
    let mut config = ToolConfig::load_or_default(args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(base_address) = args.base_address {
        config.base_address = base_address;
    }

    env_logger::Builder::new()
        .filter_level(config.logger.level_filter)
        .parse_default_env()
        .init();

    document_to_hex(&args.input, args.output.as_deref(), &config)
        .with_context(|| format!("failed to encode {}", args.input.display()))?;

    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        // The logger may not be up yet if the configuration failed to load.
        if log::log_enabled!(log::Level::Error) {
            log::error!("Error: {:#}", e);
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_arguments() {
        let args = Args::parse_from(["json2hex", "script.json", "-b", "0x8000", "-o", "out.hex"]);
        assert_eq!(args.input, PathBuf::from("script.json"));
        assert_eq!(args.output, Some(PathBuf::from("out.hex")));
        assert_eq!(args.base_address, Some(0x8000));
        assert_eq!(args.config, None);
    }

    #[test]
    fn rejects_bad_base_address() {
        assert!(Args::try_parse_from(["json2hex", "script.json", "-b", "flash"]).is_err());
    }
}
