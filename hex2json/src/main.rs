use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use spitest_core::config::parse_address;
use spitest_core::convert::hex_to_document;
use spitest_core::ToolConfig;

/// Decode an SPI command test script from an Intel HEX flash image into a document
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Intel HEX flash image
    input: PathBuf,

    /// Output document; defaults to the input path with a .json (or configured format) extension
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

    hex_to_document(&args.input, args.output.as_deref(), &config)
        .with_context(|| format!("failed to decode {}", args.input.display()))?;

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
