//! File-to-file conversions behind the `json2hex` and `hex2json` tools.

use std::path::{Path, PathBuf};

use crate::config::ToolConfig;
use crate::container::IntelHex;
use crate::document::{DocumentFormat, DocumentStore};
use crate::error::{Error, Result};
use crate::script::TestScript;

pub const HEX_EXTENSION: &str = "hex";

/// `input` with its extension replaced by `extension`.
pub fn derive_output_path(input: impl AsRef<Path>, extension: &str) -> PathBuf {
    input.as_ref().with_extension(extension)
}

fn resolve_output(input: &Path, output: Option<&Path>, extension: &str) -> Result<PathBuf> {
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => derive_output_path(input, extension),
    };
    if output == input {
        return Err(Error::Config(format!(
            "output {} would overwrite the input",
            output.display()
        )));
    }
    Ok(output)
}

/// Encode the document at `input` into an Intel HEX image. Returns the path written.
pub fn document_to_hex(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    config: &ToolConfig,
) -> Result<PathBuf> {
    let input = input.as_ref();
    let output = resolve_output(input, output, HEX_EXTENSION)?;
    log::info!("Input file: {}", input.display());
    log::info!("Output file: {}", output.display());

    let store = DocumentStore::for_path(input, config.document_format);
    let script = store.load(input)?;

    let mut image = IntelHex::new();
    let end = script.to_container(&mut image, config.base_address)?;
    log::info!(
        "{} commands, {} cycles, written to 0x{:X}..0x{:X}",
        script.cmd_number(),
        script.cycles_number,
        config.base_address,
        end
    );

    image.save(&output)?;
    Ok(output)
}

/// Decode the script in the Intel HEX image at `input` into a document.
///
/// Without an explicit output path the document format comes from the
/// configuration, defaulting to JSON.
pub fn hex_to_document(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    config: &ToolConfig,
) -> Result<PathBuf> {
    let input = input.as_ref();
    let format = match (config.document_format, output) {
        (Some(format), _) => format,
        (None, Some(path)) => DocumentFormat::from_path(path),
        (None, None) => DocumentFormat::default(),
    };
    let output = resolve_output(input, output, format.extension())?;
    log::info!("Input file: {}", input.display());
    log::info!("Output file: {}", output.display());

    let image = IntelHex::load(input)?;
    log::debug!("image holds {} bytes", image.len());
    let script = TestScript::from_container(&image, config.base_address)?;
    log::info!(
        "{} commands, {} cycles, read from 0x{:X}",
        script.cmd_number(),
        script.cycles_number,
        config.base_address
    );

    DocumentStore::new(format).save(&script, &output)?;
    Ok(output)
}
