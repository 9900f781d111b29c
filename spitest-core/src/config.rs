//! Tool configuration loaded from TOML.

use std::path::Path;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::document::DocumentFormat;
use crate::error::{Error, Result};

/// Flash address of the script header in the reference firmware image.
pub const DEFAULT_BASE_ADDRESS: u32 = 0xE8001;

/// Logger configuration used by the conversion tools.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LoggerConfig {
    pub level_filter: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { level_filter: LevelFilter::Info }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ToolConfig {
    /// Absolute address of the script header inside the image.
    pub base_address: u32,
    /// Document format; chosen from the file extension when unset.
    pub document_format: Option<DocumentFormat>,
    pub logger: LoggerConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            base_address: DEFAULT_BASE_ADDRESS,
            document_format: None,
            logger: LoggerConfig::default(),
        }
    }
}

impl ToolConfig {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ToolConfig = toml::from_str(text)?;
        Ok(config)
    }

    /// Load `path` if given, else the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::new(path),
            None => Ok(Self::default()),
        }
    }
}

/// Parse an address written as hex, with or without a `0x` prefix.
pub fn parse_address(text: &str) -> Result<u32> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::Config(format!("invalid address `{}`", text)));
    }
    u32::from_str_radix(digits, 16).map_err(|e| Error::Config(format!("invalid address `{}`: {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config = ToolConfig::from_toml("").unwrap();
        assert_eq!(config.base_address, DEFAULT_BASE_ADDRESS);
        assert_eq!(config.document_format, None);
        assert_eq!(config.logger.level_filter, LevelFilter::Info);
    }

    #[test]
    fn reads_all_fields() {
        let config = ToolConfig::from_toml(
            r#"
            base_address = 0x8000
            document_format = "yaml"

            [logger]
            level_filter = "DEBUG"
            "#,
        )
        .unwrap();
        assert_eq!(config.base_address, 0x8000);
        assert_eq!(config.document_format, Some(DocumentFormat::Yaml));
        assert_eq!(config.logger.level_filter, LevelFilter::Debug);
    }

    #[test]
    fn rejects_bad_config() {
        assert!(matches!(
            ToolConfig::from_toml("base_address = \"high\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ToolConfig::from_toml("document_format = \"xml\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn parses_addresses() {
        assert_eq!(parse_address("0xE8001").unwrap(), 0xE8001);
        assert_eq!(parse_address("0Xe8001").unwrap(), 0xE8001);
        assert_eq!(parse_address("e8001").unwrap(), 0xE8001);
        assert!(parse_address("").is_err());
        assert!(parse_address("0x").is_err());
        assert!(parse_address("+10").is_err());
        assert!(parse_address("123456789").is_err());
    }
}
