//! Human-editable test script documents (JSON or YAML).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::script::TestScript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.yaml` / `.yml` are YAML; everything else is treated as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Yaml => "yaml",
        }
    }

    pub fn parse(self, text: &str) -> Result<TestScript> {
        let script: TestScript = match self {
            DocumentFormat::Json => serde_json::from_str(text)?,
            DocumentFormat::Yaml => serde_yaml::from_str(text)?,
        };
        Ok(script)
    }

    pub fn render(self, script: &TestScript) -> Result<String> {
        let mut text = match self {
            DocumentFormat::Json => serde_json::to_string_pretty(script)?,
            DocumentFormat::Yaml => serde_yaml::to_string(script)?,
        };
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }
}

/// Reads and writes test script documents in one format.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentStore {
    format: DocumentFormat,
}

impl DocumentStore {
    pub fn new(format: DocumentFormat) -> Self {
        Self { format }
    }

    /// Store for `path`, honouring an explicit format if one is given.
    pub fn for_path(path: impl AsRef<Path>, format: Option<DocumentFormat>) -> Self {
        Self::new(format.unwrap_or_else(|| DocumentFormat::from_path(path)))
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<TestScript> {
        let text = std::fs::read_to_string(path)?;
        self.format.parse(&text)
    }

    pub fn save(&self, script: &TestScript, path: impl AsRef<Path>) -> Result<()> {
        let text = self.format.render(script)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
