//! The in-memory test script shared by the document and binary forms.

use serde::{Deserialize, Deserializer, Serialize};

fn default_cycles_number() -> u16 {
    1
}

/// A test script: how many times to run it and the commands to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestScript {
    #[serde(default = "default_cycles_number")]
    pub cycles_number: u16,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
}

impl Default for TestScript {
    fn default() -> Self {
        Self {
            cycles_number: default_cycles_number(),
            commands: Vec::new(),
        }
    }
}

impl TestScript {
    pub fn cmd_number(&self) -> usize {
        self.commands.len()
    }
}

/// One command sent to the device and, optionally, the response it must produce.
///
/// Names are symbolic identifiers or two-digit hex literals; payloads are
/// lists of two-digit hex strings. An absent payload means zero bytes; an
/// empty list in a document is read as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub cmd_name: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub cmd_payload: Option<Vec<String>>,
    #[serde(default)]
    pub expected_rsp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsp_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub rsp_payload: Option<Vec<String>>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.filter(|p| !p.is_empty()))
}

fn payload_of(payload: &[&str]) -> Option<Vec<String>> {
    (!payload.is_empty()).then(|| payload.iter().map(|s| s.to_string()).collect())
}

impl CommandEntry {
    /// A command with no payload and no expected response.
    pub fn command(name: impl Into<String>) -> Self {
        Self {
            cmd_name: name.into(),
            cmd_payload: None,
            expected_rsp: false,
            rsp_name: None,
            rsp_payload: None,
        }
    }

    /// Set the command payload; an empty payload is left absent.
    pub fn with_payload(mut self, payload: &[&str]) -> Self {
        self.cmd_payload = payload_of(payload);
        self
    }

    /// Expect response `name`; an empty payload is left absent.
    pub fn expecting(mut self, name: impl Into<String>, payload: &[&str]) -> Self {
        self.expected_rsp = true;
        self.rsp_name = Some(name.into());
        self.rsp_payload = payload_of(payload);
        self
    }
}
