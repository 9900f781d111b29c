//! Symbolic command and response identifiers understood by the device firmware.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Command identifiers, in declaration order.
pub const COMMAND_IDS: &[(&str, u8)] = &[
    ("StartApplication", 0x10),
    ("GotoSleep", 0x11),
    ("StartAdvertising", 0x12),
];

/// Response identifiers, in declaration order.
pub const RESPONSE_IDS: &[(&str, u8)] = &[
    ("StartApplicationRsp", 0x90),
    ("StartAdvertisingRsp", 0x92),
    ("UnavailableCmd", 0xF0),
];

/// A read-only name <-> code mapping.
///
/// Reverse lookups resolve to the first declared name carrying the code, so
/// the result does not depend on hash ordering.
#[derive(Debug, Clone)]
pub struct IdTable {
    entries: &'static [(&'static str, u8)],
    by_name: HashMap<&'static str, u8>,
}

impl IdTable {
    pub fn new(entries: &'static [(&'static str, u8)]) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (name, code) in entries {
            by_name.entry(*name).or_insert(*code);
        }
        Self { entries, by_name }
    }

    pub fn code_of(&self, name: &str) -> Option<u8> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, code: u8) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(name, _)| *name)
    }

    /// Resolve a name to its code, falling back to a hex literal such as `2A`.
    pub fn resolve(&self, name: &str) -> Result<u8> {
        if let Some(code) = self.code_of(name) {
            return Ok(code);
        }
        let code = parse_hex_byte(name).ok_or_else(|| Error::MalformedIdentifier {
            name: name.to_string(),
        })?;
        log::debug!("`{}` is not a symbolic name, using literal 0x{:02X}", name, code);
        Ok(code)
    }

    /// Name for a code, or its two-digit hex form when unmapped.
    pub fn describe(&self, code: u8) -> String {
        match self.name_of(code) {
            Some(name) => name.to_string(),
            None => format_hex_byte(code),
        }
    }
}

/// Both identifier tables, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct IdTables {
    pub commands: IdTable,
    pub responses: IdTable,
}

impl Default for IdTables {
    fn default() -> Self {
        Self {
            commands: IdTable::new(COMMAND_IDS),
            responses: IdTable::new(RESPONSE_IDS),
        }
    }
}

lazy_static::lazy_static! {
    pub static ref ID_TABLES: IdTables = IdTables::default();
}

/// Parse one or two ASCII hex digits.
pub fn parse_hex_byte(text: &str) -> Option<u8> {
    if text.is_empty() || text.len() > 2 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(text, 16).ok()
}

pub fn format_hex_byte(value: u8) -> String {
    format!("{:02X}", value)
}
