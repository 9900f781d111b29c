//! Fixed-size command record layout.
//!
//! ```text
//! header   : cycles_hi cycles_lo count                      (3 bytes)
//! command  : id len payload[len] 0xFF..                     (2 + 116 bytes)
//! response : expected id len payload[len] 0xFF..            (3 + 117 bytes)
//! ```
//!
//! Without an expected response, the response id and length are `0xFF` and the
//! payload slot is all padding. Every record is [`RECORD_SIZE`] bytes whatever
//! its payload lengths.

use crate::error::{Error, Result, Slot};
use crate::ids::{format_hex_byte, parse_hex_byte, IdTables};
use crate::script::CommandEntry;

/// Unused bytes and the id/length sentinels of an absent response.
pub const FILL: u8 = 0xFF;

pub const HEADER_SIZE: u32 = 3;
pub const CMD_PAYLOAD_CAPACITY: usize = 116;
pub const CMD_SLOT_SIZE: u32 = 2 + CMD_PAYLOAD_CAPACITY as u32;
pub const RSP_PAYLOAD_CAPACITY: usize = 117;
pub const RSP_SLOT_SIZE: u32 = 3 + RSP_PAYLOAD_CAPACITY as u32;
pub const RECORD_SIZE: u32 = CMD_SLOT_SIZE + RSP_SLOT_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub id: u8,
    pub payload: Vec<u8>,
}

/// A command entry with identifiers resolved and payloads parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub id: u8,
    pub payload: Vec<u8>,
    pub response: Option<ResponseRecord>,
}

impl CommandRecord {
    /// Resolve and validate `entry`, the `index`-th command of its script.
    pub fn from_entry(index: usize, entry: &CommandEntry, tables: &IdTables) -> Result<Self> {
        let id = tables.commands.resolve(&entry.cmd_name)?;
        let payload = parse_payload(entry.cmd_payload.as_deref(), Slot::Command)?;

        let response = if entry.expected_rsp {
            let name = entry
                .rsp_name
                .as_deref()
                .ok_or(Error::MissingResponseName { index })?;
            Some(ResponseRecord {
                id: tables.responses.resolve(name)?,
                payload: parse_payload(entry.rsp_payload.as_deref(), Slot::Response)?,
            })
        } else {
            None
        };

        Ok(Self {
            id,
            payload,
            response,
        })
    }

    pub fn to_entry(&self, tables: &IdTables) -> CommandEntry {
        let mut entry = CommandEntry {
            cmd_name: tables.commands.describe(self.id),
            cmd_payload: format_payload(&self.payload),
            expected_rsp: false,
            rsp_name: None,
            rsp_payload: None,
        };
        if let Some(rsp) = &self.response {
            entry.expected_rsp = true;
            entry.rsp_name = Some(tables.responses.describe(rsp.id));
            entry.rsp_payload = format_payload(&rsp.payload);
        }
        entry
    }

    /// The record's bytes, always exactly [`RECORD_SIZE`] long.
    pub fn serialize_to_binary(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(RECORD_SIZE as usize);

        data.push(self.id);
        data.push(self.payload.len() as u8);
        data.extend_from_slice(&self.payload);
        data.resize(CMD_SLOT_SIZE as usize, FILL);

        match &self.response {
            Some(rsp) => {
                data.push(1);
                data.push(rsp.id);
                data.push(rsp.payload.len() as u8);
                data.extend_from_slice(&rsp.payload);
            }
            None => data.extend_from_slice(&[0, FILL, FILL]),
        }
        data.resize(RECORD_SIZE as usize, FILL);

        data
    }
}

pub fn capacity_of(slot: Slot) -> usize {
    match slot {
        Slot::Command => CMD_PAYLOAD_CAPACITY,
        Slot::Response => RSP_PAYLOAD_CAPACITY,
    }
}

fn parse_payload(payload: Option<&[String]>, slot: Slot) -> Result<Vec<u8>> {
    let payload = payload.unwrap_or_default();
    let capacity = capacity_of(slot);
    if payload.len() > capacity {
        return Err(Error::PayloadTooLarge {
            slot,
            len: payload.len(),
            capacity,
        });
    }
    payload
        .iter()
        .map(|value| {
            parse_hex_byte(value).ok_or_else(|| Error::MalformedPayloadByte {
                value: value.clone(),
            })
        })
        .collect()
}

fn format_payload(payload: &[u8]) -> Option<Vec<String>> {
    if payload.is_empty() {
        None
    } else {
        Some(payload.iter().map(|b| format_hex_byte(*b)).collect())
    }
}
