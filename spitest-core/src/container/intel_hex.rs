//! Intel HEX image backed by a sparse address map.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::ByteContainer;
use crate::error::{Error, Result};

const DATA: u8 = 0x00;
const END_OF_FILE: u8 = 0x01;
const EXTENDED_SEGMENT_ADDRESS: u8 = 0x02;
const START_SEGMENT_ADDRESS: u8 = 0x03;
const EXTENDED_LINEAR_ADDRESS: u8 = 0x04;
const START_LINEAR_ADDRESS: u8 = 0x05;

/// Maximum data bytes per emitted record.
const LINE_LIMIT: usize = 16;

/// Execution start address carried by type 03 / 05 records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAddress {
    Segment { cs: u16, ip: u16 },
    Linear(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntelHex {
    data: BTreeMap<u32, u8>,
    padding: u8,
    start_address: Option<StartAddress>,
}

impl Default for IntelHex {
    fn default() -> Self {
        Self::new()
    }
}

struct Record {
    kind: u8,
    offset: u16,
    data: Vec<u8>,
}

impl IntelHex {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            padding: 0xFF,
            start_address: None,
        }
    }

    /// Number of written bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn start_address(&self) -> Option<StartAddress> {
        self.start_address
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse Intel HEX text. Anything after the end-of-file record is ignored,
    /// and a missing end-of-file record is tolerated.
    pub fn parse(text: &str) -> Result<Self> {
        let mut hex = Self::new();
        let mut base = 0u32;

        for (ix, line) in text.lines().enumerate() {
            let line_no = ix + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fail = |reason: String| Error::ContainerFormat {
                line: line_no,
                reason,
            };

            let record = decode_record(line).map_err(fail)?;
            match record.kind {
                DATA => {
                    for (i, value) in record.data.iter().enumerate() {
                        let addr = base
                            .checked_add(record.offset as u32 + i as u32)
                            .ok_or_else(|| fail("data runs past address 0xFFFFFFFF".to_string()))?;
                        if hex.data.insert(addr, *value).is_some() {
                            return Err(fail(format!("address 0x{:X} written twice", addr)));
                        }
                    }
                }
                END_OF_FILE => break,
                EXTENDED_SEGMENT_ADDRESS => {
                    base = u16::from_be_bytes([record.data[0], record.data[1]]) as u32 * 16;
                }
                EXTENDED_LINEAR_ADDRESS => {
                    base = (u16::from_be_bytes([record.data[0], record.data[1]]) as u32) << 16;
                }
                START_SEGMENT_ADDRESS => {
                    hex.start_address = Some(StartAddress::Segment {
                        cs: u16::from_be_bytes([record.data[0], record.data[1]]),
                        ip: u16::from_be_bytes([record.data[2], record.data[3]]),
                    });
                }
                START_LINEAR_ADDRESS => {
                    hex.start_address = Some(StartAddress::Linear(u32::from_be_bytes([
                        record.data[0],
                        record.data[1],
                        record.data[2],
                        record.data[3],
                    ])));
                }
                _ => unreachable!("record type checked by decode_record"),
            }
        }

        Ok(hex)
    }

    /// Write the image as Intel HEX. Data records never span a gap or a 64 KiB
    /// boundary; a type 04 record precedes every change of the upper address.
    pub fn write_hex<W: Write>(&self, mut out: W) -> io::Result<()> {
        match self.start_address {
            Some(StartAddress::Segment { cs, ip }) => {
                let mut data = [0u8; 4];
                data[..2].copy_from_slice(&cs.to_be_bytes());
                data[2..].copy_from_slice(&ip.to_be_bytes());
                write_record(&mut out, 0, START_SEGMENT_ADDRESS, &data)?;
            }
            Some(StartAddress::Linear(addr)) => {
                write_record(&mut out, 0, START_LINEAR_ADDRESS, &addr.to_be_bytes())?;
            }
            None => {}
        }

        let mut current_upper: Option<u16> = None;
        let mut line_addr = 0u32;
        let mut line: Vec<u8> = Vec::with_capacity(LINE_LIMIT);

        for (&addr, &value) in &self.data {
            let extends_line = !line.is_empty()
                && line.len() < LINE_LIMIT
                && addr == line_addr.wrapping_add(line.len() as u32)
                && addr >> 16 == line_addr >> 16;

            if !extends_line {
                if !line.is_empty() {
                    write_record(&mut out, line_addr as u16, DATA, &line)?;
                    line.clear();
                }
                let upper = (addr >> 16) as u16;
                if current_upper != Some(upper) {
                    if upper != 0 || current_upper.is_some() {
                        write_record(&mut out, 0, EXTENDED_LINEAR_ADDRESS, &upper.to_be_bytes())?;
                    }
                    current_upper = Some(upper);
                }
                line_addr = addr;
            }
            line.push(value);
        }
        if !line.is_empty() {
            write_record(&mut out, line_addr as u16, DATA, &line)?;
        }

        write_record(&mut out, 0, END_OF_FILE, &[])
    }

    pub fn to_hex_string(&self) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_hex(&mut out);
        String::from_utf8_lossy(&out).into_owned()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_hex(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl ByteContainer for IntelHex {
    fn get(&self, address: u32) -> u8 {
        self.data.get(&address).copied().unwrap_or(self.padding)
    }

    fn set(&mut self, address: u32, value: u8) {
        self.data.insert(address, value);
    }

    fn is_set(&self, address: u32) -> bool {
        self.data.contains_key(&address)
    }
}

fn decode_record(line: &str) -> std::result::Result<Record, String> {
    let digits = line
        .strip_prefix(':')
        .ok_or_else(|| "record does not start with ':'".to_string())?;
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err("record contains non-hex characters".to_string());
    }
    let bytes: Vec<u8> = (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| e.to_string())?;
    if bytes.len() < 5 {
        return Err("record is too short".to_string());
    }

    let count = bytes[0] as usize;
    if bytes.len() != count + 5 {
        return Err(format!(
            "declared {} data bytes, found {}",
            count,
            bytes.len() - 5
        ));
    }
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != 0 {
        return Err(format!("bad checksum 0x{:02X}", bytes[bytes.len() - 1]));
    }

    let kind = bytes[3];
    let expected_len = match kind {
        DATA => None,
        END_OF_FILE => Some(0),
        EXTENDED_SEGMENT_ADDRESS | EXTENDED_LINEAR_ADDRESS => Some(2),
        START_SEGMENT_ADDRESS | START_LINEAR_ADDRESS => Some(4),
        other => return Err(format!("unknown record type 0x{:02X}", other)),
    };
    if let Some(expected) = expected_len {
        if count != expected {
            return Err(format!(
                "record type 0x{:02X} needs {} data bytes, found {}",
                kind, expected, count
            ));
        }
    }

    Ok(Record {
        kind,
        offset: u16::from_be_bytes([bytes[1], bytes[2]]),
        data: bytes[4..4 + count].to_vec(),
    })
}

fn write_record<W: Write>(out: &mut W, offset: u16, kind: u8, data: &[u8]) -> io::Result<()> {
    let mut checksum = data.len() as u8;
    checksum = checksum.wrapping_add((offset >> 8) as u8);
    checksum = checksum.wrapping_add((offset & 0xff) as u8);
    checksum = checksum.wrapping_add(kind);

    write!(out, ":{:02X}{:04X}{:02X}", data.len(), offset, kind)?;
    for b in data {
        write!(out, "{:02X}", b)?;
        checksum = checksum.wrapping_add(*b);
    }
    writeln!(out, "{:02X}", (!checksum).wrapping_add(1))
}
