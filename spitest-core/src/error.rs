use std::fmt;

use thiserror::Error;

/// Which fixed-size payload slot of a command record a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Command,
    Response,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Command => write!(f, "command"),
            Slot::Response => write!(f, "response"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document format error: {0}")]
    DocumentFormat(String),

    #[error("container format error at line {line}: {reason}")]
    ContainerFormat { line: usize, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("malformed identifier `{name}`: not a known name nor a hex byte")]
    MalformedIdentifier { name: String },

    #[error("malformed payload byte `{value}`: expected one or two hex digits")]
    MalformedPayloadByte { value: String },

    #[error("{slot} payload of {len} bytes exceeds the {capacity}-byte slot")]
    PayloadTooLarge {
        slot: Slot,
        len: usize,
        capacity: usize,
    },

    #[error("command #{index} expects a response but has no rsp_name")]
    MissingResponseName { index: usize },

    #[error("{count} commands do not fit the one-byte command count")]
    TooManyCommands { count: usize },

    #[error("{len} bytes at 0x{base:X} run past the end of the 32-bit address space")]
    AddressOverflow { base: u32, len: u64 },

    #[error("no script header at 0x{address:X}")]
    MissingScript { address: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::DocumentFormat(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::DocumentFormat(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
