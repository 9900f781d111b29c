//! spitest-core
//!
//! Converts SPI command test scripts between their human-editable document form
//! and the fixed-layout records the device firmware reads from flash.
//!
//! The binary side is any [`container::ByteContainer`]; [`container::IntelHex`]
//! is the one the tools use. The document side is JSON or YAML through
//! [`document::DocumentStore`].

pub mod codec;
pub mod config;
pub mod container;
pub mod convert;
pub mod document;
pub mod error;
pub mod ids;
pub mod record;
pub mod script;

pub use codec::ScriptCodec;
pub use config::ToolConfig;
pub use container::{ByteContainer, IntelHex};
pub use document::{DocumentFormat, DocumentStore};
pub use error::{Error, Result};
pub use script::{CommandEntry, TestScript};
