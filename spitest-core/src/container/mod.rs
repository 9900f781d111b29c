//! Addressable byte storage the codec reads from and writes to.

mod intel_hex;

pub use intel_hex::{IntelHex, StartAddress};

use std::collections::BTreeMap;

/// Memory indexed by absolute address.
///
/// Sparse implementations decide what an unwritten address reads as.
pub trait ByteContainer {
    fn get(&self, address: u32) -> u8;

    fn set(&mut self, address: u32, value: u8);

    /// Whether `address` holds a written byte rather than a fill value.
    fn is_set(&self, _address: u32) -> bool {
        true
    }
}

/// Plain sparse map; unwritten addresses read as `0xFF`.
impl ByteContainer for BTreeMap<u32, u8> {
    fn get(&self, address: u32) -> u8 {
        BTreeMap::get(self, &address).copied().unwrap_or(0xFF)
    }

    fn set(&mut self, address: u32, value: u8) {
        BTreeMap::insert(self, address, value);
    }

    fn is_set(&self, address: u32) -> bool {
        BTreeMap::contains_key(self, &address)
    }
}
