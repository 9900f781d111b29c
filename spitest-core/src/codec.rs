//! Walks a [`ByteContainer`] with a running address cursor, writing or reading
//! the script header followed by one fixed-size record per command.

use crate::container::ByteContainer;
use crate::error::{Error, Result, Slot};
use crate::ids::{IdTables, ID_TABLES};
use crate::record::{
    capacity_of, CommandRecord, ResponseRecord, CMD_PAYLOAD_CAPACITY, HEADER_SIZE,
    RECORD_SIZE, RSP_PAYLOAD_CAPACITY, RSP_SLOT_SIZE,
};
use crate::script::TestScript;

pub struct Encoder<'a, C: ByteContainer> {
    container: &'a mut C,
    cursor: u32,
}

impl<'a, C: ByteContainer> Encoder<'a, C> {
    pub fn new(container: &'a mut C, base: u32) -> Self {
        Self {
            container,
            cursor: base,
        }
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn put_u8(&mut self, value: u8) {
        self.container.set(self.cursor, value);
        self.cursor = self.cursor.wrapping_add(1);
    }

    pub fn put_bytes(&mut self, values: &[u8]) {
        for value in values {
            self.put_u8(*value);
        }
    }
}

pub struct Decoder<'a, C: ByteContainer> {
    container: &'a C,
    cursor: u32,
}

impl<'a, C: ByteContainer> Decoder<'a, C> {
    pub fn new(container: &'a C, base: u32) -> Self {
        Self {
            container,
            cursor: base,
        }
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn read_u8(&mut self) -> u8 {
        let value = self.container.get(self.cursor);
        self.cursor = self.cursor.wrapping_add(1);
        value
    }

    pub fn read_bytes(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.read_u8()).collect()
    }

    pub fn skip(&mut self, len: u32) {
        self.cursor = self.cursor.wrapping_add(len);
    }

    /// Read a length byte and its payload, then skip to the end of the slot.
    fn read_payload(&mut self, slot: Slot) -> Result<Vec<u8>> {
        let capacity = capacity_of(slot);
        let len = self.read_u8() as usize;
        if len > capacity {
            return Err(Error::PayloadTooLarge {
                slot,
                len,
                capacity,
            });
        }
        let payload = self.read_bytes(len);
        self.skip((capacity - len) as u32);
        Ok(payload)
    }
}

/// Address just past a script of `count` records at `base`.
fn script_end(base: u32, count: u8) -> Result<u32> {
    let len = HEADER_SIZE as u64 + count as u64 * RECORD_SIZE as u64;
    u32::try_from(base as u64 + len).map_err(|_| Error::AddressOverflow { base, len })
}

/// Converts between a [`TestScript`] and its binary image.
#[derive(Debug, Clone, Copy)]
pub struct ScriptCodec<'t> {
    tables: &'t IdTables,
}

impl Default for ScriptCodec<'static> {
    fn default() -> Self {
        Self::new(&ID_TABLES)
    }
}

impl<'t> ScriptCodec<'t> {
    pub fn new(tables: &'t IdTables) -> Self {
        Self { tables }
    }

    /// Write `script` at `base` and return the address just past the last record.
    ///
    /// Every entry is validated before the first byte is written.
    pub fn encode<C: ByteContainer>(
        &self,
        script: &TestScript,
        container: &mut C,
        base: u32,
    ) -> Result<u32> {
        let count = script.cmd_number();
        let count = u8::try_from(count).map_err(|_| Error::TooManyCommands { count })?;
        let records = script
            .commands
            .iter()
            .enumerate()
            .map(|(index, entry)| CommandRecord::from_entry(index, entry, self.tables))
            .collect::<Result<Vec<_>>>()?;
        let end = script_end(base, count)?;

        let mut encoder = Encoder::new(container, base);
        encoder.put_bytes(&script.cycles_number.to_be_bytes());
        encoder.put_u8(count);

        for (index, record) in records.iter().enumerate() {
            log::debug!("command #{} at 0x{:X}", index, encoder.cursor());
            encoder.put_bytes(&record.serialize_to_binary());
        }
        debug_assert_eq!(encoder.cursor(), end);

        Ok(end)
    }

    /// Read a script previously written at `base`.
    ///
    /// Fails with [`Error::MissingScript`] when the image holds none of the
    /// header bytes.
    pub fn decode<C: ByteContainer>(&self, container: &C, base: u32) -> Result<TestScript> {
        script_end(base, 0)?;
        let present = (0..HEADER_SIZE)
            .filter(|i| container.is_set(base + i))
            .count();
        if present == 0 {
            return Err(Error::MissingScript { address: base });
        }
        if present < HEADER_SIZE as usize {
            log::warn!("script header at 0x{:X} is not fully present in the image", base);
        }

        let mut decoder = Decoder::new(container, base);
        let cycles_number = u16::from_be_bytes([decoder.read_u8(), decoder.read_u8()]);
        let count = decoder.read_u8();
        script_end(base, count)?;

        let mut commands = Vec::with_capacity(count as usize);
        for index in 0..count {
            let start = decoder.cursor();
            log::debug!("command #{} at 0x{:X}", index, start);
            let record = self.read_record(&mut decoder)?;
            debug_assert_eq!(decoder.cursor(), start + RECORD_SIZE);
            commands.push(record.to_entry(self.tables));
        }

        Ok(TestScript {
            cycles_number,
            commands,
        })
    }

    fn read_record<C: ByteContainer>(&self, decoder: &mut Decoder<'_, C>) -> Result<CommandRecord> {
        let id = decoder.read_u8();
        let payload = decoder.read_payload(Slot::Command)?;

        let flag_addr = decoder.cursor();
        let flag = decoder.read_u8();
        if flag > 1 {
            log::warn!("response flag 0x{:02X} at 0x{:X} read as expected", flag, flag_addr);
        }

        let response = if flag != 0 {
            let id = decoder.read_u8();
            let payload = decoder.read_payload(Slot::Response)?;
            Some(ResponseRecord { id, payload })
        } else {
            decoder.skip(RSP_SLOT_SIZE - 1);
            None
        };

        Ok(CommandRecord {
            id,
            payload,
            response,
        })
    }
}

impl TestScript {
    /// Decode a script from `container` using the built-in identifier tables.
    pub fn from_container<C: ByteContainer>(container: &C, base: u32) -> Result<Self> {
        ScriptCodec::default().decode(container, base)
    }

    /// Encode into `container` using the built-in identifier tables.
    pub fn to_container<C: ByteContainer>(&self, container: &mut C, base: u32) -> Result<u32> {
        ScriptCodec::default().encode(self, container, base)
    }
}

// Payload capacities must fit the one-byte length fields.
const _: () = assert!(CMD_PAYLOAD_CAPACITY <= u8::MAX as usize);
const _: () = assert!(RSP_PAYLOAD_CAPACITY <= u8::MAX as usize);

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::container::IntelHex;
    use crate::record::{CMD_SLOT_SIZE, FILL};
    use crate::script::CommandEntry;
    use pretty_assertions::assert_eq;

    const BASE: u32 = 0xE8001;

    fn bytes_at(image: &BTreeMap<u32, u8>, start: u32, len: u32) -> Vec<u8> {
        (start..start + len).map(|a| ByteContainer::get(image, a)).collect()
    }

    fn sample_script() -> TestScript {
        TestScript {
            cycles_number: 500,
            commands: vec![
                CommandEntry::command("StartApplication")
                    .expecting("StartApplicationRsp", &["01", "02", "03"]),
                CommandEntry::command("StartAdvertising")
                    .with_payload(&["00", "A0", "FF"])
                    .expecting("UnavailableCmd", &[]),
                CommandEntry::command("GotoSleep"),
                CommandEntry::command("2A")
                    .with_payload(&["10"])
                    .expecting("7E", &["55"]),
            ],
        }
    }

    #[test]
    fn encodes_single_command_example() {
        let script = TestScript {
            cycles_number: 3,
            commands: vec![CommandEntry::command("GotoSleep")],
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        let end = script.to_container(&mut image, BASE).unwrap();

        assert_eq!(end, BASE + HEADER_SIZE + RECORD_SIZE);
        assert_eq!(image.len(), (HEADER_SIZE + RECORD_SIZE) as usize);
        assert_eq!(bytes_at(&image, BASE, 5), vec![0x00, 0x03, 0x01, 0x11, 0x00]);

        let cmd = BASE + HEADER_SIZE;
        assert!(bytes_at(&image, cmd + 2, 116).iter().all(|b| *b == FILL));
        assert_eq!(bytes_at(&image, cmd + CMD_SLOT_SIZE, 3), vec![0x00, 0xFF, 0xFF]);
        assert!(bytes_at(&image, cmd + CMD_SLOT_SIZE + 3, 117)
            .iter()
            .all(|b| *b == FILL));
    }

    #[test]
    fn empty_script_is_header_only() {
        let script = TestScript {
            cycles_number: 1,
            commands: Vec::new(),
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        let end = script.to_container(&mut image, BASE).unwrap();
        assert_eq!(end, BASE + 3);
        assert_eq!(bytes_at(&image, BASE, 3), vec![0x00, 0x01, 0x00]);
        assert_eq!(image.len(), 3);

        assert_eq!(TestScript::from_container(&image, BASE).unwrap(), script);
    }

    #[test]
    fn cycles_number_is_big_endian() {
        let script = TestScript {
            cycles_number: 0x1234,
            commands: Vec::new(),
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        script.to_container(&mut image, 0).unwrap();
        assert_eq!(bytes_at(&image, 0, 2), vec![0x12, 0x34]);
    }

    #[test]
    fn round_trips_through_image() {
        let script = sample_script();
        let mut image = IntelHex::new();
        let end = script.to_container(&mut image, BASE).unwrap();
        assert_eq!(end, BASE + HEADER_SIZE + 4 * RECORD_SIZE);

        assert_eq!(TestScript::from_container(&image, BASE).unwrap(), script);
    }

    #[test]
    fn record_offsets_do_not_depend_on_payload_length() {
        let second = CommandEntry::command("GotoSleep");
        let mut ends = Vec::new();
        for payload_len in [0usize, 1, 57, CMD_PAYLOAD_CAPACITY] {
            let mut first = CommandEntry::command("StartAdvertising");
            first.cmd_payload = (payload_len > 0).then(|| vec!["AB".to_string(); payload_len]);
            let script = TestScript {
                cycles_number: 1,
                commands: vec![first, second.clone()],
            };
            let mut image: BTreeMap<u32, u8> = BTreeMap::new();
            ends.push(script.to_container(&mut image, BASE).unwrap());

            let second_start = BASE + HEADER_SIZE + RECORD_SIZE;
            assert_eq!(ByteContainer::get(&image, second_start), 0x11);
            assert_eq!(TestScript::from_container(&image, BASE).unwrap(), script);
        }
        assert!(ends.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn identifier_resolution() {
        let script = TestScript {
            cycles_number: 1,
            commands: vec![
                CommandEntry::command("StartApplication"),
                CommandEntry::command("2A"),
            ],
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        script.to_container(&mut image, 0).unwrap();
        assert_eq!(ByteContainer::get(&image, 3), 0x10);
        assert_eq!(ByteContainer::get(&image, 3 + RECORD_SIZE), 0x2A);

        let decoded = TestScript::from_container(&image, 0).unwrap();
        assert_eq!(decoded.commands[0].cmd_name, "StartApplication");
        assert_eq!(decoded.commands[1].cmd_name, "2A");
    }

    #[test]
    fn no_response_decodes_without_response_fields() {
        let script = TestScript {
            cycles_number: 2,
            commands: vec![CommandEntry::command("GotoSleep")],
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        script.to_container(&mut image, 0).unwrap();
        let decoded = TestScript::from_container(&image, 0).unwrap();
        let entry = &decoded.commands[0];
        assert!(!entry.expected_rsp);
        assert_eq!(entry.rsp_name, None);
        assert_eq!(entry.rsp_payload, None);
    }

    #[test]
    fn failed_encode_writes_nothing() {
        let script = TestScript {
            cycles_number: 1,
            commands: vec![
                CommandEntry::command("GotoSleep"),
                CommandEntry::command("NotACommand"),
            ],
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        assert!(matches!(
            script.to_container(&mut image, 0),
            Err(Error::MalformedIdentifier { .. })
        ));
        assert!(image.is_empty());
    }

    #[test]
    fn rejects_more_than_255_commands() {
        let script = TestScript {
            cycles_number: 1,
            commands: vec![CommandEntry::command("GotoSleep"); 256],
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        assert!(matches!(
            script.to_container(&mut image, 0),
            Err(Error::TooManyCommands { count: 256 })
        ));
    }

    #[test]
    fn decode_rejects_corrupt_length_bytes() {
        let script = TestScript {
            cycles_number: 1,
            commands: vec![CommandEntry::command("GotoSleep")],
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        script.to_container(&mut image, 0).unwrap();
        ByteContainer::set(&mut image, HEADER_SIZE + 1, 200);

        assert!(matches!(
            TestScript::from_container(&image, 0),
            Err(Error::PayloadTooLarge {
                slot: Slot::Command,
                len: 200,
                ..
            })
        ));
    }

    #[test]
    fn nonzero_flag_means_response_expected() {
        let script = TestScript {
            cycles_number: 1,
            commands: vec![CommandEntry::command("GotoSleep").expecting("UnavailableCmd", &[])],
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        script.to_container(&mut image, 0).unwrap();
        ByteContainer::set(&mut image, HEADER_SIZE + CMD_SLOT_SIZE, 0x02);

        assert_eq!(TestScript::from_container(&image, 0).unwrap(), script);
    }

    #[test]
    fn custom_tables_are_honoured() {
        static COMMANDS: &[(&str, u8)] = &[("Ping", 0x01)];
        static RESPONSES: &[(&str, u8)] = &[("Pong", 0x81)];
        let tables = IdTables {
            commands: crate::ids::IdTable::new(COMMANDS),
            responses: crate::ids::IdTable::new(RESPONSES),
        };
        let codec = ScriptCodec::new(&tables);
        let script = TestScript {
            cycles_number: 1,
            commands: vec![CommandEntry::command("Ping").expecting("Pong", &[])],
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        codec.encode(&script, &mut image, 0).unwrap();
        assert_eq!(ByteContainer::get(&image, 3), 0x01);
        assert_eq!(codec.decode(&image, 0).unwrap(), script);
    }

    #[test]
    fn rejects_scripts_past_the_address_space() {
        let script = TestScript {
            cycles_number: 1,
            commands: vec![CommandEntry::command("GotoSleep")],
        };
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        assert!(matches!(
            script.to_container(&mut image, 0xFFFF_FFF0),
            Err(Error::AddressOverflow {
                base: 0xFFFF_FFF0,
                len: 241
            })
        ));
        assert!(image.is_empty());

        // Highest base whose end address is still representable.
        let base = u32::MAX - (HEADER_SIZE + RECORD_SIZE);
        assert_eq!(script.to_container(&mut image, base).unwrap(), u32::MAX);
        assert_eq!(image.keys().next(), Some(&base));
    }

    #[test]
    fn decode_rejects_counts_past_the_address_space() {
        let base = u32::MAX - HEADER_SIZE;
        let mut image: BTreeMap<u32, u8> = BTreeMap::new();
        for (i, b) in [0x00, 0x01, 0x02].iter().enumerate() {
            ByteContainer::set(&mut image, base + i as u32, *b);
        }
        assert!(matches!(
            TestScript::from_container(&image, base),
            Err(Error::AddressOverflow { .. })
        ));

        ByteContainer::set(&mut image, base + 2, 0x00);
        assert_eq!(
            TestScript::from_container(&image, base).unwrap(),
            TestScript::default()
        );
    }

    #[test]
    fn decode_reports_missing_script() {
        let image: BTreeMap<u32, u8> = BTreeMap::new();
        assert!(matches!(
            TestScript::from_container(&image, BASE),
            Err(Error::MissingScript { address: BASE })
        ));
    }
}
