//! End-to-end decode of synthetic containers built through the real header
//! indirection.

use pretty_assertions::assert_eq;

use bsx_script::{
    decompile, ChecksumStatus, Instruction, SaveFile, ScriptError, ScriptFile, Version,
};

/// Data placed after the last header word lives from 0xA8 on.
const HEADER_LEN: usize = 0xA8;

struct ContainerBuilder {
    bytes: Vec<u8>,
}

impl ContainerBuilder {
    fn new(magic: &[u8; 16]) -> ContainerBuilder {
        let mut bytes = vec![0u8; HEADER_LEN];
        bytes[..16].copy_from_slice(magic);
        ContainerBuilder { bytes }
    }

    fn put_u32(&mut self, field: usize, value: u32) {
        self.bytes[field..field + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Append a data blob and record its absolute offset and length in the
    /// given header fields.
    fn append(&mut self, offset_field: usize, size_field: usize, data: &[u8]) {
        let offset = self.bytes.len() as u32;
        self.put_u32(offset_field, offset);
        self.put_u32(size_field, data.len() as u32);
        self.bytes.extend_from_slice(data);
    }

    fn opcodes(&mut self, data: &[u8]) {
        self.append(0x2C, 0x30, data);
    }

    fn functions(&mut self, entries: &[(&str, i32)]) {
        let mut metadata = Vec::new();
        let mut content = Vec::new();
        let mut unit_offset = 0u32;
        for (name, address) in entries {
            metadata.extend_from_slice(&address.to_le_bytes());
            metadata.extend_from_slice(&unit_offset.to_le_bytes());
            unit_offset += append_utf16(&mut content, name);
        }
        self.append(0x38, 0x3C, &metadata);
        self.append(0x40, 0x44, &content);
    }

    fn name_list(&mut self, metadata_fields: (usize, usize), content_fields: (usize, usize), names: &[&str]) {
        let mut metadata = Vec::new();
        let mut content = Vec::new();
        let mut unit_offset = 0u32;
        for name in names {
            metadata.extend_from_slice(&unit_offset.to_le_bytes());
            unit_offset += append_utf16(&mut content, name);
        }
        self.append(metadata_fields.0, metadata_fields.1, &metadata);
        self.append(content_fields.0, content_fields.1, &content);
    }

    fn variables(&mut self, slot: usize, names: &[&str]) {
        let base = 0x48 + slot * 0x10;
        self.name_list((base, base + 4), (base + 8, base + 12), names);
    }

    fn characters(&mut self, names: &[&str]) {
        self.name_list((0x88, 0x8C), (0x90, 0x94), names);
    }

    fn messages(&mut self, names: &[&str]) {
        self.name_list((0x98, 0x9C), (0xA0, 0xA4), names);
    }

    fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// NUL-terminated UTF-16LE append; returns the number of code units written.
fn append_utf16(content: &mut Vec<u8>, name: &str) -> u32 {
    let units: Vec<u16> = name.encode_utf16().chain([0u16]).collect();
    for unit in &units {
        content.extend_from_slice(&unit.to_le_bytes());
    }
    units.len() as u32
}

fn minimal_container(opcodes: &[u8]) -> ContainerBuilder {
    let mut builder = ContainerBuilder::new(b"BSXScript 3.0\x00\x00\x00");
    builder.opcodes(opcodes);
    builder.functions(&[("Start", 0)]);
    for slot in 0..4 {
        builder.variables(slot, &[]);
    }
    builder.characters(&[]);
    builder.messages(&[]);
    builder
}

#[test]
fn label_and_nop_stream_decodes_symbolically() {
    let bytes = minimal_container(&[0x38, 0x00, 0x00, 0x00, 0x00, 0x41]).build();
    let file = ScriptFile::parse(bytes).unwrap();
    assert_eq!(file.version(), Version::V3_0);

    let script = decompile(&file).unwrap();
    assert_eq!(script.functions.len(), 1);
    assert_eq!(script.functions[0].name, "Start");
    assert_eq!(script.functions[0].address, 0);
    assert_eq!(
        script.instructions,
        vec![
            Instruction {
                type_tag: "38 256".into(),
                arguments: vec!["Start".into()],
            },
            Instruction {
                type_tag: "41 261".into(),
                arguments: vec![],
            },
        ]
    );
}

#[test]
fn unassigned_opcode_aborts_the_decode() {
    let bytes = minimal_container(&[0x99]).build();
    let file = ScriptFile::parse(bytes).unwrap();
    let err = decompile(&file).unwrap_err();
    assert!(matches!(
        err,
        ScriptError::InvalidOpcode {
            opcode: 0x99,
            offset: 0
        }
    ));
}

#[test]
fn message_resolves_through_the_message_table() {
    let mut builder = ContainerBuilder::new(b"BSXScript 3.1\x00\x00\x00");
    builder.opcodes(&[0x1D, 0x00, 0x00, 0x00, 0x00, 0x00]);
    builder.functions(&[]);
    for slot in 0..4 {
        builder.variables(slot, &[]);
    }
    builder.characters(&[]);
    builder.messages(&["Hello"]);

    let file = ScriptFile::parse(builder.build()).unwrap();
    let script = decompile(&file).unwrap();
    assert_eq!(
        script.instructions,
        vec![Instruction {
            type_tag: "1D 256".into(),
            arguments: vec!["Hello".into()],
        }]
    );
}

#[test]
fn decode_is_repeatable_on_the_same_container() {
    let bytes = minimal_container(&[0x41, 0x41]).build();
    let file = ScriptFile::parse(bytes).unwrap();
    let first = decompile(&file).unwrap();
    let second = decompile(&file).unwrap();
    assert_eq!(first.instructions, second.instructions);
    assert_eq!(first.functions, second.functions);
}

#[test]
fn save_checksum_follows_the_opcode_region() {
    let bytes = minimal_container(&[0x38, 0x00, 0x00, 0x00, 0x00, 0x41]).build();
    let file = ScriptFile::parse(bytes).unwrap();
    let opcodes = file.opcode_bytes().unwrap();

    let mut save = SaveFile::new(vec![b'x'; 64]);
    assert_eq!(
        save.set_updated_checksum(&opcodes).unwrap(),
        ChecksumStatus::Updated
    );
    assert_eq!(
        save.set_updated_checksum(&opcodes).unwrap(),
        ChecksumStatus::Unchanged
    );

    // the stored digest is plain lowercase hex text
    let checksum = save.checksum().unwrap();
    assert_eq!(checksum.len(), 32);
    assert!(checksum
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn truncated_list_data_is_reported() {
    let mut builder = minimal_container(&[0x41]);
    // point the message content past the end of the file
    builder.put_u32(0xA0, 0xFFFF);
    builder.put_u32(0xA4, 16);
    let file = ScriptFile::parse(builder.build()).unwrap();
    assert!(matches!(
        decompile(&file).unwrap_err(),
        ScriptError::TruncatedContainer { .. }
    ));
}
