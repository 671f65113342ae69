/// Decode failures. All of them abort the current decode; the decoder never
/// skips or resynchronizes past a malformed instruction.
///
/// Offsets in the stream-level variants are relative to the opcode
/// sub-array. Add the container's header length to locate the byte in the
/// file itself.
#[derive(thiserror::Error, Debug)]
pub enum ScriptError {
    #[error("unrecognized magic signature, expected \"BSXScript 3.0\"..\"3.3\"")]
    UnsupportedFormat,

    #[error("list data out of range: offset=0x{offset:X} len=0x{len:X} file_len=0x{file_len:X}")]
    TruncatedContainer {
        offset: usize,
        len: usize,
        file_len: usize,
    },

    #[error("opcode stream ends early: need {need} bytes at offset {offset}, len={len}")]
    TruncatedStream {
        offset: usize,
        need: usize,
        len: usize,
    },

    #[error("invalid opcode: 0x{opcode:02X} at offset {offset}")]
    InvalidOpcode { opcode: u8, offset: usize },

    #[error("selector {selector} out of range [{min}, {max}] at offset {offset}")]
    SelectorOutOfRange {
        selector: u16,
        min: u16,
        max: u16,
        offset: usize,
    },

    #[error("invalid selector {selector} at offset {offset}")]
    InvalidSelector { selector: u16, offset: usize },

    #[error("invalid message subtype {subtype} at offset {offset}")]
    InvalidMessageSubtype { subtype: u8, offset: usize },

    #[error("{table} index {index} out of range ({len} entries) at offset {offset}")]
    SymbolIndexOutOfRange {
        table: &'static str,
        index: i64,
        len: usize,
        offset: usize,
    },

    #[error("negative element count {count} at offset {offset}")]
    InvalidCount { count: i32, offset: usize },

    #[error("save buffer too small for a checksum: {len} bytes")]
    TruncatedSave { len: usize },
}
