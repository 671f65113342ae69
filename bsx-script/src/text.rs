//! Offset-table string decoding.
//!
//! Each symbol table is a (metadata, content) pair: the metadata records
//! hold one offset per entry, the content is a packed run of UTF-16LE
//! names. The stored offsets count double-byte code units, not bytes, and
//! every name ends with a two-byte NUL that is never part of the text.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::ScriptError;

/// One function-table entry. The address is the literal 32-bit word from
/// the metadata record, presumed to be an engine jump target; it is kept
/// unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: String,
    pub address: i32,
}

const CODE_UNIT: usize = 2;

fn read_record(metadata: &[u8], offset: usize) -> Result<u32, ScriptError> {
    match metadata.get(offset..offset + 4) {
        Some(word) => Ok(LittleEndian::read_u32(word)),
        None => Err(ScriptError::TruncatedContainer {
            offset,
            len: 4,
            file_len: metadata.len(),
        }),
    }
}

fn name_at(content: &[u8], start: usize, end: usize) -> Result<String, ScriptError> {
    if end > content.len() || end < start + CODE_UNIT {
        return Err(ScriptError::TruncatedContainer {
            offset: start,
            len: end.saturating_sub(start),
            file_len: content.len(),
        });
    }
    // drop the trailing double-byte NUL before decoding
    let raw = &content[start..end - CODE_UNIT];
    let (text, had_errors) = encoding_rs::UTF_16LE.decode_without_bom_handling(raw);
    if had_errors {
        log::warn!("malformed UTF-16 in name table at byte {}", start);
    }
    Ok(text.into_owned())
}

/// Recover the names, in table order. An entry runs from its own offset to
/// the next entry's offset; the last entry runs to the end of the content.
fn collect_names(content: &[u8], offsets: &[usize]) -> Result<Vec<String>, ScriptError> {
    let mut names = Vec::with_capacity(offsets.len());
    for (i, &start) in offsets.iter().enumerate() {
        let end = match offsets.get(i + 1) {
            Some(&next) => next,
            None => content.len(),
        };
        names.push(name_at(content, start, end)?);
    }
    Ok(names)
}

/// Decode a plain string table (variables, characters, messages): one u32
/// offset per 4-byte metadata record. The element count is
/// `metadata.len() >> shift`, with the shift a per-list format constant.
pub fn decode_names(
    metadata: &[u8],
    content: &[u8],
    shift: u32,
) -> Result<Vec<String>, ScriptError> {
    let count = metadata.len() >> shift;
    let stride = 1usize << shift;

    let mut offsets = Vec::with_capacity(count);
    for i in 0..count {
        offsets.push(read_record(metadata, i * stride)? as usize * CODE_UNIT);
    }

    collect_names(content, &offsets)
}

/// Decode the function table: 8-byte metadata records, a 32-bit address
/// followed by the name offset used exactly as in [`decode_names`].
pub fn decode_functions(
    metadata: &[u8],
    content: &[u8],
    shift: u32,
) -> Result<Vec<FunctionEntry>, ScriptError> {
    let count = metadata.len() >> shift;
    let stride = 1usize << shift;

    let mut addresses = Vec::with_capacity(count);
    let mut offsets = Vec::with_capacity(count);
    for i in 0..count {
        let record = i * stride;
        addresses.push(read_record(metadata, record)? as i32);
        offsets.push(read_record(metadata, record + 4)? as usize * CODE_UNIT);
    }

    let names = collect_names(content, &offsets)?;
    Ok(addresses
        .into_iter()
        .zip(names)
        .map(|(address, name)| FunctionEntry { name, address })
        .collect())
}
