use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::ScriptError;

/// The magic signature is technically 13 ASCII bytes, but the engine
/// reserves 16 for alignment, so the trailing padding participates in the
/// comparison.
pub const MAGIC_LEN: usize = 16;

/// Number of lists addressed by the container header.
pub const LIST_COUNT: usize = 8;

/// Container format revisions. All four currently share one header layout,
/// but the engine bumps the magic with each release, so they stay distinct
/// here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V3_0,
    V3_1,
    V3_2,
    V3_3,
}

impl Version {
    /// Exact byte-for-byte match against the known magics. No trimming, no
    /// case folding.
    pub fn from_magic(magic: &[u8; MAGIC_LEN]) -> Option<Version> {
        match magic {
            b"BSXScript 3.0\x00\x00\x00" => Some(Version::V3_0),
            b"BSXScript 3.1\x00\x00\x00" => Some(Version::V3_1),
            b"BSXScript 3.2\x00\x00\x00" => Some(Version::V3_2),
            b"BSXScript 3.3\x00\x00\x00" => Some(Version::V3_3),
            _ => None,
        }
    }

    /// Header locator table for this revision.
    pub fn layout(self) -> &'static [ListLocator; LIST_COUNT] {
        match self {
            Version::V3_0 | Version::V3_1 | Version::V3_2 | Version::V3_3 => &BSX3_LAYOUT,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Version::V3_0 => "3.0",
            Version::V3_1 => "3.1",
            Version::V3_2 => "3.2",
            Version::V3_3 => "3.3",
        })
    }
}

/// The eight lists, in header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListId {
    Opcodes = 0,
    Functions = 1,
    Variables1 = 2,
    Variables2 = 3,
    Variables3 = 4,
    Variables4 = 5,
    Characters = 6,
    Messages = 7,
}

impl ListId {
    /// The four generic variable lists, in slot order.
    pub const VARIABLES: [ListId; 4] = [
        ListId::Variables1,
        ListId::Variables2,
        ListId::Variables3,
        ListId::Variables4,
    ];
}

/// Whether a list carries a metadata section. The opcode list is
/// content-only: its header entry has no metadata words at all, rather than
/// words that happen to read as zero.
#[derive(Debug, Clone, Copy)]
pub enum ListKind {
    ContentOnly,
    ContentWithMetadata {
        metadata_offset_field: usize,
        metadata_size_field: usize,
    },
}

/// One header entry. The fields are byte positions *within the header*; the
/// actual absolute offsets and byte lengths are read from those positions at
/// extraction time. `shift` converts a metadata byte length into an element
/// count (the shift amounts are hardcoded in the engine executable, not
/// stored in the file).
#[derive(Debug, Clone, Copy)]
pub struct ListLocator {
    pub kind: ListKind,
    pub content_offset_field: usize,
    pub content_size_field: usize,
    pub shift: u32,
}

const fn with_metadata(
    metadata_offset_field: usize,
    metadata_size_field: usize,
    content_offset_field: usize,
    content_size_field: usize,
    shift: u32,
) -> ListLocator {
    ListLocator {
        kind: ListKind::ContentWithMetadata {
            metadata_offset_field,
            metadata_size_field,
        },
        content_offset_field,
        content_size_field,
        shift,
    }
}

static BSX3_LAYOUT: [ListLocator; LIST_COUNT] = [
    // opcodes
    ListLocator {
        kind: ListKind::ContentOnly,
        content_offset_field: 0x2C,
        content_size_field: 0x30,
        shift: 0,
    },
    // functions/labels
    with_metadata(0x38, 0x3C, 0x40, 0x44, 3),
    // generic variable lists 1-4
    with_metadata(0x48, 0x4C, 0x50, 0x54, 2),
    with_metadata(0x58, 0x5C, 0x60, 0x64, 2),
    with_metadata(0x68, 0x6C, 0x70, 0x74, 2),
    with_metadata(0x78, 0x7C, 0x80, 0x84, 2),
    // character names
    with_metadata(0x88, 0x8C, 0x90, 0x94, 2),
    // dialogue messages
    with_metadata(0x98, 0x9C, 0xA0, 0xA4, 2),
];

/// Raw bytes of one list: the metadata records and the packed content.
/// Content-only lists get an empty metadata buffer.
#[derive(Debug, Clone, Default)]
pub struct RawList {
    pub metadata: Vec<u8>,
    pub content: Vec<u8>,
}

/// A loaded script container. The buffer and version are fixed at parse
/// time; everything else is derived on demand.
#[derive(Debug, Clone)]
pub struct ScriptFile {
    bytes: Vec<u8>,
    version: Version,
}

impl ScriptFile {
    /// Validate the magic signature and wrap the buffer.
    pub fn parse(bytes: Vec<u8>) -> Result<ScriptFile, ScriptError> {
        let magic: &[u8; MAGIC_LEN] = bytes
            .get(..MAGIC_LEN)
            .and_then(|m| m.try_into().ok())
            .ok_or(ScriptError::UnsupportedFormat)?;
        let version = Version::from_magic(magic).ok_or(ScriptError::UnsupportedFormat)?;
        Ok(ScriptFile { bytes, version })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn read_u32(&self, offset: usize) -> Result<u32, ScriptError> {
        match self.bytes.get(offset..offset + 4) {
            Some(word) => Ok(LittleEndian::read_u32(word)),
            None => Err(ScriptError::TruncatedContainer {
                offset,
                len: 4,
                file_len: self.bytes.len(),
            }),
        }
    }

    fn copy_range(&self, offset: usize, len: usize) -> Result<Vec<u8>, ScriptError> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ScriptError::TruncatedContainer {
                offset,
                len,
                file_len: self.bytes.len(),
            })?;
        Ok(self.bytes[offset..end].to_vec())
    }

    /// Extract the raw bytes of one list through the header indirection:
    /// the locator names where the offset/size words live, the words name
    /// where the data lives.
    pub fn raw_list(&self, id: ListId) -> Result<RawList, ScriptError> {
        let locator = self.version.layout()[id as usize];

        let metadata = match locator.kind {
            ListKind::ContentOnly => Vec::new(),
            ListKind::ContentWithMetadata {
                metadata_offset_field,
                metadata_size_field,
            } => {
                let offset = self.read_u32(metadata_offset_field)? as usize;
                let len = self.read_u32(metadata_size_field)? as usize;
                self.copy_range(offset, len)?
            }
        };

        let offset = self.read_u32(locator.content_offset_field)? as usize;
        let len = self.read_u32(locator.content_size_field)? as usize;
        let content = self.copy_range(offset, len)?;

        Ok(RawList { metadata, content })
    }

    /// The flat opcode byte array (content of list 0). This is also the
    /// region the save-file checksum is computed over.
    pub fn opcode_bytes(&self) -> Result<Vec<u8>, ScriptError> {
        Ok(self.raw_list(ListId::Opcodes)?.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u32(bytes: &mut [u8], field: usize, value: u32) {
        bytes[field..field + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn container_with_lists() -> Vec<u8> {
        let mut bytes = vec![0u8; 0x100];
        bytes[..16].copy_from_slice(b"BSXScript 3.2\x00\x00\x00");

        // opcode content at 0xA8, 3 bytes
        put_u32(&mut bytes, 0x2C, 0xA8);
        put_u32(&mut bytes, 0x30, 3);
        bytes[0xA8..0xAB].copy_from_slice(&[0x41, 0x41, 0x41]);

        // functions metadata at 0xB0 (8 bytes), content at 0xB8 (4 bytes)
        put_u32(&mut bytes, 0x38, 0xB0);
        put_u32(&mut bytes, 0x3C, 8);
        put_u32(&mut bytes, 0x40, 0xB8);
        put_u32(&mut bytes, 0x44, 4);
        bytes[0xB8] = 0x41;

        bytes
    }

    #[test]
    fn version_detection() {
        assert_eq!(
            Version::from_magic(b"BSXScript 3.0\x00\x00\x00"),
            Some(Version::V3_0)
        );
        assert_eq!(
            Version::from_magic(b"BSXScript 3.3\x00\x00\x00"),
            Some(Version::V3_3)
        );
        // padding is part of the match
        assert_eq!(Version::from_magic(b"BSXScript 3.0 \x00\x00"), None);
        assert_eq!(Version::from_magic(b"BSXScript 3.4\x00\x00\x00"), None);
    }

    #[test]
    fn parse_rejects_unknown_magic() {
        let err = ScriptFile::parse(b"not a script file".to_vec()).unwrap_err();
        assert!(matches!(err, ScriptError::UnsupportedFormat));
    }

    #[test]
    fn parse_rejects_short_buffer() {
        let err = ScriptFile::parse(b"BSX".to_vec()).unwrap_err();
        assert!(matches!(err, ScriptError::UnsupportedFormat));
    }

    #[test]
    fn raw_list_matches_stored_sizes() {
        let file = ScriptFile::parse(container_with_lists()).unwrap();

        let opcodes = file.raw_list(ListId::Opcodes).unwrap();
        assert_eq!(opcodes.content.len(), 3);
        assert!(opcodes.metadata.is_empty());

        let functions = file.raw_list(ListId::Functions).unwrap();
        assert_eq!(functions.metadata.len(), 8);
        assert_eq!(functions.content.len(), 4);
        assert_eq!(functions.content[0], 0x41);
    }

    #[test]
    fn raw_list_rejects_out_of_range_slice() {
        let mut bytes = container_with_lists();
        // claim more opcode bytes than the file holds
        put_u32(&mut bytes, 0x30, 0x1_0000);
        let file = ScriptFile::parse(bytes).unwrap();
        let err = file.raw_list(ListId::Opcodes).unwrap_err();
        assert!(matches!(err, ScriptError::TruncatedContainer { .. }));
    }

    #[test]
    fn opcode_bytes_is_list_zero_content() {
        let file = ScriptFile::parse(container_with_lists()).unwrap();
        assert_eq!(file.opcode_bytes().unwrap(), vec![0x41, 0x41, 0x41]);
    }
}
