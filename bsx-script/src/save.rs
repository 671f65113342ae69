//! Save-file checksum patching.
//!
//! The first 32 bytes of a save are the lowercase-hex MD5 of the companion
//! script's opcode region, stored as ASCII text. The engine deletes a save
//! whose digest no longer matches its script, so the digest has to be
//! refreshed whenever the opcode region changes.

use md5::{Digest, Md5};

use crate::error::ScriptError;

/// Length of the ASCII checksum field at the head of a save file.
pub const CHECKSUM_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    Updated,
    Unchanged,
}

/// A loaded save buffer.
#[derive(Debug, Clone)]
pub struct SaveFile {
    bytes: Vec<u8>,
}

impl SaveFile {
    pub fn new(bytes: Vec<u8>) -> SaveFile {
        SaveFile { bytes }
    }

    /// The digest currently stored in the save, as text.
    pub fn checksum(&self) -> Result<String, ScriptError> {
        let field = self
            .bytes
            .get(..CHECKSUM_LEN)
            .ok_or(ScriptError::TruncatedSave {
                len: self.bytes.len(),
            })?;
        Ok(String::from_utf8_lossy(field).into_owned())
    }

    /// Recompute the digest over the script's opcode content and patch the
    /// save when it differs. Reports whether anything was written; a second
    /// application with the same content is always [`ChecksumStatus::Unchanged`].
    pub fn set_updated_checksum(
        &mut self,
        opcode_content: &[u8],
    ) -> Result<ChecksumStatus, ScriptError> {
        if self.bytes.len() < CHECKSUM_LEN {
            return Err(ScriptError::TruncatedSave {
                len: self.bytes.len(),
            });
        }

        let digest = hex::encode(Md5::digest(opcode_content));
        debug_assert_eq!(digest.len(), CHECKSUM_LEN);

        if self.bytes[..CHECKSUM_LEN] == *digest.as_bytes() {
            return Ok(ChecksumStatus::Unchanged);
        }

        self.bytes[..CHECKSUM_LEN].copy_from_slice(digest.as_bytes());
        Ok(ChecksumStatus::Updated)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
