//! bsx-script
//!
//! Decoder for the BSXScript compiled-script container (versions 3.0-3.3):
//! a versioned binary blob holding a flat opcode stream plus the six symbol
//! tables it references (functions/labels, four generic variable lists,
//! character names, dialogue messages). The decoder turns the blob into an
//! ordered instruction list with symbolic references resolved; [`save`]
//! refreshes the MD5 digest a companion save file keeps over the script's
//! opcode region.
//!
//! The format has no public documentation; the layout here is reconstructed
//! from the engine's behavior, and the fields whose meaning is still
//! unconfirmed are carried through as literals rather than guessed at.

pub mod disasm;
pub mod error;
pub mod inst;
pub mod parser;
pub mod save;
pub mod text;

pub use disasm::{decode_instructions, decompile, DecodedScript, SymbolTables};
pub use error::ScriptError;
pub use inst::Instruction;
pub use parser::{ListId, RawList, ScriptFile, Version};
pub use save::{ChecksumStatus, SaveFile, CHECKSUM_LEN};
pub use text::{decode_functions, decode_names, FunctionEntry};
