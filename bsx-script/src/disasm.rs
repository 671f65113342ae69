//! Opcode-stream disassembly.
//!
//! A single forward pass over the flat opcode array: the byte under the
//! cursor selects a decode rule, the rule consumes its full width (fixed or
//! data-dependent) and appends one rendered [`Instruction`]. A malformed
//! instruction aborts the whole pass; no resynchronization is attempted and
//! no partial list is ever returned.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::ScriptError;
use crate::inst::{operator_glyph, Instruction};
use crate::parser::{ListId, ScriptFile, Version};
use crate::text::{decode_functions, decode_names, FunctionEntry};

/// The seven symbol namespaces (opcode stream, functions, variable lists
/// 1-4, characters, messages) are numbered 256..=262 in selector operands.
const SELECTOR_FIRST: u16 = 256;
const SELECTOR_LAST: u16 = 262;

/// All resolved tables an opcode stream can reference.
#[derive(Debug, Clone, Default)]
pub struct SymbolTables {
    pub functions: Vec<FunctionEntry>,
    pub variables: [Vec<String>; 4],
    pub characters: Vec<String>,
    pub messages: Vec<String>,
}

impl SymbolTables {
    fn lookup(
        list: &[String],
        table: &'static str,
        index: i64,
        offset: usize,
    ) -> Result<String, ScriptError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| list.get(i))
            .cloned()
            .ok_or(ScriptError::SymbolIndexOutOfRange {
                table,
                index,
                len: list.len(),
                offset,
            })
    }

    fn function_name(&self, index: i32, offset: usize) -> Result<String, ScriptError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.functions.get(i))
            .map(|entry| entry.name.clone())
            .ok_or(ScriptError::SymbolIndexOutOfRange {
                table: "function",
                index: index as i64,
                len: self.functions.len(),
                offset,
            })
    }

    fn variable(&self, slot: usize, index: i64, offset: usize) -> Result<String, ScriptError> {
        const TABLES: [&str; 4] = ["variable-1", "variable-2", "variable-3", "variable-4"];
        Self::lookup(&self.variables[slot], TABLES[slot], index, offset)
    }

    fn character(&self, index: i32, offset: usize) -> Result<String, ScriptError> {
        Self::lookup(&self.characters, "character", index as i64, offset)
    }

    fn message(&self, index: i32, offset: usize) -> Result<String, ScriptError> {
        Self::lookup(&self.messages, "message", index as i64, offset)
    }
}

/// Forward-only cursor over the opcode array. Every read is bounds-checked;
/// nothing is ever consumed past the declared end.
struct Stream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Stream<'a> {
    fn new(data: &'a [u8]) -> Stream<'a> {
        Stream { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn take(&mut self, need: usize) -> Result<&'a [u8], ScriptError> {
        let end = self
            .pos
            .checked_add(need)
            .filter(|&end| end <= self.data.len())
            .ok_or(ScriptError::TruncatedStream {
                offset: self.pos,
                need,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, ScriptError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, ScriptError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    fn read_i32(&mut self) -> Result<i32, ScriptError> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    fn read_u32(&mut self) -> Result<u32, ScriptError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    fn skip(&mut self, n: usize) -> Result<(), ScriptError> {
        self.take(n).map(|_| ())
    }
}

fn check_selector(selector: u16, min: u16, offset: usize) -> Result<(), ScriptError> {
    if selector < min || selector > SELECTOR_LAST {
        return Err(ScriptError::SelectorOutOfRange {
            selector,
            min,
            max: SELECTOR_LAST,
            offset,
        });
    }
    Ok(())
}

/// Disassemble the flat opcode array against the resolved tables.
pub fn decode_instructions(
    data: &[u8],
    tables: &SymbolTables,
) -> Result<Vec<Instruction>, ScriptError> {
    let mut stream = Stream::new(data);
    let mut instructions = Vec::new();

    while !stream.at_end() {
        let start = stream.pos;
        let opcode = stream.read_u8()?;
        let mut inst = Instruction::new(opcode, start);

        match opcode {
            // single-byte opcodes: the boot jump, the fixed-return pair,
            // label/stack bookkeeping and the 0x1E..0x32 block
            0x00..=0x02 | 0x0A | 0x0B | 0x1E..=0x32 | 0x35 | 0x37 | 0x39 | 0x3F..=0x41 => {}

            // label references resolved through the function table
            0x03 | 0x06..=0x09 | 0x38 => {
                let index = stream.read_i32()?;
                inst.push(tables.function_name(index, start)?);
            }

            // raw jump addresses, never resolved
            0x04 | 0x05 => {
                inst.push(stream.read_i32()?.to_string());
            }

            // arithmetic / comparison / bitwise family, 18 bytes
            0x0C..=0x11 | 0x13..=0x19 | 0x3A..=0x3C => {
                stream.skip(1)?; // unused byte

                inst.push(stream.read_i32()?.to_string()); // destination slot

                let first_selector = stream.read_u16()?;
                check_selector(first_selector, SELECTOR_FIRST, start)?;
                inst.push(first_selector.to_string());

                let first_index = stream.read_i32()?;
                inst.push(tables.variable(2, first_index as i64, start)?);

                inst.push(operator_glyph(opcode));

                let second_selector = stream.read_u16()?;
                check_selector(second_selector, SELECTOR_FIRST, start)?;
                inst.push(second_selector.to_string());

                inst.push(stream.read_i32()?.to_string());
            }

            // asset load / variable modification, 18 bytes
            0x12 => {
                stream.skip(5)?; // null padding
                let selector = stream.read_u16()?;
                let slot = stream.read_u32()?;
                let third = stream.read_u16()?;
                let fourth = stream.read_i32()?;

                match selector {
                    258 | 260..=262 => {
                        inst.push(selector.to_string());
                        inst.push(slot.to_string());
                        inst.push(third.to_string());
                        // a negative index marks an inline value, seen with
                        // selector 260
                        if fourth < 0 {
                            inst.push(fourth.to_string());
                        } else {
                            inst.push(tables.variable(0, fourth as i64, start)?);
                        }
                    }
                    259 => {
                        inst.push("Modify variable");
                        inst.push(tables.variable(2, slot as i64, start)?);
                        inst.push(third.to_string());
                        inst.push(fourth.to_string());
                    }
                    _ => {
                        return Err(ScriptError::InvalidSelector {
                            selector,
                            offset: start,
                        })
                    }
                }

                check_selector(third, SELECTOR_FIRST, start)?;
            }

            // negated test, 12 bytes
            0x1A => {
                stream.skip(5)?;
                let selector = stream.read_u16()?;
                check_selector(selector, SELECTOR_FIRST, start)?;
                inst.push(selector.to_string());
                inst.push(stream.read_u32()?.to_string());
            }

            // slot increment / decrement, 12 bytes
            0x1B | 0x1C => {
                stream.skip(5)?;
                let selector = stream.read_u16()?;
                check_selector(selector, 258, start)?;
                inst.push(selector.to_string());
                inst.push(stream.read_u32()?.to_string());
            }

            // dialogue message; the subtype byte picks the record shape
            0x1D => {
                let subtype = stream.read_u8()?;
                match subtype {
                    // bare narration
                    0 => {
                        let message = stream.read_i32()?;
                        inst.push(tables.message(message, start)?);
                    }
                    // spoken line, no voice file
                    1 => {
                        let message = stream.read_i32()?;
                        let character = stream.read_i32()?;
                        inst.push(tables.message(message, start)?);
                        inst.push(tables.character(character, start)?);
                    }
                    // voiced line with 1..=2 sound files
                    2 | 3 => {
                        let message = stream.read_i32()?;
                        let character = stream.read_i32()?;
                        inst.push(tables.message(message, start)?);
                        inst.push(tables.character(character, start)?);

                        let files = stream.read_i32()?;
                        if files < 0 {
                            return Err(ScriptError::InvalidCount {
                                count: files,
                                offset: start,
                            });
                        }
                        inst.push(files.to_string());
                        for _ in 0..files {
                            let sound = stream.read_i32()?;
                            inst.push(tables.variable(0, sound as i64, start)?);
                        }
                    }
                    _ => {
                        return Err(ScriptError::InvalidMessageSubtype {
                            subtype,
                            offset: start,
                        })
                    }
                }
            }

            // branching-path option, 13 bytes
            0x33 => {
                inst.push(stream.read_i32()?.to_string()); // teleport id
                inst.push(stream.read_i32()?.to_string()); // option number
                let message = stream.read_i32()?;
                inst.push(tables.message(message, start)?);
            }

            // option-list terminator; four padding bytes, expected 0xFF
            0x34 => {
                stream.skip(4)?;
            }

            // label reference with a negative "no function" sentinel
            0x36 => {
                let index = stream.read_i32()?;
                if index < 0 {
                    inst.push(index.to_string());
                } else {
                    inst.push(tables.function_name(index, start)?);
                }
            }

            // bitwise-not-like slot operation, 12 bytes
            0x3D => {
                inst.push(stream.read_i32()?.to_string());
                let selector = stream.read_u16()?;
                check_selector(selector, SELECTOR_FIRST, start)?;
                inst.push(selector.to_string());
                inst.push(stream.read_i32()?.to_string());
                stream.skip(1)?; // trailing unused byte
            }

            // repeat block; the payload words are consumed for width but
            // their interpretation is undetermined, so only the repetition
            // indices are recorded
            0x3E => {
                let repetitions = stream.read_i32()?;
                if repetitions < 0 {
                    return Err(ScriptError::InvalidCount {
                        count: repetitions,
                        offset: start,
                    });
                }
                inst.push(repetitions.to_string());
                for repetition in 0..repetitions {
                    stream.read_i32()?;
                    inst.push(repetition.to_string());
                }
            }

            _ => {
                return Err(ScriptError::InvalidOpcode {
                    opcode,
                    offset: start,
                })
            }
        }

        instructions.push(inst);
    }

    Ok(instructions)
}

/// Everything recovered from one container. Produced as a fresh value per
/// decode, so repeated decodes of the same or different containers never
/// share state.
#[derive(Debug, Clone)]
pub struct DecodedScript {
    pub version: Version,
    pub functions: Vec<FunctionEntry>,
    pub variables: [Vec<String>; 4],
    pub characters: Vec<String>,
    pub messages: Vec<String>,
    pub instructions: Vec<Instruction>,
}

/// Run the full decode: extract every list, resolve the symbol tables, then
/// disassemble the opcode stream against them.
pub fn decompile(file: &ScriptFile) -> Result<DecodedScript, ScriptError> {
    let layout = file.version().layout();

    let opcodes = file.raw_list(ListId::Opcodes)?;

    let list = file.raw_list(ListId::Functions)?;
    let functions = decode_functions(
        &list.metadata,
        &list.content,
        layout[ListId::Functions as usize].shift,
    )?;

    let mut variables: [Vec<String>; 4] = Default::default();
    for (slot, id) in ListId::VARIABLES.into_iter().enumerate() {
        let list = file.raw_list(id)?;
        variables[slot] = decode_names(&list.metadata, &list.content, layout[id as usize].shift)?;
    }

    let list = file.raw_list(ListId::Characters)?;
    let characters = decode_names(
        &list.metadata,
        &list.content,
        layout[ListId::Characters as usize].shift,
    )?;

    let list = file.raw_list(ListId::Messages)?;
    let messages = decode_names(
        &list.metadata,
        &list.content,
        layout[ListId::Messages as usize].shift,
    )?;

    let tables = SymbolTables {
        functions,
        variables,
        characters,
        messages,
    };
    let instructions = decode_instructions(&opcodes.content, &tables)?;

    let SymbolTables {
        functions,
        variables,
        characters,
        messages,
    } = tables;

    Ok(DecodedScript {
        version: file.version(),
        functions,
        variables,
        characters,
        messages,
        instructions,
    })
}
