use crate::ast::{AssemblyProgram, Operand};
use crate::error::AsmError;
use crate::ops::InstructionSet;
use crate::runtime::Word;
use crate::symbol::ProgramMap;

/// Largest amount of code and data cells a single program may take.
pub const MAX_PROGRAM_SIZE: usize = 1 << 24;

/// Output of the assembler: the flat memory layout, plus the debug map if requested.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Executable {
    /// Code cells followed by data cells, starting at address `0`.
    pub cells: Vec<Word>,
    pub debug_infos: Option<ProgramMap>,
}

impl Executable {
    pub fn new(cells: Vec<Word>, debug_infos: Option<ProgramMap>) -> Self {
        Self { cells, debug_infos }
    }

    /// Size of the code and data region.
    pub fn program_size(&self) -> usize {
        self.cells.len()
    }
}

/// Two-pass assembler. Holds no state between programs.
#[derive(Debug, Default)]
pub struct Assembler {
    instructions: InstructionSet,
}

impl Assembler {
    pub fn new(instructions: InstructionSet) -> Self {
        Self { instructions }
    }

    /// Assign addresses first, then emit cells, so that forward references resolve.
    pub fn assemble(&self, program: &AssemblyProgram, debug: bool) -> Result<Executable, AsmError> {
        let size = program
            .size()
            .filter(|size| *size <= MAX_PROGRAM_SIZE)
            .ok_or(AsmError::ProgramTooLarge {
                limit: MAX_PROGRAM_SIZE,
            })?;
        let program_map = ProgramMap::create_from(program)?;

        let mut cells = Vec::with_capacity(size);
        for operation in &program.code {
            let opcode = self
                .instructions
                .find_opcode(&operation.mnemonic.to_lowercase())
                .ok_or_else(|| AsmError::UnknownMnemonic {
                    mnemonic: operation.mnemonic.clone(),
                    line: operation.location,
                })?;
            let operand = match &operation.operand {
                Operand::Literal(value) => *value,
                Operand::Symbol(symbol) => {
                    let address = program_map.find_address(symbol).map_err(|_| {
                        AsmError::UnknownSymbol {
                            symbol: symbol.clone(),
                            line: operation.location,
                        }
                    })?;
                    address as Word
                }
            };
            cells.push(opcode);
            cells.push(operand);
        }

        for declaration in &program.data {
            cells.extend(std::iter::repeat(declaration.initial_value).take(declaration.reserved_size));
        }
        debug_assert_eq!(cells.len(), size);

        log::info!(
            "Assembled {} operation(s) and {} declaration(s) into {} cell(s)",
            program.code.len(),
            program.data.len(),
            cells.len()
        );

        Ok(Executable {
            cells,
            debug_infos: debug.then_some(program_map),
        })
    }
}
