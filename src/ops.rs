use std::fmt;

use crate::runtime::{Address, ExecutionError, Memory, Word};

/// Every instruction occupies two cells: opcode, then operand.
pub const INSTRUCTION_SIZE: usize = 2;

/// The eight kinds of instruction understood by the machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Kind {
    Print,
    Read,
    Add,
    Store,
    Subtract,
    /// Jumps when the accumulator is zero or positive.
    JumpIfNonNegative,
    Halt,
    Load,
}

impl Kind {
    pub const ALL: [Kind; 8] = [
        Kind::Print,
        Kind::Read,
        Kind::Add,
        Kind::Store,
        Kind::Subtract,
        Kind::JumpIfNonNegative,
        Kind::Halt,
        Kind::Load,
    ];

    pub fn opcode(self) -> Word {
        match self {
            Kind::Print => 1,
            Kind::Read => 2,
            Kind::Add => 3,
            Kind::Store => 4,
            Kind::Subtract => 5,
            Kind::JumpIfNonNegative => 6,
            Kind::Halt => 7,
            Kind::Load => 8,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Kind::Print => "print",
            Kind::Read => "read",
            Kind::Add => "add",
            Kind::Store => "store",
            Kind::Subtract => "subtract",
            Kind::JumpIfNonNegative => "jump",
            Kind::Halt => "halt",
            Kind::Load => "load",
        }
    }
}

/// A decoded instruction with its operand.
///
/// The operand is kept as a raw [`Word`]: it is only interpreted as an address when the
/// instruction executes, except for [`Instruction::Load`] which loads the operand itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    Print(Word),
    Read(Word),
    Add(Word),
    Store(Word),
    Subtract(Word),
    JumpIfNonNegative(Word),
    Halt,
    Load(Word),
}

impl Instruction {
    pub fn new(kind: Kind, operand: Word) -> Self {
        match kind {
            Kind::Print => Instruction::Print(operand),
            Kind::Read => Instruction::Read(operand),
            Kind::Add => Instruction::Add(operand),
            Kind::Store => Instruction::Store(operand),
            Kind::Subtract => Instruction::Subtract(operand),
            Kind::JumpIfNonNegative => Instruction::JumpIfNonNegative(operand),
            Kind::Halt => Instruction::Halt,
            Kind::Load => Instruction::Load(operand),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Instruction::Print(_) => Kind::Print,
            Instruction::Read(_) => Kind::Read,
            Instruction::Add(_) => Kind::Add,
            Instruction::Store(_) => Kind::Store,
            Instruction::Subtract(_) => Kind::Subtract,
            Instruction::JumpIfNonNegative(_) => Kind::JumpIfNonNegative,
            Instruction::Halt => Kind::Halt,
            Instruction::Load(_) => Kind::Load,
        }
    }

    /// `halt` carries no operand; it is encoded as `0`.
    pub fn operand(&self) -> Word {
        match *self {
            Instruction::Print(operand)
            | Instruction::Read(operand)
            | Instruction::Add(operand)
            | Instruction::Store(operand)
            | Instruction::Subtract(operand)
            | Instruction::JumpIfNonNegative(operand)
            | Instruction::Load(operand) => operand,
            Instruction::Halt => 0,
        }
    }

    pub fn encode(&self) -> [Word; INSTRUCTION_SIZE] {
        [self.kind().opcode(), self.operand()]
    }

    /// Every instruction costs a single CPU cycle.
    pub fn cost(&self) -> u64 {
        1
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Halt => write!(f, "halt"),
            other => write!(f, "{} {}", other.kind().mnemonic(), other.operand()),
        }
    }
}

/// Registry of the instructions a machine understands, in both directions.
#[derive(Clone, Debug)]
pub struct InstructionSet {
    kinds: Vec<Kind>,
}

impl Default for InstructionSet {
    fn default() -> Self {
        Self::new(Kind::ALL.to_vec())
    }
}

impl InstructionSet {
    pub fn new(kinds: Vec<Kind>) -> Self {
        Self { kinds }
    }

    pub fn find_kind(&self, opcode: Word) -> Option<Kind> {
        self.kinds.iter().copied().find(|kind| kind.opcode() == opcode)
    }

    pub fn find_opcode(&self, mnemonic: &str) -> Option<Word> {
        self.kinds
            .iter()
            .find(|kind| kind.mnemonic() == mnemonic)
            .map(|kind| kind.opcode())
    }

    /// Unknown opcodes are shown as `halt`, since that is how they execute.
    pub fn find_mnemonic(&self, opcode: Word) -> &'static str {
        self.find_kind(opcode)
            .unwrap_or(Kind::Halt)
            .mnemonic()
    }

    /// Decode the instruction stored at `address`, notifying memory observers of each read.
    ///
    /// An unknown opcode decodes as [`Instruction::Halt`]. The operand cell of a `halt` is
    /// never read.
    pub fn read_from(&self, memory: &Memory, address: Address) -> Result<Instruction, ExecutionError> {
        let opcode = memory.read(address)?;
        match self.find_kind(opcode) {
            None | Some(Kind::Halt) => Ok(Instruction::Halt),
            Some(kind) => {
                let operand = memory.read(address + 1)?;
                Ok(Instruction::new(kind, operand))
            }
        }
    }

    /// Same as [`Self::read_from`], without notifying observers.
    pub fn peek_from(&self, memory: &Memory, address: Address) -> Option<Instruction> {
        let opcode = memory.peek(address)?;
        match self.find_kind(opcode) {
            None | Some(Kind::Halt) => Some(Instruction::Halt),
            Some(kind) => Some(Instruction::new(kind, memory.peek(address + 1)?)),
        }
    }
}
