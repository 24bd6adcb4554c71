use crate::ops::INSTRUCTION_SIZE;
use crate::runtime::Word;

/// A data declaration: `label size initial_value`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Declaration {
    pub label: String,
    /// Amount of cells reserved, at least one.
    pub reserved_size: usize,
    pub initial_value: Word,
    /// Line number in the source, starting at 1.
    pub location: Option<usize>,
}

impl Declaration {
    pub fn new(label: impl Into<String>, reserved_size: usize, initial_value: Word) -> Self {
        Self {
            label: label.into(),
            reserved_size,
            initial_value,
            location: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.location = Some(line);
        self
    }
}

/// Operand of an operation: either literal or a reference to a label.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Operand {
    Literal(Word),
    Symbol(String),
}

impl From<Word> for Operand {
    fn from(value: Word) -> Self {
        Operand::Literal(value)
    }
}

impl From<&str> for Operand {
    fn from(symbol: &str) -> Self {
        Operand::Symbol(symbol.to_string())
    }
}

/// An operation of the code segment, with an optional prefix label.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Operation {
    pub mnemonic: String,
    pub operand: Operand,
    pub label: Option<String>,
    /// Line number in the source, starting at 1.
    pub location: Option<usize>,
}

impl Operation {
    pub fn new(mnemonic: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            operand: operand.into(),
            label: None,
            location: None,
        }
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.location = Some(line);
        self
    }
}

/// Parsed assembly source: data segment and code segment, in source order.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct AssemblyProgram {
    pub data: Vec<Declaration>,
    pub code: Vec<Operation>,
}

impl AssemblyProgram {
    pub fn new(data: Vec<Declaration>, code: Vec<Operation>) -> Self {
        Self { data, code }
    }

    /// Amount of cells used by code and data together, `None` if it does not fit a `usize`.
    pub fn size(&self) -> Option<usize> {
        let code = INSTRUCTION_SIZE.checked_mul(self.code.len())?;
        self.data
            .iter()
            .try_fold(code, |size, declaration| size.checked_add(declaration.reserved_size))
    }
}
