use std::fmt;

use miette::{Diagnostic, LabeledSpan, SourceSpan};
use thiserror::Error;

use crate::runtime::Address;
use crate::symbol::MapError;

// Parser errors

/// Malformed assembly source.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: SourceSpan,
    pub label: &'static str,
    pub help: Option<&'static str>,
}

impl SyntaxError {
    pub fn new(
        message: impl Into<String>,
        span: impl Into<SourceSpan>,
        label: &'static str,
    ) -> Self {
        Self {
            message: message.into(),
            span: span.into(),
            label,
            help: None,
        }
    }

    pub fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

impl Diagnostic for SyntaxError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("parse::syntax"))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .map(|help| Box::new(help) as Box<dyn fmt::Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::at(
            self.span,
            self.label,
        ))))
    }
}

// Assembler errors

/// Assembly failed. No partial executable is produced.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum AsmError {
    #[error("Duplicate label `{label}`")]
    #[diagnostic(
        code(asm::duplicate_label),
        help("labels and variables share one namespace: each name is only allowed once per file")
    )]
    DuplicateLabel { label: String },

    #[error("Unknown symbol `{symbol}`{}", at_line(.line))]
    #[diagnostic(
        code(asm::unknown_symbol),
        help("declare it in the data segment, or label an operation with it")
    )]
    UnknownSymbol { symbol: String, line: Option<usize> },

    #[error("Unknown mnemonic `{mnemonic}`{}", at_line(.line))]
    #[diagnostic(
        code(asm::unknown_mnemonic),
        help("available mnemonics: print, read, add, store, subtract, jump, halt, load")
    )]
    UnknownMnemonic {
        mnemonic: String,
        line: Option<usize>,
    },

    #[error("Program needs more than {limit} cells")]
    #[diagnostic(
        code(asm::program_too_large),
        help("reduce the sizes reserved in the data segment")
    )]
    ProgramTooLarge { limit: usize },

    #[error("Address {address} was assigned twice")]
    #[diagnostic(code(asm::duplicate_address))]
    DuplicateAddress { address: Address },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Map(MapError),
}

fn at_line(line: &Option<usize>) -> String {
    line.map(|line| format!(" on line {line}"))
        .unwrap_or_default()
}

impl From<MapError> for AsmError {
    fn from(error: MapError) -> Self {
        match error {
            MapError::DuplicateSymbol { symbol } => AsmError::DuplicateLabel { label: symbol },
            MapError::DuplicateAddress { address } => AsmError::DuplicateAddress { address },
            MapError::UnknownSymbol { symbol } => AsmError::UnknownSymbol { symbol, line: None },
            other => AsmError::Map(other),
        }
    }
}
