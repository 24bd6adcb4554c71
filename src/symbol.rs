use std::collections::BTreeMap;

use fxhash::FxHashMap;
use miette::Diagnostic;
use thiserror::Error;

use crate::ast::AssemblyProgram;
use crate::ops::INSTRUCTION_SIZE;
use crate::runtime::Address;

/// One correlation between a source line, an address and an optional symbol.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Record {
    /// Source line, starting at 1. `0` when the line is unknown.
    pub line: usize,
    pub address: Address,
    pub symbol: Option<String>,
}

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum MapError {
    #[error("Address {address} is already recorded")]
    #[diagnostic(code(map::duplicate_address))]
    DuplicateAddress { address: Address },

    #[error("Symbol `{symbol}` is already recorded")]
    #[diagnostic(code(map::duplicate_symbol))]
    DuplicateSymbol { symbol: String },

    #[error("Unknown symbol `{symbol}`")]
    #[diagnostic(code(map::unknown_symbol))]
    UnknownSymbol { symbol: String },

    #[error("No source line is recorded for address {address}")]
    #[diagnostic(code(map::unknown_address))]
    UnknownAddress { address: Address },

    #[error("No address is recorded for line {line}")]
    #[diagnostic(code(map::unknown_line))]
    UnknownLine { line: usize },

    #[error("Variable `{symbol}` extends past the last address")]
    #[diagnostic(code(map::address_overflow))]
    AddressOverflow { symbol: String },
}

/// Symbol table and debug map: correlates source lines, addresses and symbols.
///
/// Addresses are unique across records, and so are symbols (when present).
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ProgramMap {
    records: BTreeMap<Address, Record>,
    symbols: FxHashMap<String, Address>,
}

impl ProgramMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out `program`: operations from address `0`, two cells each, then declarations.
    pub fn create_from(program: &AssemblyProgram) -> Result<Self, MapError> {
        let mut map = Self::new();
        let mut address = 0;
        for operation in &program.code {
            map.record(
                operation.location.unwrap_or_default(),
                address,
                operation.label.clone(),
            )?;
            address += INSTRUCTION_SIZE;
        }
        for declaration in &program.data {
            map.record(
                declaration.location.unwrap_or_default(),
                address,
                Some(declaration.label.clone()),
            )?;
            address = address
                .checked_add(declaration.reserved_size)
                .ok_or_else(|| MapError::AddressOverflow {
                    symbol: declaration.label.clone(),
                })?;
        }
        Ok(map)
    }

    pub fn from_table(table: impl IntoIterator<Item = Record>) -> Result<Self, MapError> {
        let mut map = Self::new();
        for record in table {
            map.record(record.line, record.address, record.symbol)?;
        }
        Ok(map)
    }

    /// Fails, without recording anything, if the address or the symbol is already known.
    pub fn record(
        &mut self,
        line: usize,
        address: Address,
        symbol: Option<String>,
    ) -> Result<(), MapError> {
        if self.records.contains_key(&address) {
            return Err(MapError::DuplicateAddress { address });
        }
        if let Some(symbol) = &symbol {
            if self.symbols.contains_key(symbol) {
                return Err(MapError::DuplicateSymbol {
                    symbol: symbol.clone(),
                });
            }
            self.symbols.insert(symbol.clone(), address);
        }
        self.records.insert(
            address,
            Record {
                line,
                address,
                symbol,
            },
        );
        Ok(())
    }

    pub fn find_address(&self, symbol: &str) -> Result<Address, MapError> {
        self.symbols
            .get(symbol)
            .copied()
            .ok_or_else(|| MapError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }

    pub fn find_source(&self, address: Address) -> Result<usize, MapError> {
        self.records
            .get(&address)
            .map(|record| record.line)
            .ok_or(MapError::UnknownAddress { address })
    }

    /// Lowest address recorded for `line`. A line may hold a label and an instruction.
    pub fn find_address_by_line(&self, line: usize) -> Result<Address, MapError> {
        self.records
            .values()
            .find(|record| record.line == line)
            .map(|record| record.address)
            .ok_or(MapError::UnknownLine { line })
    }

    /// All records, by ascending address.
    pub fn as_table(&self) -> Vec<Record> {
        self.records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
