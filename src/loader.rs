use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::assembler::Executable;
use crate::runtime::{Memory, Word};
use crate::symbol::{MapError, ProgramMap};

/// Label written in the debug block for records without a symbol.
pub const NO_LABEL: &str = "?";

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Executable is empty")]
    #[diagnostic(code(load::empty), help("an executable starts with the size of the program"))]
    Empty,

    #[error("Expected the size of the program, but found `{token}`")]
    #[diagnostic(code(load::malformed_size))]
    MalformedSize { token: String },

    #[error("Unable to read cell {address}: expected an integer, but found `{token}`")]
    #[diagnostic(code(load::malformed_cell))]
    MalformedCell { address: usize, token: String },

    #[error("Expected {expected} cell(s), but found only {found}")]
    #[diagnostic(code(load::truncated))]
    Truncated { expected: usize, found: usize },

    #[error("Program needs {size} cell(s), but memory holds only {capacity}")]
    #[diagnostic(
        code(load::too_large),
        help("set `RASP_MEMORY` to a larger capacity")
    )]
    TooLarge { size: usize, capacity: usize },

    #[error("Malformed debug information: unexpected `{token}` at token {index}")]
    #[diagnostic(code(load::malformed_debug_info))]
    MalformedDebugInfo { index: usize, token: String },

    #[error("Debug record {index} is incomplete")]
    #[diagnostic(
        code(load::incomplete_record),
        help("each record is made of a line, an address and a label")
    )]
    IncompleteRecord { index: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Map(#[from] MapError),

    #[error("Unable to access `{}`", path.display())]
    #[diagnostic(code(load::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes and reads executables: whitespace-separated tokens.
///
/// ```text
/// <size> <cell>* [<3 * records> (<line> <address> <label|?>)*]
/// ```
pub struct Loader;

impl Loader {
    pub fn persist(executable: &Executable) -> String {
        let mut text = executable.program_size().to_string();
        for cell in &executable.cells {
            let _ = write!(text, " {cell}");
        }
        if let Some(map) = &executable.debug_infos {
            let table = map.as_table();
            let _ = write!(text, " {}", 3 * table.len());
            for record in table {
                let label = record.symbol.as_deref().unwrap_or(NO_LABEL);
                let _ = write!(text, " {} {} {}", record.line, record.address, label);
            }
        }
        text
    }

    /// Write the cells into `memory` from address `0`, and rebuild the debug map if any.
    ///
    /// Cells before a malformed one stay written.
    pub fn restore(text: &str, memory: &mut Memory) -> Result<Option<ProgramMap>, LoadError> {
        let mut tokens = text.split_whitespace();

        let size_token = tokens.next().ok_or(LoadError::Empty)?;
        let size: usize = size_token.parse().map_err(|_| LoadError::MalformedSize {
            token: size_token.to_string(),
        })?;
        let capacity = memory.capacity();
        if size > capacity {
            return Err(LoadError::TooLarge { size, capacity });
        }

        for address in 0..size {
            let token = tokens.next().ok_or(LoadError::Truncated {
                expected: size,
                found: address,
            })?;
            let value: Word = token.parse().map_err(|_| LoadError::MalformedCell {
                address,
                token: token.to_string(),
            })?;
            memory
                .write(address, value)
                .map_err(|_| LoadError::TooLarge { size, capacity })?;
        }
        log::debug!("Loaded {size} cell(s)");

        let debug_block: Vec<&str> = tokens.collect();
        let Some((count, records)) = debug_block.split_first() else {
            return Ok(None);
        };
        // The count is only checked for being a number: records run to the end
        if count.parse::<usize>().is_err() {
            return Err(LoadError::MalformedDebugInfo {
                index: 0,
                token: count.to_string(),
            });
        }

        let mut map = ProgramMap::new();
        for (index, record) in records.chunks(3).enumerate() {
            let [line, address, label] = record else {
                return Err(LoadError::IncompleteRecord { index });
            };
            let number = |offset: usize, token: &str| {
                token
                    .parse::<usize>()
                    .map_err(|_| LoadError::MalformedDebugInfo {
                        index: 1 + 3 * index + offset,
                        token: token.to_string(),
                    })
            };
            let line = number(0, *line)?;
            let address = number(1, *address)?;
            let symbol = (*label != NO_LABEL).then(|| label.to_string());
            map.record(line, address, symbol)?;
        }
        log::debug!("Loaded {} debug record(s)", map.len());
        Ok(Some(map))
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        memory: &mut Memory,
    ) -> Result<Option<ProgramMap>, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading `{}`", path.display());
        Self::restore(&text, memory)
    }

    pub fn save_as(executable: &Executable, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        fs::write(path, Self::persist(executable)).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Wrote `{}`", path.display());
        Ok(())
    }
}
