// Parsing
pub mod ast;
mod lexer;
mod parser;
pub use parser::{parse, AsmParser};
mod span;

// Assembling
mod assembler;
pub use assembler::{Assembler, Executable, MAX_PROGRAM_SIZE};
pub mod symbol;
pub use symbol::ProgramMap;
mod loader;
pub use loader::{LoadError, Loader};

// Running
pub mod ops;
pub mod port;
pub mod runtime;
pub use runtime::{ExecutionError, Machine};
mod profiler;
pub use profiler::Profiler;
pub mod debugger;
pub use debugger::{CommandReader, Debugger};
mod output;
pub use output::Terminal;

mod error;
pub use error::{AsmError, SyntaxError};

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
