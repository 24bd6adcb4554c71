use miette::Diagnostic;
use thiserror::Error;

use super::command::CommandName;
use crate::runtime::{Address, ExecutionError, Word};
use crate::symbol::MapError;

/// Error parsing a command.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Not a command: `{command_name}`")]
    InvalidCommand { command_name: String },

    #[error("Missing subcommand for `{command_name}` (expected {expected})")]
    MissingSubcommand {
        command_name: CommandName,
        expected: &'static str,
    },

    #[error("Invalid subcommand `{subcommand_name}` for command `{command_name}`")]
    InvalidSubcommand {
        command_name: CommandName,
        subcommand_name: String,
    },

    #[error("In command `{command_name}`: {error}")]
    InvalidArgument {
        command_name: CommandName,
        error: ArgumentError,
    },
}

/// Error parsing command arguments.
#[derive(Debug, Error, PartialEq)]
pub enum ArgumentError {
    #[error("Missing argument `{argument_name}` (expected {expected_count}, found {actual_count})")]
    MissingArgument {
        argument_name: &'static str,
        expected_count: u8,
        actual_count: u8,
    },

    #[error("Too many arguments (expected {expected_count}, found {actual_count})")]
    TooManyArguments { expected_count: u8, actual_count: u8 },

    #[error("For argument `{argument_name}`: {error}")]
    InvalidValue {
        argument_name: &'static str,
        error: ValueError,
    },
}

/// Error parsing an argument value.
#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    #[error("Malformed integer `{text}`")]
    MalformedInteger { text: String },

    #[error("Expected a non-negative integer, found {value}")]
    Negative { value: Word },

    #[error("Expected a positive integer, found {value}")]
    NotPositive { value: Word },
}

/// A command which could be parsed, but not carried out. The session continues.
#[derive(Debug, Error, Diagnostic, PartialEq)]
pub enum DebugError {
    #[error("Debug information is not available")]
    #[diagnostic(help("assemble with `--debug` to keep the program map"))]
    NoDebugInfo,

    #[error("Assembly code is not available")]
    #[diagnostic(help("pass the source with `--asm-source`"))]
    NoSource,

    #[error("Address {address} is outside of memory [0, {capacity})")]
    AddressOutOfRange { address: Address, capacity: usize },

    #[error("Line {line} is outside of the source (1 to {count})")]
    LineOutOfRange { line: usize, count: usize },

    #[error("Empty range from {from} to {to}")]
    EmptyRange { from: usize, to: usize },

    #[error("No breakpoint at address {address}")]
    NoBreakpoint { address: Address },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Execution(#[from] ExecutionError),
}
