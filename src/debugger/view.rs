use super::error::{CommandError, DebugError};
use crate::ops::Instruction;
use crate::runtime::{Address, Word};

/// The CPU registers, and the instruction they point to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuView {
    pub accumulator: Word,
    pub instruction_pointer: Address,
    /// `None` when the instruction pointer is outside of memory.
    pub next: Option<Instruction>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellView {
    pub address: Address,
    pub value: Word,
    pub is_current: bool,
    pub is_breakpoint: bool,
    /// Mnemonic of the instruction this value would decode to.
    pub mnemonic: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreakpointView {
    pub address: Address,
    pub is_current: bool,
    pub value: Word,
    pub mnemonic: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    /// Starting at 1.
    pub number: usize,
    pub is_current: bool,
    pub is_breakpoint: bool,
    pub text: String,
}

/// Renders what the debugger has to say. Implementations decide on the format.
pub trait DebugView {
    fn show_opening(&mut self);
    fn show_closing(&mut self);
    fn show_help(&mut self);

    /// A command which did not come from an interactive prompt.
    fn show_command(&mut self, _command: &str) {}

    fn show_cpu(&mut self, cpu: &CpuView);
    fn show_memory(&mut self, cells: &[CellView]);
    fn show_breakpoints(&mut self, breakpoints: &[BreakpointView]);
    fn show_source(&mut self, lines: &[SourceLine]);

    /// About to execute `instruction`, found at `address`.
    fn show_instruction(&mut self, address: Address, instruction: &Instruction);
    fn show_halted(&mut self);

    fn report(&mut self, message: &str);
    fn report_error(&mut self, error: &DebugError);
    fn invalid_command(&mut self, command: &str, error: &CommandError);
}
