use std::fmt;

use super::error::{ArgumentError, CommandError, ValueError};
use super::parse::{find_match, ArgIter};
use crate::runtime::{Address, Word};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    SetInstructionPointer { address: Address },
    SetAccumulator { value: Word },
    SetMemory { address: Address, value: Word },
    Break { target: Target },
    Clear { target: Target },
    Step { count: usize },
    Run,
    Quit,
    ShowMemory { from: Address, to: Option<Address> },
    ShowCpu,
    ShowBreakpoints,
    ShowSource { from: Option<usize>, to: Option<usize> },
    ShowSymbol { symbol: String },
}

/// Where a breakpoint goes: a source line, or a memory address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Line(usize),
    Address(Address),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandName {
    Help,
    Set,
    Break,
    Clear,
    Step,
    Run,
    Quit,
    Show,
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Help => write!(f, "help"),
            Self::Set => write!(f, "set"),
            Self::Break => write!(f, "break"),
            Self::Clear => write!(f, "clear"),
            Self::Step => write!(f, "step"),
            Self::Run => write!(f, "run"),
            Self::Quit => write!(f, "quit"),
            Self::Show => write!(f, "show"),
        }
    }
}

#[derive(Clone, Copy)]
enum SetSubcommand {
    InstructionPointer,
    Accumulator,
    Memory,
}

#[derive(Clone, Copy)]
enum TargetKind {
    Line,
    Address,
}

#[derive(Clone, Copy)]
enum ShowSubcommand {
    Memory,
    Cpu,
    Breakpoints,
    Source,
}

impl TryFrom<&str> for Command {
    type Error = CommandError;

    /// Assumes line is non-empty.
    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let mut iter = ArgIter::from(line);

        let command_name = iter.get_command_name()?;
        let invalid = |error: ArgumentError| CommandError::InvalidArgument {
            command_name,
            error,
        };

        let (command, expected_args) = match command_name {
            // Allow trailing arguments
            CommandName::Help => return Ok(Self::Help),
            CommandName::Run => (Self::Run, 0),
            CommandName::Quit => (Self::Quit, 0),

            CommandName::Step => {
                let count = iter.next_unsigned_or_none("count").map_err(invalid)?;
                let count = match count {
                    None => 1,
                    Some(0) => {
                        return Err(invalid(ArgumentError::InvalidValue {
                            argument_name: "count",
                            error: ValueError::NotPositive { value: 0 },
                        }))
                    }
                    Some(count) => count,
                };
                (Self::Step { count }, 1)
            }

            CommandName::Set => {
                #[rustfmt::skip]
                let subcommands: &[(_, &[_])] = &[
                    (SetSubcommand::InstructionPointer, &["ip"]),
                    (SetSubcommand::Accumulator,        &["acc"]),
                    (SetSubcommand::Memory,             &["memory", "mem"]),
                ];
                let subcommand =
                    next_subcommand(&mut iter, command_name, subcommands, "ip, acc or memory")?;
                match subcommand {
                    SetSubcommand::InstructionPointer => {
                        let address = iter.next_unsigned("address", 1).map_err(invalid)?;
                        (Self::SetInstructionPointer { address }, 1)
                    }
                    SetSubcommand::Accumulator => {
                        let value = iter.next_integer("value", 1).map_err(invalid)?;
                        (Self::SetAccumulator { value }, 1)
                    }
                    SetSubcommand::Memory => {
                        let address = iter.next_unsigned("address", 2).map_err(invalid)?;
                        let value = iter.next_integer("value", 2).map_err(invalid)?;
                        (Self::SetMemory { address, value }, 2)
                    }
                }
            }

            CommandName::Break => {
                let at: &[(_, &[_])] = &[((), &["at"])];
                next_subcommand(&mut iter, command_name, at, "at")?;
                let target = next_target(&mut iter, command_name).and_then(|kind| {
                    target_of(kind, &mut iter).map_err(invalid)
                })?;
                (Self::Break { target }, 1)
            }
            CommandName::Clear => {
                let target = next_target(&mut iter, command_name).and_then(|kind| {
                    target_of(kind, &mut iter).map_err(invalid)
                })?;
                (Self::Clear { target }, 1)
            }

            CommandName::Show => {
                #[rustfmt::skip]
                let subcommands: &[(_, &[_])] = &[
                    (ShowSubcommand::Memory,      &["memory", "mem"]),
                    (ShowSubcommand::Cpu,         &["cpu"]),
                    (ShowSubcommand::Breakpoints, &["breakpoints"]),
                    (ShowSubcommand::Source,      &["source"]),
                ];
                let Some(name) = iter.next_name_part() else {
                    return Err(CommandError::MissingSubcommand {
                        command_name,
                        expected: "memory, cpu, breakpoints, source or a symbol",
                    });
                };
                match find_match(name, subcommands) {
                    Some(ShowSubcommand::Memory) => {
                        let from = iter.next_unsigned("from", 2).map_err(invalid)?;
                        let to = iter.next_unsigned_or_none("to").map_err(invalid)?;
                        (Self::ShowMemory { from, to }, 2)
                    }
                    Some(ShowSubcommand::Cpu) => (Self::ShowCpu, 0),
                    Some(ShowSubcommand::Breakpoints) => (Self::ShowBreakpoints, 0),
                    Some(ShowSubcommand::Source) => {
                        let from = iter.next_unsigned_or_none("from").map_err(invalid)?;
                        let to = iter.next_unsigned_or_none("to").map_err(invalid)?;
                        (Self::ShowSource { from, to }, 2)
                    }
                    None if is_symbol(name) => (
                        Self::ShowSymbol {
                            symbol: name.to_string(),
                        },
                        0,
                    ),
                    None => {
                        return Err(CommandError::InvalidSubcommand {
                            command_name,
                            subcommand_name: name.to_string(),
                        })
                    }
                }
            }
        };

        iter.expect_end(expected_args).map_err(invalid)?;
        Ok(command)
    }
}

fn next_subcommand<T: Copy>(
    iter: &mut ArgIter,
    command_name: CommandName,
    subcommands: &[(T, &[&str])],
    expected: &'static str,
) -> Result<T, CommandError> {
    let Some(name) = iter.next_name_part() else {
        return Err(CommandError::MissingSubcommand {
            command_name,
            expected,
        });
    };
    find_match(name, subcommands).ok_or_else(|| CommandError::InvalidSubcommand {
        command_name,
        subcommand_name: name.to_string(),
    })
}

fn next_target(iter: &mut ArgIter, command_name: CommandName) -> Result<TargetKind, CommandError> {
    #[rustfmt::skip]
    let kinds: &[(_, &[_])] = &[
        (TargetKind::Line,    &["line"]),
        (TargetKind::Address, &["address"]),
    ];
    next_subcommand(iter, command_name, kinds, "line or address")
}

fn target_of(kind: TargetKind, iter: &mut ArgIter) -> Result<Target, ArgumentError> {
    Ok(match kind {
        TargetKind::Line => Target::Line(iter.next_unsigned("line", 1)?),
        TargetKind::Address => Target::Address(iter.next_unsigned("address", 1)?),
    })
}

/// Same shape as labels in assembly source.
fn is_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
