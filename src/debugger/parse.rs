use std::str::SplitWhitespace;

use super::command::CommandName;
use super::error::{ArgumentError, CommandError, ValueError};
use crate::runtime::Word;

/// Returns `true` if `name` matches any item of `candidates` (case insensitive).
pub(super) fn matches(name: &str, candidates: &[&str]) -> bool {
    candidates
        .iter()
        .any(|candidate| name.eq_ignore_ascii_case(candidate))
}

/// Returns the first item which has a candidate matching `name` (case insensitive).
pub(super) fn find_match<T: Copy>(name: &str, items: &[(T, &[&str])]) -> Option<T> {
    items
        .iter()
        .find(|(_, candidates)| matches(name, candidates))
        .map(|(item, _)| *item)
}

/// Words of a command line, consumed from left to right.
pub struct ArgIter<'a> {
    words: SplitWhitespace<'a>,
    /// Amount of arguments requested (successfully or not).
    ///
    /// Must only be incremented by [`Self::next_argument`].
    arg_count: u8,
}

impl<'a> ArgIter<'a> {
    pub fn from(line: &'a str) -> Self {
        Self {
            words: line.split_whitespace(),
            arg_count: 0,
        }
    }

    /// Next word of a (possibly multi-word) command name.
    pub fn next_name_part(&mut self) -> Option<&'a str> {
        self.words.next()
    }

    /// Parse and consume the command name, without its subcommand.
    pub fn get_command_name(&mut self) -> Result<CommandName, CommandError> {
        // Command source should always return a string containing non-whitespace characters
        let command_name = self.next_name_part().unwrap_or("");

        #[rustfmt::skip]
        let commands: &[(_, &[_])] = &[
            (CommandName::Help,  &["help", "h"]),
            (CommandName::Set,   &["set"]),
            (CommandName::Break, &["break", "b"]),
            (CommandName::Clear, &["clear"]),
            (CommandName::Step,  &["step", "s"]),
            (CommandName::Run,   &["run", "continue", "c"]),
            (CommandName::Quit,  &["quit", "exit", "q"]),
            (CommandName::Show,  &["show"]),
        ];

        find_match(command_name, commands).ok_or_else(|| CommandError::InvalidCommand {
            command_name: command_name.to_string(),
        })
    }

    fn next_argument(&mut self) -> Option<&'a str> {
        self.arg_count += 1;
        self.words.next()
    }

    /// Next argument as a word, failing if it is missing.
    pub fn next_word(
        &mut self,
        argument_name: &'static str,
        expected_count: u8,
    ) -> Result<&'a str, ArgumentError> {
        self.next_argument()
            .ok_or_else(|| ArgumentError::MissingArgument {
                argument_name,
                expected_count,
                actual_count: self.arg_count - 1,
            })
    }

    pub fn next_integer(
        &mut self,
        argument_name: &'static str,
        expected_count: u8,
    ) -> Result<Word, ArgumentError> {
        let word = self.next_word(argument_name, expected_count)?;
        parse_integer(word).map_err(|error| ArgumentError::InvalidValue {
            argument_name,
            error,
        })
    }

    /// An address, a line number, or a count.
    pub fn next_unsigned(
        &mut self,
        argument_name: &'static str,
        expected_count: u8,
    ) -> Result<usize, ArgumentError> {
        let word = self.next_word(argument_name, expected_count)?;
        parse_unsigned(word).map_err(|error| ArgumentError::InvalidValue {
            argument_name,
            error,
        })
    }

    /// `None` if no argument is left.
    pub fn next_unsigned_or_none(
        &mut self,
        argument_name: &'static str,
    ) -> Result<Option<usize>, ArgumentError> {
        let Some(word) = self.next_argument() else {
            return Ok(None);
        };
        parse_unsigned(word)
            .map(Some)
            .map_err(|error| ArgumentError::InvalidValue {
                argument_name,
                error,
            })
    }

    /// Fails if any argument is left.
    pub fn expect_end(&mut self, expected_count: u8) -> Result<(), ArgumentError> {
        let extra = self.words.by_ref().count();
        if extra == 0 {
            return Ok(());
        }
        Err(ArgumentError::TooManyArguments {
            expected_count,
            actual_count: expected_count.saturating_add(extra as u8),
        })
    }
}

fn parse_integer(word: &str) -> Result<Word, ValueError> {
    word.parse().map_err(|_| ValueError::MalformedInteger {
        text: word.to_string(),
    })
}

fn parse_unsigned(word: &str) -> Result<usize, ValueError> {
    let value = parse_integer(word)?;
    usize::try_from(value).map_err(|_| ValueError::Negative { value })
}
