use std::io::{self, BufRead, Write};

use crate::runtime::{ExecutionError, Word};

/// Source of values for the `read` instruction.
pub trait InputPort {
    fn read(&mut self) -> Result<Word, ExecutionError>;
}

/// Destination of values for the `print` instruction.
pub trait OutputPort {
    fn write(&mut self, value: Word) -> Result<(), ExecutionError>;
}

/// Prompts on stdout and reads one integer per line from stdin.
#[derive(Debug)]
pub struct StdInput {
    buffer: String,
}

impl StdInput {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }
}

impl Default for StdInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputPort for StdInput {
    fn read(&mut self) -> Result<Word, ExecutionError> {
        let mut stdout = io::stdout();
        write!(stdout, "rasp? ")
            .and_then(|()| stdout.flush())
            .map_err(|error| ExecutionError::Output {
                reason: error.to_string(),
            })?;

        self.buffer.clear();
        let bytes_read = io::stdin()
            .lock()
            .read_line(&mut self.buffer)
            .map_err(|error| ExecutionError::Input {
                reason: error.to_string(),
            })?;
        if bytes_read == 0 {
            return Err(ExecutionError::Input {
                reason: "end of input".to_string(),
            });
        }

        let line = self.buffer.trim();
        line.parse().map_err(|_| ExecutionError::Input {
            reason: format!("expected an integer, found `{line}`"),
        })
    }
}

/// Prints each value on its own line.
#[derive(Debug, Default)]
pub struct StdOutput;

impl OutputPort for StdOutput {
    fn write(&mut self, value: Word) -> Result<(), ExecutionError> {
        writeln!(io::stdout(), "{value}").map_err(|error| ExecutionError::Output {
            reason: error.to_string(),
        })
    }
}

/// Replays a fixed list of values, starting over once exhausted.
#[derive(Clone, Debug)]
pub struct ScriptedInput {
    values: Vec<Word>,
    index: usize,
}

impl ScriptedInput {
    /// An empty list always yields `0`.
    pub fn new(values: Vec<Word>) -> Self {
        Self { values, index: 0 }
    }
}

impl InputPort for ScriptedInput {
    fn read(&mut self) -> Result<Word, ExecutionError> {
        let Some(value) = self.values.get(self.index).copied() else {
            return Ok(0);
        };
        self.index = (self.index + 1) % self.values.len();
        Ok(value)
    }
}

/// Records every value written.
impl OutputPort for Vec<Word> {
    fn write(&mut self, value: Word) -> Result<(), ExecutionError> {
        self.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_input_cycles() {
        let mut input = ScriptedInput::new(vec![1, 2]);
        let values: Vec<_> = (0..5).map(|_| input.read().unwrap()).collect();
        assert_eq!(values, vec![1, 2, 1, 2, 1]);
    }

    #[test]
    fn empty_scripted_input_yields_zero() {
        let mut input = ScriptedInput::new(vec![]);
        assert_eq!(input.read(), Ok(0));
        assert_eq!(input.read(), Ok(0));
    }

    #[test]
    fn vec_records_output() {
        let mut output: Vec<Word> = Vec::new();
        output.write(3).unwrap();
        output.write(-4).unwrap();
        assert_eq!(output, vec![3, -4]);
    }
}
