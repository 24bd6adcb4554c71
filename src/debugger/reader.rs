use std::io::{self, IsTerminal as _, Write as _};

use colored::Colorize as _;
use console::Key;

/// Shown before each interactive command, and before echoed ones.
pub const PROMPT: &str = " ┼ debug > ";

/// A command line, and whether it should be echoed (it was not typed by the user).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line<'a> {
    pub text: &'a str,
    pub echo: bool,
}

/// A trait for objects which can yield a command, by iterating a string or reading a stream.
pub trait Read {
    /// `None` indicates EOF.
    /// Returned string slice MAY include leading or trailing whitespace.
    fn read(&mut self) -> Option<&str>;
}

/// Read from argument first, if `Some`. Then read from stream, if any.
#[derive(Debug)]
pub struct CommandReader {
    argument: Option<Argument>,
    stream: Option<Stream>,
}

/// Stdin or interactive terminal.
#[derive(Debug)]
enum Stream {
    Stdin(Stdin),
    Terminal(Terminal),
}

impl CommandReader {
    /// Commands from `argument`, then from stdin or the terminal.
    pub fn from(argument: Option<String>) -> Self {
        Self {
            argument: argument.map(Argument::from),
            stream: Some(Stream::new()),
        }
    }

    /// Commands from `script` only. Reaching its end is EOF.
    pub fn scripted(script: impl Into<String>) -> Self {
        Self {
            argument: Some(Argument::from(script.into())),
            stream: None,
        }
    }

    pub fn next_line(&mut self) -> Option<Line<'_>> {
        // Always try to read from argument first
        if let Some(argument) = &mut self.argument {
            if !argument.is_exhausted() {
                return argument.read().map(|text| Line { text, echo: true });
            }
        }
        match self.stream.as_mut()? {
            Stream::Stdin(stdin) => stdin.read().map(|text| Line { text, echo: true }),
            Stream::Terminal(terminal) => terminal.read().map(|text| Line { text, echo: false }),
        }
    }
}

impl Stream {
    fn new() -> Self {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            Self::Terminal(Terminal::new())
        } else {
            Self::Stdin(Stdin::from(stdin))
        }
    }
}

/// Commands separated by `;` or newlines.
#[derive(Debug, Default)]
struct Argument {
    buffer: String,
    /// Byte index.
    cursor: usize,
}

impl Argument {
    fn from(source: String) -> Self {
        Self {
            buffer: source,
            cursor: 0,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.buffer.len()
    }
}

impl Read for Argument {
    fn read(&mut self) -> Option<&str> {
        if self.is_exhausted() {
            return None;
        }

        // Take characters until delimiter
        let rest = &self.buffer[self.cursor..];
        let len = rest.find(['\n', ';']).unwrap_or(rest.len());
        let start = self.cursor;
        self.cursor += len + 1; // sizeof('\n' or ';')
        self.buffer.get(start..start + len)
    }
}

/// Stdin which is not attached to a terminal, i.e. piped.
#[derive(Debug)]
struct Stdin {
    stdin: io::Stdin,
    /// Commands of the last line read.
    pending: Argument,
}

impl Stdin {
    fn from(stdin: io::Stdin) -> Self {
        Self {
            stdin,
            pending: Argument::default(),
        }
    }
}

impl Read for Stdin {
    fn read(&mut self) -> Option<&str> {
        while self.pending.is_exhausted() {
            let mut line = String::new();
            match self.stdin.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => self.pending = Argument::from(line),
                Err(error) => {
                    log::warn!("Unable to read command: {error}");
                    return None;
                }
            }
        }
        self.pending.read()
    }
}

/// Interactive unbuffered terminal, with history.
#[derive(Debug)]
struct Terminal {
    term: console::Term,
    /// Commands of the last line typed.
    pending: Argument,
    history: Vec<String>,
}

impl Terminal {
    fn new() -> Self {
        Self {
            term: console::Term::stderr(),
            pending: Argument::default(),
            history: Vec::new(),
        }
    }

    fn print_prompt(&self, buffer: &str, cursor: usize) -> io::Result<()> {
        let mut term = &self.term;
        term.clear_line()?;
        write!(term, "{}{}", PROMPT.bold(), buffer)?;
        term.move_cursor_left(buffer.chars().count().saturating_sub(cursor))?;
        term.flush()
    }

    /// Read an entire (possibly multi-command) line. `None` on EOF or terminal failure.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buffer = String::new();
        // Visible cursor, as a char index
        let mut cursor = 0;
        // Focused item in history, or new entry if index == length
        let mut history_index = self.history.len();

        loop {
            self.print_prompt(&buffer, cursor)?;
            match self.term.read_key()? {
                Key::Enter | Key::Char('\n') => {
                    if !buffer.trim().is_empty() {
                        break;
                    }
                }
                // Ctrl+D on an empty line
                Key::Char('\x04') if buffer.is_empty() => {
                    self.term.write_line("")?;
                    return Ok(None);
                }
                Key::Char(ch) if !ch.is_control() => {
                    buffer.insert(byte_index(&buffer, cursor), ch);
                    cursor += 1;
                }
                Key::Backspace if cursor > 0 => {
                    cursor -= 1;
                    buffer.remove(byte_index(&buffer, cursor));
                }
                Key::Del if cursor < buffer.chars().count() => {
                    buffer.remove(byte_index(&buffer, cursor));
                }
                Key::ArrowLeft => cursor = cursor.saturating_sub(1),
                Key::ArrowRight => cursor = (cursor + 1).min(buffer.chars().count()),
                Key::ArrowUp if history_index > 0 => {
                    history_index -= 1;
                    buffer.clone_from(&self.history[history_index]);
                    cursor = buffer.chars().count();
                }
                Key::ArrowDown if history_index < self.history.len() => {
                    history_index += 1;
                    buffer = self.history.get(history_index).cloned().unwrap_or_default();
                    cursor = buffer.chars().count();
                }
                _ => (),
            }
        }
        self.term.write_line("")?;

        // Push to history if different to last command
        if self.history.last() != Some(&buffer) {
            self.history.push(buffer.clone());
        }
        Ok(Some(buffer))
    }
}

fn byte_index(buffer: &str, char_index: usize) -> usize {
    buffer
        .char_indices()
        .nth(char_index)
        .map_or(buffer.len(), |(index, _)| index)
}

impl Read for Terminal {
    fn read(&mut self) -> Option<&str> {
        while self.pending.is_exhausted() {
            match self.read_line() {
                Ok(Some(line)) => self.pending = Argument::from(line),
                Ok(None) => return None,
                Err(error) => {
                    log::warn!("Unable to read from terminal: {error}");
                    return None;
                }
            }
        }
        self.pending.read()
    }
}
