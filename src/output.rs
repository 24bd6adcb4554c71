use std::io::{self, Write};
use std::str::Chars;

use colored::Colorize;

use crate::debugger::{
    BreakpointView, CellView, CommandError, CpuView, DebugError, DebugView, SourceLine, HELP,
    PROMPT,
};
use crate::ops::Instruction;
use crate::runtime::Address;

/// Debugger output, drawn as a tree on a terminal.
///
/// With `minimal`, colors are removed, so that the output can be compared as plain text.
pub struct Terminal<W: Write = io::Stderr> {
    writer: W,
    minimal: bool,
}

impl Terminal {
    pub fn stderr(minimal: bool) -> Self {
        Self::new(io::stderr(), minimal)
    }
}

impl<W: Write> Terminal<W> {
    pub fn new(writer: W, minimal: bool) -> Self {
        Self { writer, minimal }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn print_str(&mut self, string: &str) {
        let result = if self.minimal {
            let colorless: String = Decolored::new(string).collect();
            self.writer.write_all(colorless.as_bytes())
        } else {
            self.writer.write_all(string.as_bytes())
        };
        if let Err(error) = result.and_then(|()| self.writer.flush()) {
            log::warn!("Failed to write debugger output: {error}");
        }
    }

    fn print_line(&mut self, line: &str) {
        self.print_str(line);
        self.print_str("\n");
    }

    /// Items below a title, with the last one closing the branch.
    fn print_list(&mut self, title: &str, items: &[String]) {
        if items.is_empty() {
            self.print_line(&format!(" │   └─ {title}: {}", "None".dimmed()));
            return;
        }
        self.print_line(&format!(" │   └─ {}:", title.bold()));
        for (index, item) in items.iter().enumerate() {
            let branch = if index + 1 == items.len() { "└─" } else { "├─" };
            self.print_line(&format!(" │       {branch} {item}"));
        }
    }
}

fn marker(is_set: bool, marker: &str) -> String {
    if is_set {
        marker.yellow().bold().to_string()
    } else {
        " ".repeat(marker.chars().count())
    }
}

impl<W: Write> DebugView for Terminal<W> {
    fn show_opening(&mut self) {
        let title = format!("rasp {}", env!("CARGO_PKG_VERSION"));
        self.print_line(&format!(" ┌─ {}", title.bold()));
        self.print_line(" │  Type `help` for a list of commands.");
    }

    fn show_closing(&mut self) {
        self.print_line(&format!(" └─ {}", "That's all folks!".bold()));
    }

    fn show_help(&mut self) {
        for line in HELP.lines() {
            self.print_line(&format!(" │ {}", line.blue()));
        }
    }

    fn show_command(&mut self, command: &str) {
        self.print_line(&format!("{}{}", PROMPT.dimmed(), command));
    }

    fn show_cpu(&mut self, cpu: &CpuView) {
        let next = match &cpu.next {
            Some(instruction) => instruction.to_string(),
            None => "-".to_string(),
        };
        let items = [
            format!("ACC: {:>6}", cpu.accumulator),
            format!(" IP: {:0>6} ~ {}", cpu.instruction_pointer, next.as_str().cyan()),
        ];
        self.print_list("CPU", &items);
    }

    fn show_memory(&mut self, cells: &[CellView]) {
        let items: Vec<_> = cells
            .iter()
            .map(|cell| {
                format!(
                    "{:0>3}: {} {} {:>5} {}",
                    cell.address,
                    marker(cell.is_current, ">>>"),
                    marker(cell.is_breakpoint, "(b)"),
                    cell.value,
                    cell.mnemonic.cyan(),
                )
            })
            .collect();
        self.print_list("Memory", &items);
    }

    fn show_breakpoints(&mut self, breakpoints: &[BreakpointView]) {
        let items: Vec<_> = breakpoints
            .iter()
            .map(|breakpoint| {
                format!(
                    "{} {:>5}: {:>5} {}",
                    marker(breakpoint.is_current, ">>>"),
                    breakpoint.address,
                    breakpoint.value,
                    breakpoint.mnemonic.cyan(),
                )
            })
            .collect();
        self.print_list("Breakpoints", &items);
    }

    fn show_source(&mut self, lines: &[SourceLine]) {
        let items: Vec<_> = lines
            .iter()
            .map(|line| {
                format!(
                    "{:0>3}: {} {} {}",
                    line.number,
                    marker(line.is_current, ">>>"),
                    marker(line.is_breakpoint, "(b)"),
                    line.text,
                )
            })
            .collect();
        self.print_list("Assembly Code", &items);
    }

    fn show_instruction(&mut self, address: Address, instruction: &Instruction) {
        self.print_line(&format!(
            " │ {} {}",
            "RUN:".green(),
            format!("{instruction} ({address})").as_str().dimmed()
        ));
    }

    fn show_halted(&mut self) {
        self.print_line(&format!(" │ {}", "Program has halted.".yellow()));
    }

    fn report(&mut self, message: &str) {
        self.print_line(&format!(" │ {}", message.blue()));
    }

    fn report_error(&mut self, error: &DebugError) {
        self.print_line(&format!(" │ {} {error}.", "Error:".red().bold()));
    }

    fn invalid_command(&mut self, command: &str, error: &CommandError) {
        self.print_line(&format!(
            " │ {} '{command}'. {error}.",
            "Invalid command".red().bold()
        ));
        self.print_line(" │ Use 'help' to list the available commands.");
    }
}

/// Characters of a string, without ANSI escape sequences.
struct Decolored<'a> {
    chars: Chars<'a>,
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}
