// Heavily inspired by `rustc_lexer` and adapted to suit the project.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

pub(crate) const EOF_CHAR: char = '\0';

/// Peekable iterator over a char sequence.
#[derive(Clone)]
pub struct Cursor<'a> {
    len_remaining: usize,
    /// Iterator over chars in a &str
    chars: Chars<'a>,
    /// Length of the whole source, to compute offsets
    src_len: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            len_remaining: input.len(),
            chars: input.chars(),
            src_len: input.len(),
        }
    }

    /// Peek at the next char without consuming it. `EOF_CHAR` at the end.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    /// File is finished parsing
    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Advance by one character
    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    /// Offset of the start of the current token
    pub fn token_start(&self) -> usize {
        self.src_len - self.len_remaining
    }

    /// Amount of bytes consumed since the last `reset_pos`
    pub fn pos_in_token(&self) -> u32 {
        (self.len_remaining - self.chars.as_str().len()) as u32
    }

    pub fn reset_pos(&mut self) {
        self.len_remaining = self.chars.as_str().len();
    }
}
