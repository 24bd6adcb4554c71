use crate::lexer::cursor::Cursor;
use crate::span::{Idx, Span};

pub mod cursor;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    Ident,
    /// Decimal integer with an optional sign
    Int,
    Colon,
    Comment,
    Whitespace,
    Unknown,
    /// Any token whose length does not fit a span
    TooLong,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::Ident => "identifier",
            TokenKind::Int => "integer",
            TokenKind::Colon => "colon",
            TokenKind::Comment => "comment",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Unknown => "unknown",
            TokenKind::TooLong => "overlong token",
            TokenKind::Eof => "end of file",
        };
        f.write_str(name)
    }
}

/// Every token of `input`, including whitespace and comments, without the final `Eof`.
pub fn tokenize(input: &str) -> impl Iterator<Item = Token> + '_ {
    let mut cursor = Cursor::new(input);
    std::iter::from_fn(move || {
        let token = cursor.advance_token();
        if token.kind != TokenKind::Eof {
            Some(token)
        } else {
            None
        }
    })
}

pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\t' | '\r')
}

pub(crate) fn is_id_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

pub(crate) fn is_id(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}

impl Cursor<'_> {
    pub fn advance_token(&mut self) -> Token {
        let start = self.token_start();
        let first_char = match self.bump() {
            Some(c) => c,
            None => {
                return Token {
                    kind: TokenKind::Eof,
                    span: Span::new(Idx(start as u32), 0),
                }
            }
        };
        let kind = match first_char {
            ';' => {
                self.take_while(|c| c != '\n');
                TokenKind::Comment
            }
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                TokenKind::Whitespace
            }
            ':' => TokenKind::Colon,
            '+' | '-' if self.first().is_ascii_digit() => {
                self.take_while(|c| c.is_ascii_digit());
                TokenKind::Int
            }
            c if c.is_ascii_digit() => {
                self.take_while(|c| c.is_ascii_digit());
                TokenKind::Int
            }
            c if is_id_start(c) => {
                self.take_while(is_id);
                TokenKind::Ident
            }
            _ => TokenKind::Unknown,
        };
        let len = self.pos_in_token();
        self.reset_pos();
        let (kind, len) = match u16::try_from(len) {
            Ok(len) => (kind, len),
            Err(_) => (TokenKind::TooLong, u16::MAX),
        };
        Token {
            kind,
            span: Span::new(Idx(start as u32), len),
        }
    }
}
