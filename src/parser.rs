use crate::ast::{AssemblyProgram, Declaration, Operand, Operation};
use crate::error::SyntaxError;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::runtime::Word;
use crate::span::{Idx, Span};

const SEGMENT: &str = "segment";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Segment {
    Data,
    Code,
}

/// Transforms assembly source into an `AssemblyProgram`.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    /// Tokens without whitespace and comments
    toks: Vec<Token>,
    pos: usize,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Result<Self, SyntaxError> {
        let mut toks = Vec::new();
        for tok in tokenize(src) {
            match tok.kind {
                TokenKind::Comment | TokenKind::Whitespace => continue,
                TokenKind::Unknown => {
                    return Err(SyntaxError::new(
                        format!("Unexpected character `{}`", &src[tok.span.as_range()]),
                        tok.span,
                        "unknown token",
                    )
                    .with_help("identifiers start with a letter, comments with `;`"))
                }
                TokenKind::TooLong => {
                    return Err(SyntaxError::new(
                        format!("Token is longer than {} characters", u16::MAX),
                        tok.span,
                        "overlong token",
                    )
                    .with_help("use shorter labels and fewer digits"))
                }
                _ => toks.push(tok),
            }
        }
        Ok(AsmParser { src, toks, pos: 0 })
    }

    pub fn parse(mut self) -> Result<AssemblyProgram, SyntaxError> {
        let mut program = AssemblyProgram::default();

        let first = self.expect_segment()?;
        if first == Segment::Data {
            program.data = self.parse_declarations()?;
            if self.peek().kind != TokenKind::Eof {
                let second = self.expect_segment()?;
                if second == Segment::Data {
                    return Err(self.error_before(
                        "Data segment declared twice",
                        "second data segment",
                        "a program holds at most one data segment, followed by one code segment",
                    ));
                }
                program.code = self.parse_operations()?;
            }
        } else {
            program.code = self.parse_operations()?;
        }

        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            return Err(SyntaxError::new(
                "Expected end of file",
                tok.span,
                "unexpected token",
            )
            .with_help("the code segment must come after the data segment"));
        }
        Ok(program)
    }

    fn parse_declarations(&mut self) -> Result<Vec<Declaration>, SyntaxError> {
        let mut data = Vec::new();
        while !self.at_segment_header() && self.peek().kind != TokenKind::Eof {
            let label = self.expect(TokenKind::Ident)?;
            let line = label.span.line_in(self.src);
            let size_tok = self.expect(TokenKind::Int)?;
            let size = self.int_value(size_tok)?;
            let reserved_size = usize::try_from(size)
                .ok()
                .filter(|size| *size >= 1)
                .ok_or_else(|| {
                    SyntaxError::new(
                        format!("Invalid size {size}"),
                        size_tok.span,
                        "not a positive size",
                    )
                    .with_help("each variable reserves at least one cell")
                })?;
            let init_tok = self.expect(TokenKind::Int)?;
            let initial_value = self.int_value(init_tok)?;
            data.push(
                Declaration::new(self.text(label), reserved_size, initial_value).at_line(line),
            );
        }
        if data.is_empty() {
            return Err(self.empty_segment("data", "declarations look like `label size value`"));
        }
        Ok(data)
    }

    fn parse_operations(&mut self) -> Result<Vec<Operation>, SyntaxError> {
        let mut code = Vec::new();
        while !self.at_segment_header() && self.peek().kind != TokenKind::Eof {
            let first = self.expect(TokenKind::Ident)?;
            let line = first.span.line_in(self.src);
            let (label, mnemonic) = if self.peek().kind == TokenKind::Colon {
                self.pos += 1;
                let mnemonic = self.expect(TokenKind::Ident)?;
                (Some(self.text(first).to_string()), mnemonic)
            } else {
                (None, first)
            };
            let operand_tok = self.next();
            let operand = match operand_tok.kind {
                TokenKind::Int => Operand::Literal(self.int_value(operand_tok)?),
                TokenKind::Ident => Operand::Symbol(self.text(operand_tok).to_string()),
                _ => {
                    return Err(self.unexpected(
                        operand_tok,
                        "integer or identifier",
                        "every operation takes one operand, even `halt`",
                    ))
                }
            };
            let mut operation =
                Operation::new(self.text(mnemonic).to_lowercase(), operand).at_line(line);
            operation.label = label;
            code.push(operation);
        }
        if code.is_empty() {
            return Err(self.empty_segment("code", "operations look like `[label:] mnemonic operand`"));
        }
        Ok(code)
    }

    /// `segment : data|code`
    fn expect_segment(&mut self) -> Result<Segment, SyntaxError> {
        let keyword = self.expect(TokenKind::Ident)?;
        if self.text(keyword) != SEGMENT {
            return Err(SyntaxError::new(
                format!("Expected `segment`, found `{}`", self.text(keyword)),
                keyword.span,
                "expected segment header",
            )
            .with_help("programs start with `segment: data` or `segment: code`"));
        }
        self.expect(TokenKind::Colon)?;
        let name = self.expect(TokenKind::Ident)?;
        match self.text(name) {
            "data" => Ok(Segment::Data),
            "code" => Ok(Segment::Code),
            other => Err(SyntaxError::new(
                format!("Unknown segment `{other}`"),
                name.span,
                "unknown segment",
            )
            .with_help("segments are either `data` or `code`")),
        }
    }

    fn at_segment_header(&self) -> bool {
        let tok = self.peek();
        tok.kind == TokenKind::Ident
            && self.text(tok) == SEGMENT
            && self
                .toks
                .get(self.pos + 1)
                .is_some_and(|next| next.kind == TokenKind::Colon)
    }

    fn peek(&self) -> Token {
        self.toks.get(self.pos).copied().unwrap_or_else(|| self.eof())
    }

    fn next(&mut self) -> Token {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, SyntaxError> {
        let tok = self.next();
        if tok.kind == expected {
            return Ok(tok);
        }
        Err(self.unexpected(
            tok,
            &expected.to_string(),
            "check the shape of the line against `label size value` or `[label:] mnemonic operand`",
        ))
    }

    fn text(&self, tok: Token) -> &'a str {
        &self.src[tok.span.as_range()]
    }

    fn int_value(&self, tok: Token) -> Result<Word, SyntaxError> {
        let text = self.text(tok);
        text.strip_prefix('+').unwrap_or(text).parse().map_err(|_| {
            SyntaxError::new(
                format!("Integer {text} is out of range"),
                tok.span,
                "out-of-range integer",
            )
        })
    }

    fn eof(&self) -> Token {
        Token {
            kind: TokenKind::Eof,
            span: Span::new(Idx(self.src.len() as u32), 0),
        }
    }

    fn unexpected(&self, tok: Token, expected: &str, help: &'static str) -> SyntaxError {
        let message = if tok.kind == TokenKind::Eof {
            format!("Expected {expected}, found end of file")
        } else {
            format!("Expected {expected}, found `{}`", self.text(tok))
        };
        SyntaxError::new(message, tok.span, "unexpected token").with_help(help)
    }

    fn empty_segment(&self, name: &str, help: &'static str) -> SyntaxError {
        SyntaxError::new(
            format!("Empty {name} segment"),
            self.peek().span,
            "expected at least one entry",
        )
        .with_help(help)
    }

    fn error_before(&self, message: &str, label: &'static str, help: &'static str) -> SyntaxError {
        let span = self.toks[self.pos.saturating_sub(1)].span;
        SyntaxError::new(message, span, label).with_help(help)
    }
}

/// Parse a complete assembly source.
pub fn parse(src: &str) -> Result<AssemblyProgram, SyntaxError> {
    AsmParser::new(src)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_segment() {
        let program = parse("segment: code\n load 5\n halt 0\n").unwrap();
        assert!(program.data.is_empty());
        assert_eq!(
            program.code,
            vec![
                Operation::new("load", 5).at_line(2),
                Operation::new("halt", 0).at_line(3),
            ]
        );
    }

    #[test]
    fn parses_data_and_code() {
        let src = r#"
        ; Doubles the input
        segment: data
            v 1 0
            table 3 -2   ; three cells
        segment: code
            read v
            load +0
        end: HALT 0
        "#;
        let program = parse(src).unwrap();
        assert_eq!(
            program.data,
            vec![
                Declaration::new("v", 1, 0).at_line(4),
                Declaration::new("table", 3, -2).at_line(5),
            ]
        );
        assert_eq!(
            program.code,
            vec![
                Operation::new("read", "v").at_line(7),
                Operation::new("load", 0).at_line(8),
                Operation::new("halt", 0).labelled("end").at_line(9),
            ]
        );
    }

    #[test]
    fn parses_data_segment_alone() {
        let program = parse("segment: data x 2 7").unwrap();
        assert_eq!(program.data, vec![Declaration::new("x", 2, 7).at_line(1)]);
        assert!(program.code.is_empty());
    }

    #[test]
    fn labels_may_stand_on_their_own_line() {
        let program = parse("segment: code\nstart:\n  load 1\n").unwrap();
        assert_eq!(
            program.code,
            vec![Operation::new("load", 1).labelled("start").at_line(2)]
        );
    }

    #[test]
    fn rejects_malformed_sources() {
        assert!(parse("").is_err());
        assert!(parse("load 1").is_err());
        assert!(parse("segment: code").is_err());
        assert!(parse("segment: stack\n x 1 0").is_err());
        assert!(parse("segment: code\n load").is_err());
        assert!(parse("segment: code\n load 1\nsegment: data\n x 1 0").is_err());
        assert!(parse("segment: data\n x 1 0\nsegment: data\n y 1 0").is_err());
        assert!(parse("segment: data\n x 0 1").is_err());
        assert!(parse("segment: code\n load $1").is_err());
        assert!(parse("segment: code\n load 99999999999999999999").is_err());
    }

    #[test]
    fn error_points_at_offending_token() {
        let src = "segment: code\n load 1\n store 5 6";
        let error = parse(src).unwrap_err();
        assert_eq!(error.message, "Expected identifier, found `6`");
        assert_eq!(error.span.offset(), src.len() - 1);
    }

    #[test]
    fn rejects_overlong_label() {
        let src = format!("segment: code\n{}: halt 0\n", "x".repeat(u16::MAX as usize + 1));
        let error = parse(&src).unwrap_err();
        assert_eq!(error.message, "Token is longer than 65535 characters");
        assert_eq!(error.span.offset(), "segment: code\n".len());
    }
}
