//! Logos-based lexer for the override language.
//!
//! The grammar is line oriented: newlines terminate rules, a trailing
//! backslash continues a rule on the next physical line. Pattern globs
//! and identifiers lex as one `Word` token; the parser decides which
//! words are identifiers, keys, numbers or glob patterns.

use logos::Logos;

use crate::base::Position;

/// A token with its kind, text, and line/column position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub pos: Position,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
#[logos(skip r"\\\r?\n")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    #[regex(r"\r?\n")]
    Newline,

    #[token(".")]
    Dot,

    #[token("#")]
    Hash,

    #[token("=")]
    Eq,

    #[token("-")]
    Minus,

    /// A run of pattern characters: identifiers, globs, digits.
    #[regex(r"[A-Za-z0-9_*?+|()\[\]]+")]
    Word,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    /// Anything logos could not match.
    Error,
}

/// Lexer wrapping the logos-generated tokenizer, tracking line starts so
/// every token carries a position.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    line_starts: Vec<usize>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in input.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            inner: TokenKind::lexer(input),
            line_starts,
        }
    }

    fn position_at(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&s| s <= offset);
        Position::new(line, offset - self.line_starts[line - 1])
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = match self.inner.next()? {
            Ok(k) => k,
            Err(()) => TokenKind::Error,
        };
        let text = self.inner.slice();
        let pos = self.position_at(self.inner.span().start);
        Some(Token { kind, text, pos })
    }
}

/// Tokenize an entire override file into a Vec.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}
