//! Recursive-descent parser for the override language.
//!
//! ```text
//! metadata ::= (rule '\n')*
//! rule     ::= pattern args?
//! pattern  ::= ('.')? glob ('#' selector)? ('.' glob ('#' selector)?)*
//! args     ::= (key ('=' literal)?)*
//! ```
//!
//! A leading dot marks a rule relative to the final node of the
//! immediately preceding absolute rule. A parse failure aborts this
//! file's override tree only; the caller falls back to an empty tree.

use std::sync::Arc;

use thiserror::Error;

use crate::base::{Position, SourceRef};

use super::lexer::{Token, TokenKind, tokenize};
use super::tree::{Argument, ArgumentType, Expression, Metadata, MetadataId, MetadataTree};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("unknown argument `{0}`")]
    UnknownArgument(String),
    #[error("expected identifier, found `{0}`")]
    ExpectedIdentifier(String),
    #[error("expected expression")]
    ExpectedExpression,
    #[error("expected pattern")]
    ExpectedPattern,
    #[error("expected end of rule")]
    ExpectedNewline,
    #[error("relative rule has no preceding rule")]
    DanglingRelativeRule,
}

/// A hard override-language parse error; recoverable at the pipeline
/// level (the file's override tree is dropped, the run continues).
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub source_ref: SourceRef,
}

/// Parse one override file into `tree`, returning the new file root.
pub fn parse_metadata(
    tree: &mut MetadataTree,
    input: &str,
    file: Arc<str>,
) -> Result<MetadataId, ParseError> {
    let tokens = tokenize(input);
    let root = tree.alloc_root(SourceRef::point(file.clone(), 1, 0));
    let mut parser = MetadataParser {
        tokens,
        pos: 0,
        file,
        tree,
        last_absolute: None,
    };
    match parser.parse(root) {
        Ok(()) => Ok(root),
        Err(e) => {
            // Partially parsed rules must not reach matching or the
            // dead-rule report.
            parser.tree.discard_root(root);
            Err(e)
        }
    }
}

struct MetadataParser<'a, 't> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    file: Arc<str>,
    tree: &'t mut MetadataTree,
    last_absolute: Option<MetadataId>,
}

impl<'a, 't> MetadataParser<'a, 't> {
    fn parse(&mut self, root: MetadataId) -> Result<(), ParseError> {
        loop {
            while self.eat(TokenKind::Newline) {}
            if self.peek().is_none() {
                break;
            }
            self.parse_rule(root)?;
        }
        Ok(())
    }

    fn parse_rule(&mut self, root: MetadataId) -> Result<(), ParseError> {
        let relative = self.eat(TokenKind::Dot);
        let parent = if relative {
            self.last_absolute
                .ok_or_else(|| self.error_here(ParseErrorKind::DanglingRelativeRule))?
        } else {
            root
        };

        let mut current = parent;
        loop {
            let glob = match self.peek() {
                Some(t) if t.kind == TokenKind::Word => self.advance(),
                _ => return Err(self.error_here(ParseErrorKind::ExpectedPattern)),
            };
            let glob_pos = glob.pos;
            let glob_text = glob.text.to_string();
            let selector = if self.eat(TokenKind::Hash) {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            let id = self.tree.alloc(Metadata::new(
                glob_text,
                selector,
                self.source(glob_pos),
            ));
            self.tree.add_child(current, id);
            current = id;
            if !self.eat(TokenKind::Dot) {
                break;
            }
        }

        while let Some(t) = self.peek() {
            if t.kind != TokenKind::Word {
                break;
            }
            let key = self.advance();
            let key_pos = key.pos;
            let key_text = key.text.to_string();
            if !is_identifier(&key_text) {
                return Err(self.error_at(key_pos, ParseErrorKind::ExpectedIdentifier(key_text)));
            }
            let arg_type = ArgumentType::from_key(&key_text)
                .ok_or_else(|| self.error_at(key_pos, ParseErrorKind::UnknownArgument(key_text)))?;
            let expr = if self.eat(TokenKind::Eq) {
                self.parse_expression()?
            } else {
                Expression::Bool(true)
            };
            let source = self.source(key_pos);
            self.tree
                .get_mut(current)
                .set_argument(arg_type, Argument::new(expr, source));
        }

        match self.peek() {
            None => {}
            Some(t) if t.kind == TokenKind::Newline => {
                self.advance();
            }
            Some(_) => return Err(self.error_here(ParseErrorKind::ExpectedNewline)),
        }

        if !relative {
            self.last_absolute = Some(current);
        }
        Ok(())
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let tok = match self.peek() {
            Some(t) => t.clone(),
            None => return Err(self.error_here(ParseErrorKind::ExpectedExpression)),
        };
        match tok.kind {
            TokenKind::String => {
                self.advance();
                Ok(Expression::String(unescape(&tok.text[1..tok.text.len() - 1])))
            }
            TokenKind::Minus => {
                self.advance();
                match self.peek() {
                    Some(t) if t.kind == TokenKind::Word && is_integer(t.text) => {
                        let value: i64 = self.advance().text.parse().unwrap_or(0);
                        Ok(Expression::Integer(-value))
                    }
                    _ => Err(self.error_here(ParseErrorKind::ExpectedExpression)),
                }
            }
            TokenKind::Word if tok.text == "null" => {
                self.advance();
                Ok(Expression::Null)
            }
            TokenKind::Word if tok.text == "true" => {
                self.advance();
                Ok(Expression::Bool(true))
            }
            TokenKind::Word if tok.text == "false" => {
                self.advance();
                Ok(Expression::Bool(false))
            }
            TokenKind::Word if is_integer(tok.text) => {
                self.advance();
                // A dot followed by digits makes this a real literal.
                if self.peek().map(|t| t.kind) == Some(TokenKind::Dot)
                    && self
                        .peek_ahead(1)
                        .is_some_and(|t| t.kind == TokenKind::Word && is_integer(t.text))
                {
                    self.advance();
                    let frac = self.advance().text;
                    let text = format!("{}.{frac}", tok.text);
                    let value: f64 = text.parse().unwrap_or(0.0);
                    return Ok(Expression::Real(value));
                }
                Ok(Expression::Integer(tok.text.parse().unwrap_or(0)))
            }
            TokenKind::Word if is_identifier(tok.text) => {
                let mut segments = vec![self.advance().text.to_string()];
                while self.peek().map(|t| t.kind) == Some(TokenKind::Dot) {
                    match self.peek_ahead(1) {
                        Some(t) if t.kind == TokenKind::Word && is_identifier(t.text) => {
                            self.advance();
                            segments.push(self.advance().text.to_string());
                        }
                        _ => break,
                    }
                }
                Ok(Expression::Member(segments))
            }
            _ => Err(self.error_here(ParseErrorKind::ExpectedExpression)),
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Word && is_identifier(t.text) => {
                Ok(self.advance().text.to_string())
            }
            Some(t) => {
                let text = t.text.to_string();
                let pos = t.pos;
                Err(self.error_at(pos, ParseErrorKind::ExpectedIdentifier(text)))
            }
            None => Err(self.error_here(ParseErrorKind::ExpectedIdentifier(String::new()))),
        }
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + n)
    }

    fn advance(&mut self) -> Token<'a> {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().map(|t| t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn source(&self, pos: Position) -> SourceRef {
        SourceRef::point(self.file.clone(), pos.line, pos.column)
    }

    fn error_here(&self, kind: ParseErrorKind) -> ParseError {
        let pos = self
            .peek()
            .map(|t| t.pos)
            .or_else(|| self.tokens.last().map(|t| t.pos))
            .unwrap_or(Position::new(1, 0));
        self.error_at(pos, kind)
    }

    fn error_at(&self, pos: Position, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            source_ref: self.source(pos),
        }
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_integer(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
