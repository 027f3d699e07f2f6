//! Override language: the small pattern/argument DSL used to patch and
//! annotate introspection data without editing it.
//!
//! A metadata file holds one rule per line; each rule is a dotted chain
//! of glob patterns (optionally restricted to an element selector) plus
//! arguments from a fixed key set. The document walker consults the
//! parsed tree at every element to decide skip/keep and to pick up
//! overrides.

mod lexer;
mod parser;
mod tree;

pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, ParseErrorKind, parse_metadata};
pub use tree::{
    Argument, ArgumentType, Expression, Metadata, MetadataHandle, MetadataId, MetadataTree,
    apply_name_pattern, glob_match,
};

/// Normalize a document tag or rule selector: strip a namespace prefix
/// (`glib:signal` → `signal`) and turn hyphens into underscores
/// (`virtual-method` → `virtual_method`).
pub fn normalize_selector(tag: &str) -> String {
    let tag = tag.rsplit(':').next().unwrap_or(tag);
    tag.replace('-', "_")
}

/// Normalize a document `name` attribute for matching (hyphens become
/// underscores).
pub fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}

#[cfg(test)]
mod tests;
