//! Streaming document walker for GIR introspection documents.
//!
//! The walker streams one document depth-first, consulting the override
//! tree at each element to decide skip/keep, and builds the provisional
//! [`Node`](crate::model::Node) tree. Symbol construction details that
//! need cross-element knowledge (parameter shaping, merges, C-prefix
//! derivation) are deferred to the reconciliation engine.

use thiserror::Error;

mod walker;
mod xml;

pub use walker::DocumentWalker;

#[cfg(test)]
mod tests;

/// The single supported introspection format version.
pub const GIR_VERSION: &str = "1.2";

/// Document-level failures. Only `UnsupportedVersion` is document-fatal;
/// everything else recoverable reports through the [`Reporter`]
/// (crate::diagnostics::Reporter) and processing continues.
#[derive(Debug, Clone, Error)]
pub enum GirError {
    #[error("unsupported GIR version `{0}` (supported: {GIR_VERSION})")]
    UnsupportedVersion(String),

    #[error("malformed document: {0}")]
    Xml(String),

    #[error("expected `repository` root element, found `{0}`")]
    UnexpectedRoot(String),

    #[error("unexpected end of document")]
    UnexpectedEof,
}
