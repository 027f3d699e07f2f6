//! # girsym
//!
//! Introspection-to-symbol-graph pipeline: ingests GObject
//! introspection documents plus a small override language and produces
//! a fully resolved, richly-typed symbol graph for binding generation.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! pipeline   → phase driver (walk-all → resolve-all → reconcile-all)
//!   ↓
//! reconcile  → post-order merge/rename/reorder heuristics
//!   ↓
//! resolve    → cross-namespace reference rewriting
//!   ↓
//! gir        → streaming document walker (quick-xml pull reader)
//!   ↓
//! model      → Node tree and Symbol graph arenas
//!   ↓
//! metadata   → override-language lexer/parser and match tree
//!   ↓
//! typeref    → type descriptors and the type-string mini-parser
//!   ↓
//! diagnostics, base → reporting sink, source positions
//! ```

// ============================================================================
// MODULES (dependency order: base → typeref → metadata → model → gir →
// resolve → reconcile → pipeline)
// ============================================================================

/// Foundation types: source positions and spans
pub mod base;

/// Diagnostic sink: positioned errors and warnings
pub mod diagnostics;

/// Override language: Logos lexer, rule parser, match tree
pub mod metadata;

/// Type descriptors and the inline type-string mini-parser
pub mod typeref;

/// Shared data model: Node tree and Symbol graph
pub mod model;

/// Streaming GIR document walker
pub mod gir;

/// Cross-namespace reference resolution
pub mod resolve;

/// Reconciliation engine: merging, renaming, parameter shaping
pub mod reconcile;

/// Pipeline driver and shared context
pub mod pipeline;

// Re-export the surface most callers need
pub use diagnostics::{Diagnostic, Reporter, Severity};
pub use model::{Symbol, SymbolGraph, SymbolId, SymbolKind};
pub use pipeline::{Config, Pipeline, PipelineError, PipelineOutput};
pub use typeref::{TypeRef, parse_type_string};
