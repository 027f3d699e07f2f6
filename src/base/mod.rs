//! Foundation types for the pipeline.
//!
//! This module provides source-position tracking used throughout the
//! crate: [`Position`], [`Span`], and [`SourceRef`] (file + span).
//!
//! This module has NO dependencies on other girsym modules.

mod position;

pub use position::{Position, SourceRef, Span};
