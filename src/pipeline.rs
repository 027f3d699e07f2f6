//! Pipeline entry point: four strict phases over any number of
//! documents.
//!
//! Every document is walked before any reference is resolved, and every
//! reference is resolved before reconciliation starts. The phases share
//! one [`Context`] so a later document can extend types introduced by an
//! earlier one.

use std::sync::Arc;

use thiserror::Error;

use crate::diagnostics::{Diagnostic, Reporter};
use crate::gir::{DocumentWalker, GirError};
use crate::metadata::{MetadataHandle, MetadataTree, parse_metadata};
use crate::model::{NodeTree, SymbolGraph};
use crate::reconcile;
use crate::resolve::{NamespaceMap, resolve_references};

/// Pipeline-wide knobs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Implicit base type given to classes whose document names none.
    pub object_base_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            object_base_type: "GLib.Object".to_string(),
        }
    }
}

/// Document-level pipeline failures. Diagnostics cover everything
/// recoverable; these abort the offending input only.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Document(#[from] GirError),
}

/// State shared by all phases.
pub(crate) struct Context {
    pub(crate) reporter: Reporter,
    pub(crate) metadata: MetadataTree,
    pub(crate) tree: NodeTree,
    pub(crate) graph: SymbolGraph,
    pub(crate) namespace_map: NamespaceMap,
    pub(crate) dependencies: Vec<String>,
    pub(crate) packages: Vec<String>,
    pub(crate) config: Config,
}

impl Context {
    fn new(config: Config) -> Self {
        Self {
            reporter: Reporter::new(),
            metadata: MetadataTree::new(),
            tree: NodeTree::new(),
            graph: SymbolGraph::new(),
            namespace_map: NamespaceMap::new(),
            dependencies: Vec::new(),
            packages: Vec::new(),
            config,
        }
    }
}

/// Everything the pipeline produces.
pub struct PipelineOutput {
    pub graph: SymbolGraph,
    pub diagnostics: Vec<Diagnostic>,
    /// `include` entries collected across all documents, in order.
    pub dependencies: Vec<String>,
    /// `package` names claimed across all documents, in order.
    pub packages: Vec<String>,
    pub error_count: usize,
    pub warning_count: usize,
}

/// Driver for one end-to-end run.
pub struct Pipeline {
    ctx: Context,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            ctx: Context::new(config),
        }
    }

    /// Phase one, per document: parse the override file (when present),
    /// then stream the document into the shared node tree and symbol
    /// graph.
    pub fn parse_document(
        &mut self,
        xml: &str,
        path: &str,
        overrides: Option<(&str, &str)>,
    ) -> Result<(), PipelineError> {
        let handle = match overrides {
            Some((text, override_path)) => {
                let file: Arc<str> = Arc::from(override_path);
                match parse_metadata(&mut self.ctx.metadata, text, file) {
                    Ok(root) => MetadataHandle::One(root),
                    // A broken override file loses its overrides only;
                    // the document itself still gets walked.
                    Err(e) => {
                        self.ctx
                            .reporter
                            .error(Some(e.source_ref.clone()), e.to_string());
                        MetadataHandle::Empty
                    }
                }
            }
            None => MetadataHandle::Empty,
        };
        tracing::info!(path, "walking document");
        DocumentWalker::walk(&mut self.ctx, xml, path, handle)?;
        Ok(())
    }

    /// Phase two: rewrite every cross-namespace reference through the
    /// accumulated namespace map.
    pub fn resolve(&mut self) {
        tracing::info!("resolving references");
        resolve_references(
            &mut self.ctx.graph,
            &mut self.ctx.tree,
            &self.ctx.namespace_map,
        );
    }

    /// Phase three: bottom-up reconciliation of the whole forest, then
    /// dead-override reporting.
    pub fn reconcile(&mut self) {
        tracing::info!("reconciling");
        reconcile::reconcile(&mut self.ctx);
        self.ctx.metadata.report_unused(&mut self.ctx.reporter);
    }

    /// Run the remaining phases and surrender the results.
    pub fn run(mut self) -> PipelineOutput {
        self.resolve();
        self.reconcile();
        let Context {
            reporter,
            graph,
            dependencies,
            packages,
            ..
        } = self.ctx;
        PipelineOutput {
            graph,
            error_count: reporter.error_count(),
            warning_count: reporter.warning_count(),
            diagnostics: reporter.into_diagnostics(),
            dependencies,
            packages,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
