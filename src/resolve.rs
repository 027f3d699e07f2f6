//! Cross-reference resolution: namespace remapping.
//!
//! While walking, a document may establish that its public namespace
//! name differs from its introspection name. The remap table is
//! append-only during walking and read-only here. After all documents
//! are walked, every unresolved textual reference is rewritten in
//! place; references with no mapping hit are left as written and
//! resolve later through ordinary lexical scope lookup downstream.

use indexmap::IndexMap;

use crate::model::{NodeTree, SymbolGraph};
use crate::typeref::{TypeName, TypeRef, UnresolvedSymbol};

/// Introspection-namespace name → the authoritative symbol's dotted
/// path under its public name.
#[derive(Debug, Default)]
pub struct NamespaceMap {
    map: IndexMap<String, Vec<String>>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, gir_name: impl Into<String>, public_path: Vec<String>) {
        let gir_name = gir_name.into();
        tracing::debug!(gir_name, ?public_path, "namespace remap recorded");
        self.map.insert(gir_name, public_path);
    }

    pub fn get(&self, gir_name: &str) -> Option<&[String]> {
        self.map.get(gir_name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Rewrite one reference: find a mapping hit at any chain level, then
/// splice the mapped path over the hit segment and everything above it,
/// preserving the remainder below.
pub fn rewrite_reference(reference: &mut UnresolvedSymbol, map: &NamespaceMap) {
    let segments: Vec<String> = reference.segments().iter().map(|s| s.to_string()).collect();
    for (i, segment) in segments.iter().enumerate() {
        if let Some(target) = map.get(segment) {
            let mut new_segments: Vec<String> = target.to_vec();
            new_segments.extend(segments[i + 1..].iter().cloned());
            tracing::trace!(
                from = reference.to_dotted(),
                to = new_segments.join("."),
                "reference remapped"
            );
            reference.set_segments(new_segments);
            return;
        }
    }
}

fn rewrite_type(ty: &mut TypeRef, map: &NamespaceMap) {
    if let TypeName::Named(u) = &mut ty.base {
        rewrite_reference(u, map);
    }
    for arg in &mut ty.type_arguments {
        rewrite_type(arg, map);
    }
}

/// Resolve-all phase: rewrite every reference held by symbols and by
/// not-yet-finalized node state (raw parameters, alias bases).
pub fn resolve_references(graph: &mut SymbolGraph, tree: &mut NodeTree, map: &NamespaceMap) {
    if map.is_empty() {
        return;
    }
    tracing::debug!("resolving cross-references");
    for symbol in graph.iter_mut() {
        symbol.visit_types_mut(&mut |u| rewrite_reference(u, map));
    }
    for node in tree.iter_mut() {
        for info in &mut node.parameters {
            rewrite_type(&mut info.param.ty, map);
        }
        if let Some(base) = &mut node.base_type {
            rewrite_type(base, map);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> NamespaceMap {
        let mut m = NamespaceMap::new();
        m.insert("GObject", vec!["GLib".to_string()]);
        m
    }

    #[test]
    fn rewrites_top_segment() {
        let mut r = UnresolvedSymbol::from_dotted("GObject.Object", None);
        rewrite_reference(&mut r, &map());
        assert_eq!(r.to_dotted(), "GLib.Object");
    }

    #[test]
    fn preserves_remainder_of_multi_segment_chain() {
        let mut r = UnresolvedSymbol::from_dotted("GObject.Binding.Flags", None);
        rewrite_reference(&mut r, &map());
        assert_eq!(r.to_dotted(), "GLib.Binding.Flags");
    }

    #[test]
    fn no_hit_leaves_reference_as_written() {
        let mut r = UnresolvedSymbol::from_dotted("Gtk.Widget", None);
        rewrite_reference(&mut r, &map());
        assert_eq!(r.to_dotted(), "Gtk.Widget");
    }

    #[test]
    fn mapped_target_may_span_segments() {
        let mut m = NamespaceMap::new();
        m.insert("Cairo", vec!["Gdk".to_string(), "Cairo".to_string()]);
        let mut r = UnresolvedSymbol::from_dotted("Cairo.Context", None);
        rewrite_reference(&mut r, &m);
        assert_eq!(r.to_dotted(), "Gdk.Cairo.Context");
    }
}
