//! Provisional node tree mirroring the introspection document during
//! construction. Parent nodes own children; a child's parent link is a
//! non-owning arena index. Insertion order of children is declaration
//! order and semantically meaningful.

use rustc_hash::FxHashMap;

use crate::base::SourceRef;
use crate::metadata::MetadataHandle;
use crate::typeref::TypeRef;

use super::symbol::{Parameter, SymbolId};

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Raw bookkeeping for one callable parameter before shaping.
#[derive(Debug, Clone)]
pub struct ParameterInfo {
    pub param: Parameter,
    /// Index of the parameter that carries this one's array length.
    pub array_length_idx: Option<usize>,
    /// Index of the user-data parameter for this callback.
    pub closure_idx: Option<usize>,
    /// Index of the destroy-notify parameter for this callback.
    pub destroy_idx: Option<usize>,
    /// Kept in the user-visible signature (decided during shaping).
    pub keep: bool,
}

impl ParameterInfo {
    pub fn new(param: Parameter) -> Self {
        Self {
            param,
            array_length_idx: None,
            closure_idx: None,
            destroy_idx: None,
            keep: true,
        }
    }
}

/// One element of the introspected document during construction.
#[derive(Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    /// Normalized document tag (`method`, `signal`, `record`, ...).
    pub element_kind: String,
    /// Effective (possibly overridden) name.
    pub name: String,
    /// Original document name, before overrides and normalization.
    pub girname: String,
    pub attributes: FxHashMap<String, String>,
    pub metadata: MetadataHandle,
    pub source: Option<SourceRef>,
    pub children: Vec<NodeId>,
    /// Effective name → same-named children; collision sets are the
    /// reconciliation pass's input.
    pub scope: FxHashMap<String, Vec<NodeId>>,
    pub symbol: Option<SymbolId>,
    pub new_symbol: bool,
    pub merged: bool,
    pub processed: bool,
    /// Signature parameters already built; shaping happens on demand
    /// and must run once.
    pub shaped: bool,
    /// Callable bookkeeping.
    pub parameters: Vec<ParameterInfo>,
    pub array_length_parameters: Vec<usize>,
    pub closure_parameters: Vec<usize>,
    pub destroy_parameters: Vec<usize>,
    /// Alias nodes: provisional base type.
    pub base_type: Option<TypeRef>,
}

impl Node {
    pub fn new(element_kind: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            parent: None,
            element_kind: element_kind.into(),
            girname: name.clone(),
            name,
            attributes: FxHashMap::default(),
            metadata: MetadataHandle::Empty,
            source: None,
            children: Vec::new(),
            scope: FxHashMap::default(),
            symbol: None,
            new_symbol: false,
            merged: false,
            processed: false,
            shaped: false,
            parameters: Vec::new(),
            array_length_parameters: Vec::new(),
            closure_parameters: Vec::new(),
            destroy_parameters: Vec::new(),
            base_type: None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attr_bool(&self, key: &str, default: bool) -> bool {
        match self.attr(key) {
            Some("1") | Some("true") => true,
            Some(_) => false,
            None => default,
        }
    }
}

/// Arena of all nodes for one pipeline run, rooted at a synthetic
/// namespace container shared by every walked document.
#[derive(Debug)]
pub struct NodeTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl NodeTree {
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.alloc(Node::new("root", ""));
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Attach `child` under `parent`, recording it in the parent's
    /// scope map under the child's effective name.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        let name = self.nodes[child.index()].name.clone();
        self.nodes[child.index()].parent = Some(parent);
        let p = &mut self.nodes[parent.index()];
        p.children.push(child);
        if !name.is_empty() {
            p.scope.entry(name).or_default().push(child);
        }
    }

    /// All children of `parent` sharing this effective name.
    pub fn lookup(&self, parent: NodeId, name: &str) -> &[NodeId] {
        self.get(parent)
            .scope
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First child with this name and element kind, for cross-document
    /// node reuse.
    pub fn lookup_kind(&self, parent: NodeId, name: &str, element_kind: &str) -> Option<NodeId> {
        self.lookup(parent, name)
            .iter()
            .copied()
            .find(|&id| self.get(id).element_kind == element_kind)
    }

    /// Same-named siblings of `id`, excluding `id` itself and anything
    /// already merged away.
    pub fn siblings_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        let Some(parent) = self.get(id).parent else {
            return Vec::new();
        };
        self.lookup(parent, name)
            .iter()
            .copied()
            .filter(|&s| s != id && !self.get(s).merged)
            .collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    /// Move a node under a new parent with a new effective name,
    /// updating both scope maps. Used for nested-struct field hoisting.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId, new_name: String) {
        if let Some(old_parent) = self.nodes[id.index()].parent {
            let old_name = self.nodes[id.index()].name.clone();
            let p = &mut self.nodes[old_parent.index()];
            p.children.retain(|&c| c != id);
            if let Some(entries) = p.scope.get_mut(&old_name) {
                entries.retain(|&c| c != id);
            }
        }
        self.nodes[id.index()].name = new_name;
        self.push_child(new_parent, id);
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}
