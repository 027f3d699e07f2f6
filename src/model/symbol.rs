//! The output symbol model: a closed set of symbol kinds plus an arena
//! graph. Containers hold ordered member lists; name uniqueness is NOT
//! required at this layer, since collisions are exactly what the
//! reconciliation pass adjudicates.

use crate::base::SourceRef;
use crate::typeref::{TypeRef, UnresolvedSymbol};

/// Unique identifier for a symbol in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Instance,
    Static,
    Creation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transfer {
    #[default]
    None,
    Container,
    Full,
}

/// A callable parameter in its final shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    pub direction: Direction,
    pub transfer: Transfer,
    pub default: Option<String>,
    pub ellipsis: bool,
    /// Callback scope from the document (`call`, `async`, `notified`).
    pub scope: Option<String>,
    /// Real-valued ordering key (`vala_idx`): kept parameters get
    /// consecutive integers, hidden ones a fractional interpolation.
    pub position: Option<f64>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            direction: Direction::In,
            transfer: Transfer::None,
            default: None,
            ellipsis: false,
            scope: None,
            position: None,
        }
    }

    /// Whether the parameter is part of the user-visible signature.
    pub fn is_visible(&self) -> bool {
        match self.position {
            Some(p) => p.fract() == 0.0,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    pub return_type: TypeRef,
    pub throws: bool,
}

impl Signature {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
            return_type: TypeRef::void(),
            throws: false,
        }
    }

    pub fn visible_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_visible())
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::new()
    }
}

/// The closed set of symbol variants. Exhaustive matching in the
/// reconciliation engine guarantees every new variant gets handled at
/// each dispatch site.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Namespace {
        members: Vec<SymbolId>,
    },
    Class {
        base: Option<TypeRef>,
        interfaces: Vec<TypeRef>,
        is_abstract: bool,
        type_id: Option<String>,
        members: Vec<SymbolId>,
    },
    Interface {
        prerequisites: Vec<TypeRef>,
        /// C-name of the native type struct, set when a gtype-struct
        /// record names this interface.
        type_struct_cname: Option<String>,
        members: Vec<SymbolId>,
    },
    Struct {
        base: Option<TypeRef>,
        /// Value-semantics simple type (opaque or plain-old-data).
        simple_type: bool,
        members: Vec<SymbolId>,
    },
    Enum {
        is_flags: bool,
        members: Vec<SymbolId>,
    },
    ErrorDomain {
        quark: Option<String>,
        members: Vec<SymbolId>,
    },
    Delegate {
        signature: Signature,
    },
    Method {
        kind: MethodKind,
        signature: Signature,
        is_virtual: bool,
        is_abstract: bool,
        vfunc_name: Option<String>,
        /// Two-phase asynchronous operation.
        coroutine: bool,
        /// Virtual method without a generated invoker wrapper.
        no_wrapper: bool,
        printf_format: bool,
        finish_cname: Option<String>,
    },
    Property {
        ty: TypeRef,
        readable: bool,
        writable: bool,
        construct: bool,
        /// Promoted from "no-accessor" only when getter/setter shapes
        /// check out.
        accessor_methods: bool,
    },
    Field {
        ty: TypeRef,
        array_length_cname: Option<String>,
    },
    Signal {
        signature: Signature,
        has_emitter: bool,
        is_virtual: bool,
    },
    Constant {
        ty: TypeRef,
        value: Option<String>,
    },
    EnumValue {
        value: Option<String>,
    },
    ErrorCode {
        value: Option<String>,
    },
}

/// A finalized, typed output entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub access: Access,
    /// Authoritative symbol introduced by an earlier document.
    pub external: bool,
    pub cname: Option<String>,
    pub cprefix: Option<String>,
    pub cheaders: Vec<String>,
    pub deprecated: bool,
    pub deprecated_since: Option<String>,
    pub replacement: Option<String>,
    pub hidden: bool,
    pub source: Option<SourceRef>,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            access: Access::Public,
            external: false,
            cname: None,
            cprefix: None,
            cheaders: Vec::new(),
            deprecated: false,
            deprecated_since: None,
            replacement: None,
            hidden: false,
            source: None,
            kind,
        }
    }

    pub fn members(&self) -> Option<&[SymbolId]> {
        match &self.kind {
            SymbolKind::Namespace { members }
            | SymbolKind::Class { members, .. }
            | SymbolKind::Interface { members, .. }
            | SymbolKind::Struct { members, .. }
            | SymbolKind::Enum { members, .. }
            | SymbolKind::ErrorDomain { members, .. } => Some(members),
            SymbolKind::Delegate { .. }
            | SymbolKind::Method { .. }
            | SymbolKind::Property { .. }
            | SymbolKind::Field { .. }
            | SymbolKind::Signal { .. }
            | SymbolKind::Constant { .. }
            | SymbolKind::EnumValue { .. }
            | SymbolKind::ErrorCode { .. } => None,
        }
    }

    pub fn members_mut(&mut self) -> Option<&mut Vec<SymbolId>> {
        match &mut self.kind {
            SymbolKind::Namespace { members }
            | SymbolKind::Class { members, .. }
            | SymbolKind::Interface { members, .. }
            | SymbolKind::Struct { members, .. }
            | SymbolKind::Enum { members, .. }
            | SymbolKind::ErrorDomain { members, .. } => Some(members),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        self.members().is_some()
    }

    pub fn signature(&self) -> Option<&Signature> {
        match &self.kind {
            SymbolKind::Delegate { signature }
            | SymbolKind::Method { signature, .. }
            | SymbolKind::Signal { signature, .. } => Some(signature),
            _ => None,
        }
    }

    pub fn signature_mut(&mut self) -> Option<&mut Signature> {
        match &mut self.kind {
            SymbolKind::Delegate { signature }
            | SymbolKind::Method { signature, .. }
            | SymbolKind::Signal { signature, .. } => Some(signature),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            SymbolKind::Namespace { .. } => "namespace",
            SymbolKind::Class { .. } => "class",
            SymbolKind::Interface { .. } => "interface",
            SymbolKind::Struct { .. } => "struct",
            SymbolKind::Enum { .. } => "enum",
            SymbolKind::ErrorDomain { .. } => "error domain",
            SymbolKind::Delegate { .. } => "delegate",
            SymbolKind::Method { .. } => "method",
            SymbolKind::Property { .. } => "property",
            SymbolKind::Field { .. } => "field",
            SymbolKind::Signal { .. } => "signal",
            SymbolKind::Constant { .. } => "constant",
            SymbolKind::EnumValue { .. } => "enum value",
            SymbolKind::ErrorCode { .. } => "error code",
        }
    }

    /// Lower-case C function prefix: explicit `cprefix` wins, otherwise
    /// derived from the C type name.
    pub fn lower_cname_prefix(&self) -> Option<String> {
        if let Some(p) = &self.cprefix {
            return Some(p.clone());
        }
        self.cname
            .as_deref()
            .map(|c| format!("{}_", camel_to_snake(c)))
    }

    /// Apply `f` to every type reference this symbol carries, including
    /// nested type arguments.
    pub fn visit_types_mut(&mut self, f: &mut impl FnMut(&mut UnresolvedSymbol)) {
        fn visit(ty: &mut TypeRef, f: &mut impl FnMut(&mut UnresolvedSymbol)) {
            if let crate::typeref::TypeName::Named(u) = &mut ty.base {
                f(u);
            }
            for arg in &mut ty.type_arguments {
                visit(arg, f);
            }
        }
        fn visit_sig(sig: &mut Signature, f: &mut impl FnMut(&mut UnresolvedSymbol)) {
            for p in &mut sig.parameters {
                visit(&mut p.ty, f);
            }
            visit(&mut sig.return_type, f);
        }
        match &mut self.kind {
            SymbolKind::Namespace { .. } | SymbolKind::EnumValue { .. }
            | SymbolKind::ErrorCode { .. } | SymbolKind::Enum { .. }
            | SymbolKind::ErrorDomain { .. } => {}
            SymbolKind::Class {
                base, interfaces, ..
            } => {
                if let Some(b) = base {
                    visit(b, f);
                }
                for i in interfaces {
                    visit(i, f);
                }
            }
            SymbolKind::Interface { prerequisites, .. } => {
                for p in prerequisites {
                    visit(p, f);
                }
            }
            SymbolKind::Struct { base, .. } => {
                if let Some(b) = base {
                    visit(b, f);
                }
            }
            SymbolKind::Delegate { signature }
            | SymbolKind::Method { signature, .. }
            | SymbolKind::Signal { signature, .. } => visit_sig(signature, f),
            SymbolKind::Property { ty, .. }
            | SymbolKind::Field { ty, .. }
            | SymbolKind::Constant { ty, .. } => visit(ty, f),
        }
    }
}

/// Arena graph of all symbols, attached to a root namespace.
#[derive(Debug)]
pub struct SymbolGraph {
    arena: Vec<Symbol>,
    root: SymbolId,
}

impl SymbolGraph {
    pub fn new() -> Self {
        let mut graph = Self {
            arena: Vec::new(),
            root: SymbolId(0),
        };
        graph.root = graph.alloc(Symbol::new("", SymbolKind::Namespace { members: Vec::new() }));
        graph
    }

    pub fn root(&self) -> SymbolId {
        self.root
    }

    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId::new(self.arena.len());
        self.arena.push(symbol);
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.arena[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.arena[id.index()]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Append a member to a container; returns false (and leaves the
    /// graph untouched) when `container` is not a container kind.
    pub fn add_member(&mut self, container: SymbolId, member: SymbolId) -> bool {
        match self.arena[container.index()].members_mut() {
            Some(members) => {
                members.push(member);
                true
            }
            None => false,
        }
    }

    pub fn members(&self, container: SymbolId) -> &[SymbolId] {
        self.get(container).members().unwrap_or(&[])
    }

    /// First member with the given name, declaration order.
    pub fn find_member(&self, container: SymbolId, name: &str) -> Option<SymbolId> {
        self.members(container)
            .iter()
            .copied()
            .find(|&m| self.get(m).name == name)
    }

    /// Resolve a dotted path from the root namespace.
    pub fn lookup_path(&self, segments: &[&str]) -> Option<SymbolId> {
        let mut current = self.root;
        for segment in segments {
            current = self.find_member(current, segment)?;
        }
        Some(current)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Symbol> {
        self.arena.iter_mut()
    }
}

impl Default for SymbolGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// `CamelCase` to `snake_case`, keeping runs of capitals together
/// (`GIOStream` → `gio_stream`).
pub fn camel_to_snake(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let cap_run_ends = i > 0
                && chars[i - 1].is_ascii_uppercase()
                && i + 1 < chars.len()
                && chars[i + 1].is_ascii_lowercase();
            if prev_lower || cap_run_ends {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
