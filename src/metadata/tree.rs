//! The override tree: rules parsed from a metadata file, matched against
//! document elements while walking.

use std::cell::Cell;

use indexmap::IndexMap;

use crate::base::SourceRef;

/// Unique identifier for a metadata rule in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataId(pub u32);

impl MetadataId {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The fixed set of argument keys the override language accepts.
///
/// Any key outside this enumeration is a hard parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentType {
    Skip,
    Hidden,
    Type,
    TypeArguments,
    CheaderFilename,
    Name,
    Owned,
    Unowned,
    Parent,
    Nullable,
    Deprecated,
    Replacement,
    DeprecatedSince,
    Array,
    ArrayLengthIdx,
    Default,
    Out,
    Ref,
    VfuncName,
    Virtual,
    Abstract,
    Scope,
    Struct,
    Throws,
    PrintfFormat,
}

impl ArgumentType {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "skip" => Self::Skip,
            "hidden" => Self::Hidden,
            "type" => Self::Type,
            "type_arguments" => Self::TypeArguments,
            "cheader_filename" => Self::CheaderFilename,
            "name" => Self::Name,
            "owned" => Self::Owned,
            "unowned" => Self::Unowned,
            "parent" => Self::Parent,
            "nullable" => Self::Nullable,
            "deprecated" => Self::Deprecated,
            "replacement" => Self::Replacement,
            "deprecated_since" => Self::DeprecatedSince,
            "array" => Self::Array,
            "array_length_idx" => Self::ArrayLengthIdx,
            "default" => Self::Default,
            "out" => Self::Out,
            "ref" => Self::Ref,
            "vfunc_name" => Self::VfuncName,
            "virtual" => Self::Virtual,
            "abstract" => Self::Abstract,
            "scope" => Self::Scope,
            "struct" => Self::Struct,
            "throws" => Self::Throws,
            "printf_format" => Self::PrintfFormat,
            _ => return None,
        })
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Hidden => "hidden",
            Self::Type => "type",
            Self::TypeArguments => "type_arguments",
            Self::CheaderFilename => "cheader_filename",
            Self::Name => "name",
            Self::Owned => "owned",
            Self::Unowned => "unowned",
            Self::Parent => "parent",
            Self::Nullable => "nullable",
            Self::Deprecated => "deprecated",
            Self::Replacement => "replacement",
            Self::DeprecatedSince => "deprecated_since",
            Self::Array => "array",
            Self::ArrayLengthIdx => "array_length_idx",
            Self::Default => "default",
            Self::Out => "out",
            Self::Ref => "ref",
            Self::VfuncName => "vfunc_name",
            Self::Virtual => "virtual",
            Self::Abstract => "abstract",
            Self::Scope => "scope",
            Self::Struct => "struct",
            Self::Throws => "throws",
            Self::PrintfFormat => "printf_format",
        }
    }
}

/// A literal or member-reference expression on the right of `key=`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    String(String),
    /// Dotted member-reference chain, e.g. `Gtk.Orientation.HORIZONTAL`.
    Member(Vec<String>),
}

/// One parsed argument: expression plus position plus a used flag for
/// dead-argument reporting.
#[derive(Debug, Clone)]
pub struct Argument {
    pub expr: Expression,
    pub source: SourceRef,
    used: Cell<bool>,
}

impl Argument {
    pub fn new(expr: Expression, source: SourceRef) -> Self {
        Self {
            expr,
            source,
            used: Cell::new(false),
        }
    }

    pub fn mark_used(&self) {
        self.used.set(true);
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }
}

/// One rule node in the override tree.
#[derive(Debug)]
pub struct Metadata {
    /// Glob over the document's `name` attribute values.
    pub pattern: String,
    /// Normalized element tag this rule is restricted to, if any.
    pub selector: Option<String>,
    pub source: SourceRef,
    pub(crate) args: IndexMap<ArgumentType, Argument>,
    pub(crate) children: Vec<MetadataId>,
    used: Cell<bool>,
}

impl Metadata {
    pub fn new(pattern: impl Into<String>, selector: Option<String>, source: SourceRef) -> Self {
        Self {
            pattern: pattern.into(),
            selector,
            source,
            args: IndexMap::new(),
            children: Vec::new(),
            used: Cell::new(false),
        }
    }

    pub fn set_argument(&mut self, key: ArgumentType, argument: Argument) {
        self.args.insert(key, argument);
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }

    fn matches(&self, selector: &str, name: &str) -> bool {
        if let Some(sel) = &self.selector
            && sel != selector
        {
            return false;
        }
        glob_match(&self.pattern, name)
    }
}

/// Handle to the metadata matched for one document element.
///
/// `Empty` is the distinguished "no rule matched" value; `Set` models two
/// or more sibling rules matching the same name+selector pair. A later
/// member wins on argument-key collision; children accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MetadataHandle {
    #[default]
    Empty,
    One(MetadataId),
    Set(Vec<MetadataId>),
}

impl MetadataHandle {
    pub fn is_empty(&self) -> bool {
        matches!(self, MetadataHandle::Empty)
    }

    fn ids(&self) -> &[MetadataId] {
        match self {
            MetadataHandle::Empty => &[],
            MetadataHandle::One(id) => std::slice::from_ref(id),
            MetadataHandle::Set(ids) => ids,
        }
    }
}

/// Arena of all metadata rules parsed for one pipeline run.
///
/// Rules from every override file share one arena; each file contributes
/// its own root, so handles stay valid tree-wide.
#[derive(Debug, Default)]
pub struct MetadataTree {
    nodes: Vec<Metadata>,
    roots: Vec<MetadataId>,
}

impl MetadataTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, metadata: Metadata) -> MetadataId {
        let id = MetadataId::new(self.nodes.len());
        self.nodes.push(metadata);
        id
    }

    /// Allocate the root rule for one override file.
    pub fn alloc_root(&mut self, source: SourceRef) -> MetadataId {
        let id = self.alloc(Metadata::new("*", None, source));
        // The synthetic root never shows up in dead-rule reports.
        self.nodes[id.index()].used.set(true);
        self.roots.push(id);
        id
    }

    /// Unregister a file root after a failed parse. Its partially built
    /// rules no longer match anything and stay out of dead-rule reports.
    pub fn discard_root(&mut self, id: MetadataId) {
        self.roots.retain(|&r| r != id);
    }

    pub fn get(&self, id: MetadataId) -> &Metadata {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: MetadataId) -> &mut Metadata {
        &mut self.nodes[id.index()]
    }

    pub fn add_child(&mut self, parent: MetadataId, child: MetadataId) {
        self.nodes[parent.index()].children.push(child);
    }

    /// Match one document element against the children of the current
    /// scope. Zero matches yield `Empty`; one match that rule; two or
    /// more fold left-to-right into a `Set` (later rule wins per key).
    pub fn match_child(&self, scope: &MetadataHandle, selector: &str, name: &str) -> MetadataHandle {
        let mut matched = Vec::new();
        for &id in scope.ids() {
            for &child in &self.nodes[id.index()].children {
                let rule = &self.nodes[child.index()];
                if rule.matches(selector, name) {
                    rule.used.set(true);
                    matched.push(child);
                }
            }
        }
        match matched.len() {
            0 => MetadataHandle::Empty,
            1 => MetadataHandle::One(matched[0]),
            _ => {
                tracing::trace!(selector, name, rules = matched.len(), "folding metadata set");
                MetadataHandle::Set(matched)
            }
        }
    }

    /// Look up an argument; the latest matching rule that set the key
    /// wins. Marks the argument used.
    pub fn get_argument(&self, handle: &MetadataHandle, key: ArgumentType) -> Option<&Argument> {
        for &id in handle.ids().iter().rev() {
            if let Some(arg) = self.nodes[id.index()].args.get(&key) {
                arg.mark_used();
                return Some(arg);
            }
        }
        None
    }

    pub fn has_argument(&self, handle: &MetadataHandle, key: ArgumentType) -> bool {
        self.get_argument(handle, key).is_some()
    }

    pub fn get_bool(&self, handle: &MetadataHandle, key: ArgumentType) -> Option<bool> {
        match self.get_argument(handle, key)?.expr {
            Expression::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn get_integer(&self, handle: &MetadataHandle, key: ArgumentType) -> Option<i64> {
        match self.get_argument(handle, key)?.expr {
            Expression::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// String-valued argument. Unquoted member chains count: `name=frob`
    /// and `name="frob"` both yield `frob`.
    pub fn get_string(&self, handle: &MetadataHandle, key: ArgumentType) -> Option<String> {
        match &self.get_argument(handle, key)?.expr {
            Expression::String(s) => Some(s.clone()),
            Expression::Member(segments) => Some(segments.join(".")),
            _ => None,
        }
    }

    /// Warn about every rule that never matched and every argument that
    /// was never consumed, for each parsed override file.
    pub fn report_unused(&self, reporter: &mut crate::diagnostics::Reporter) {
        let roots = self.roots.clone();
        for root in roots {
            self.report_unused_from(root, reporter);
        }
    }

    fn report_unused_from(&self, id: MetadataId, reporter: &mut crate::diagnostics::Reporter) {
        let rule = &self.nodes[id.index()];
        if !rule.is_used() {
            reporter.warning(
                Some(rule.source.clone()),
                format!("rule `{}` never matched", rule.pattern),
            );
            return;
        }
        for (key, arg) in &rule.args {
            if !arg.is_used() {
                reporter.warning(
                    Some(arg.source.clone()),
                    format!("argument `{}` never used", key.key()),
                );
            }
        }
        for &child in &rule.children {
            self.report_unused_from(child, reporter);
        }
    }
}

/// Glob matching over `*` (any sequence) and `?` (any single char).
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = name.chars().collect();
    let (mut p, mut t) = (0usize, 0usize);
    let (mut star_p, mut star_t) = (usize::MAX, 0usize);
    while t < txt.len() {
        if p < pat.len() && (pat[p] == '?' || pat[p] == txt[t]) {
            p += 1;
            t += 1;
        } else if p < pat.len() && pat[p] == '*' {
            star_p = p;
            star_t = t;
            p += 1;
        } else if star_p != usize::MAX {
            p = star_p + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }
    while p < pat.len() && pat[p] == '*' {
        p += 1;
    }
    p == pat.len()
}

/// Apply an override `name` value to the original name.
///
/// A value containing a single `(...)` group is applied as a
/// group-1 substitution: the literal prefix and suffix around the group
/// must match the original, and the captured middle becomes the result.
/// A value without a group is a literal replacement.
pub fn apply_name_pattern(value: &str, original: &str) -> Option<String> {
    let open = match value.find('(') {
        Some(i) => i,
        None => return Some(value.to_string()),
    };
    let close = value.rfind(')')?;
    if close < open {
        return None;
    }
    let prefix = &value[..open];
    let inner = &value[open + 1..close];
    let suffix = &value[close + 1..];
    let rest = original.strip_prefix(prefix)?;
    let captured = rest.strip_suffix(suffix)?;
    let nonempty_required = inner.contains('+');
    if nonempty_required && captured.is_empty() {
        return None;
    }
    Some(captured.to_string())
}
