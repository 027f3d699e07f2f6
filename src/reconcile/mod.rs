//! Reconciliation engine: one post-order walk over the node tree that
//! adjudicates merges, renames and re-homing, then finalizes every
//! symbol.
//!
//! All the interacting heuristics live here: getter/field merging,
//! signal emitters, virtual-method invokers, property accessors,
//! array-length fields, nested-struct hoisting, alias shape inference,
//! enumeration prefix derivation and namespace-function re-homing.
//! Children are processed before their parent so every sibling decision
//! sees already-shaped callables.

use crate::metadata::{ArgumentType, normalize_name};
use crate::model::{Access, MethodKind, NodeId, Signature, Symbol, SymbolId, SymbolKind};
use crate::pipeline::Context;
use crate::typeref::TypeRef;

mod params;


pub(crate) use params::assign_positions;

/// Run reconciliation over the whole forest.
pub(crate) fn reconcile(ctx: &mut Context) {
    let root = ctx.tree.root();
    process(ctx, root);
}

/// Post-order visit. Siblings can be merged away mid-loop, so the
/// child list is re-read each step; merged nodes stay in place with
/// their flag set.
fn process(ctx: &mut Context, id: NodeId) {
    if ctx.tree.get(id).processed {
        return;
    }
    ctx.tree.get_mut(id).processed = true;

    let mut i = 0;
    loop {
        let child = {
            let node = ctx.tree.get(id);
            match node.children.get(i) {
                Some(&c) => c,
                None => break,
            }
        };
        process(ctx, child);
        i += 1;
    }

    reconcile_node(ctx, id);
    finalize_common(ctx, id);
    attach_members(ctx, id);
}

/// Copyable dispatch tag so no graph borrow outlives the dispatch.
#[derive(Clone, Copy)]
enum KindTag {
    Method,
    Callable,
    Property,
    Field,
    Interface,
    Struct,
    Enumeration,
    Other,
}

fn kind_tag(kind: &SymbolKind) -> KindTag {
    match kind {
        SymbolKind::Method { .. } => KindTag::Method,
        SymbolKind::Signal { .. } | SymbolKind::Delegate { .. } => KindTag::Callable,
        SymbolKind::Property { .. } => KindTag::Property,
        SymbolKind::Field { .. } => KindTag::Field,
        SymbolKind::Interface { .. } => KindTag::Interface,
        SymbolKind::Struct { .. } => KindTag::Struct,
        SymbolKind::Enum { .. } | SymbolKind::ErrorDomain { .. } => KindTag::Enumeration,
        SymbolKind::Namespace { .. }
        | SymbolKind::Class { .. }
        | SymbolKind::Constant { .. }
        | SymbolKind::EnumValue { .. }
        | SymbolKind::ErrorCode { .. } => KindTag::Other,
    }
}

fn reconcile_node(ctx: &mut Context, id: NodeId) {
    let node = ctx.tree.get(id);
    if node.merged {
        return;
    }
    let Some(sid) = node.symbol else {
        return;
    };
    if node.element_kind == "alias" {
        reconcile_alias(ctx, id, sid);
        return;
    }
    match kind_tag(&ctx.graph.get(sid).kind) {
        KindTag::Method => reconcile_method(ctx, id, sid),
        KindTag::Callable => params::shape_callable(ctx, id),
        KindTag::Property => reconcile_property(ctx, id, sid),
        KindTag::Field => reconcile_field(ctx, id, sid),
        KindTag::Interface => reconcile_interface(ctx, sid),
        KindTag::Struct => reconcile_struct(ctx, id, sid),
        KindTag::Enumeration => reconcile_enum(ctx, id, sid),
        KindTag::Other => {}
    }
}

/// Mark a node and its symbol as absorbed by a sibling.
fn merge_away(ctx: &mut Context, id: NodeId) {
    ctx.tree.get_mut(id).merged = true;
    if let Some(sid) = ctx.tree.get(id).symbol {
        ctx.graph.get_mut(sid).hidden = true;
    }
}

// ---------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------

fn reconcile_method(ctx: &mut Context, id: NodeId, sid: SymbolId) {
    params::shape_callable(ctx, id);

    let (coroutine, is_virtual, no_wrapper, is_creation, vfunc_name) =
        match &ctx.graph.get(sid).kind {
            SymbolKind::Method {
                coroutine,
                is_virtual,
                no_wrapper,
                kind,
                vfunc_name,
                ..
            } => (
                *coroutine,
                *is_virtual,
                *no_wrapper,
                *kind == MethodKind::Creation,
                vfunc_name.clone(),
            ),
            _ => return,
        };

    if coroutine {
        params::pair_async(ctx, id);
    }

    let name = ctx.tree.get(id).name.clone();
    for sibling in ctx.tree.siblings_named(id, &name) {
        if ctx.tree.get(id).merged {
            break;
        }
        let Some(sib_sid) = ctx.tree.get(sibling).symbol else {
            continue;
        };
        let sib_is_plain_method = matches!(
            ctx.graph.get(sib_sid).kind,
            SymbolKind::Method { kind, .. } if kind != MethodKind::Creation
        );
        match kind_tag(&ctx.graph.get(sib_sid).kind) {
            KindTag::Field => {
                // Zero-argument non-void collision: this method is the
                // field's getter.
                if is_getter_shaped(ctx.graph.get(sid)) {
                    tracing::debug!(method = %name, "merging getter into field");
                    merge_away(ctx, id);
                }
            }
            KindTag::Callable
                if matches!(ctx.graph.get(sib_sid).kind, SymbolKind::Signal { .. }) =>
            {
                adopt_signal_emitter(ctx, sid, sib_sid, is_virtual);
                merge_away(ctx, id);
            }
            KindTag::Method if sib_is_plain_method => {
                if is_virtual && !is_creation {
                    if no_wrapper {
                        adopt_invoker_cname(ctx, id, sid, &name);
                    } else {
                        tracing::debug!(method = %name, "merging invoker into virtual method");
                        merge_away(ctx, sibling);
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(target) = vfunc_name
        && target != name
    {
        for sibling in ctx.tree.siblings_named(id, &target) {
            merge_away(ctx, sibling);
        }
    }
}

fn is_getter_shaped(symbol: &Symbol) -> bool {
    match symbol.signature() {
        Some(sig) => sig.visible_parameters().count() == 0 && !sig.return_type.is_void(),
        None => false,
    }
}

fn is_setter_shaped(symbol: &Symbol) -> bool {
    match symbol.signature() {
        Some(sig) => sig.visible_parameters().count() == 1 && sig.return_type.is_void(),
        None => false,
    }
}

/// A method colliding with a same-named signal turns the signal into an
/// emitter (or a virtual signal) and donates its parameter names.
fn adopt_signal_emitter(ctx: &mut Context, method: SymbolId, signal: SymbolId, virt: bool) {
    let method_names: Vec<String> = ctx
        .graph
        .get(method)
        .signature()
        .map(|s| s.visible_parameters().map(|p| p.name.clone()).collect())
        .unwrap_or_default();
    let symbol = ctx.graph.get_mut(signal);
    if let SymbolKind::Signal {
        has_emitter,
        is_virtual,
        signature,
    } = &mut symbol.kind
    {
        if virt {
            *is_virtual = true;
        } else {
            *has_emitter = true;
        }
        let mut names = method_names.into_iter();
        for p in signature.parameters.iter_mut().filter(|p| p.is_visible()) {
            if let Some(n) = names.next() {
                p.name = n;
            }
        }
    }
}

/// Virtual method without a generated wrapper: its invoker is a sibling
/// whose name ends with the virtual method's own, and only the C name
/// is taken from it.
fn adopt_invoker_cname(ctx: &mut Context, id: NodeId, sid: SymbolId, name: &str) {
    let Some(parent) = ctx.tree.get(id).parent else {
        return;
    };
    let snapshot = ctx.tree.get(parent).children.clone();
    for c in snapshot {
        if c == id || ctx.tree.get(c).merged {
            continue;
        }
        let Some(cs) = ctx.tree.get(c).symbol else {
            continue;
        };
        let candidate = ctx.graph.get(cs);
        if matches!(candidate.kind, SymbolKind::Method { .. })
            && candidate.name != name
            && candidate.name.ends_with(name)
        {
            let cname = candidate.cname.clone();
            ctx.graph.get_mut(sid).cname = cname;
            return;
        }
    }
}

// ---------------------------------------------------------------------
// Properties and fields
// ---------------------------------------------------------------------

fn reconcile_property(ctx: &mut Context, id: NodeId, sid: SymbolId) {
    let name = ctx.tree.get(id).name.clone();
    let Some(parent) = ctx.tree.get(id).parent else {
        return;
    };

    let writable = matches!(
        ctx.graph.get(sid).kind,
        SymbolKind::Property { writable: true, .. }
    );
    let getter_ok = sibling_method(ctx, parent, &format!("get_{name}"))
        .map(|m| is_getter_shaped(ctx.graph.get(m)))
        .unwrap_or(false);
    let setter_ok = sibling_method(ctx, parent, &format!("set_{name}"))
        .map(|m| is_setter_shaped(ctx.graph.get(m)))
        .unwrap_or(false);
    if getter_ok
        && (!writable || setter_ok)
        && let SymbolKind::Property {
            accessor_methods, ..
        } = &mut ctx.graph.get_mut(sid).kind
    {
        *accessor_methods = true;
    }

    // The property wins any same-named signal or method.
    for sibling in ctx.tree.siblings_named(id, &name) {
        let Some(sib_sid) = ctx.tree.get(sibling).symbol else {
            continue;
        };
        if matches!(
            ctx.graph.get(sib_sid).kind,
            SymbolKind::Signal { .. } | SymbolKind::Method { .. }
        ) {
            merge_away(ctx, sibling);
        }
    }
}

/// Find a same-container method by name and make sure its signature is
/// shaped; accessor candidates are often declared after the property
/// that checks them.
fn sibling_method(ctx: &mut Context, parent: NodeId, name: &str) -> Option<SymbolId> {
    let node = ctx
        .tree
        .lookup(parent, name)
        .iter()
        .copied()
        .filter(|&c| !ctx.tree.get(c).merged)
        .find(|&c| {
            ctx.tree
                .get(c)
                .symbol
                .map(|sid| matches!(ctx.graph.get(sid).kind, SymbolKind::Method { .. }))
                .unwrap_or(false)
        })?;
    params::shape_callable(ctx, node);
    ctx.tree.get(node).symbol
}

fn reconcile_field(ctx: &mut Context, id: NodeId, sid: SymbolId) {
    let name = ctx.tree.get(id).name.clone();

    // Fields lose every same-name collision.
    if !ctx.tree.siblings_named(id, &name).is_empty() {
        tracing::debug!(field = %name, "field loses name collision");
        merge_away(ctx, id);
        return;
    }

    let Some(parent) = ctx.tree.get(id).parent else {
        return;
    };

    // A callback field inside a type-struct record is a virtual-method
    // slot of the struct's owning type.
    if field_is_callback(ctx, id, parent, sid)
        && let Some(target) = ctx
            .tree
            .get(parent)
            .attr("glib:is-gtype-struct-for")
            .map(str::to_string)
    {
        mark_virtual_slot(ctx, parent, &target, &name);
        merge_away(ctx, id);
        return;
    }

    // Array fields pair with a sibling element count.
    let is_array = matches!(&ctx.graph.get(sid).kind, SymbolKind::Field { ty, .. } if ty.is_array());
    if is_array {
        for candidate in [format!("n_{name}"), format!("{name}_length")] {
            let found = ctx
                .tree
                .lookup(parent, &candidate)
                .iter()
                .copied()
                .find(|&c| !ctx.tree.get(c).merged && ctx.tree.get(c).symbol.is_some());
            if let Some(len_node) = found {
                let len_sid = ctx.tree.get(len_node).symbol.unwrap_or(sid);
                let len_cname = ctx
                    .graph
                    .get(len_sid)
                    .cname
                    .clone()
                    .unwrap_or_else(|| candidate.clone());
                if let SymbolKind::Field {
                    array_length_cname, ..
                } = &mut ctx.graph.get_mut(sid).kind
                {
                    *array_length_cname = Some(len_cname);
                }
                merge_away(ctx, len_node);
                break;
            }
        }
    }
}

fn field_is_callback(ctx: &Context, id: NodeId, parent: NodeId, sid: SymbolId) -> bool {
    let SymbolKind::Field { ty, .. } = &ctx.graph.get(sid).kind else {
        return false;
    };
    let Some(base) = ty.base_name() else {
        return false;
    };
    ctx.tree.lookup_kind(parent, base, "callback").is_some()
        || ctx.tree.get(id).children.iter().any(|&c| {
            ctx.tree.get(c).element_kind == "callback"
        })
}

/// Find the type this record is the vtable of and flag its same-named
/// method virtual.
fn mark_virtual_slot(ctx: &mut Context, record: NodeId, target: &str, slot: &str) {
    let target = normalize_name(target);
    let Some(namespace) = ctx.tree.get(record).parent else {
        return;
    };
    let owner = ctx
        .tree
        .lookup(namespace, &target)
        .iter()
        .copied()
        .find(|&c| !ctx.tree.get(c).merged);
    let Some(owner) = owner else {
        let source = ctx.tree.get(record).source.clone();
        ctx.reporter.error(
            source,
            format!("type struct refers to unknown type `{target}`"),
        );
        return;
    };
    let method = ctx
        .tree
        .lookup(owner, slot)
        .iter()
        .copied()
        .find_map(|c| ctx.tree.get(c).symbol);
    if let Some(msid) = method
        && let SymbolKind::Method { is_virtual, .. } = &mut ctx.graph.get_mut(msid).kind
    {
        *is_virtual = true;
    }
}

// ---------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------

/// Interfaces need one instantiable prerequisite; inject the configured
/// object base type when the document names none.
fn reconcile_interface(ctx: &mut Context, sid: SymbolId) {
    let has_class_prerequisite = match &ctx.graph.get(sid).kind {
        SymbolKind::Interface { prerequisites, .. } => prerequisites.iter().any(|p| {
            p.dotted_base()
                .and_then(|d| {
                    let segments: Vec<&str> = d.split('.').collect();
                    params::locate_node(ctx, &segments)
                })
                .and_then(|n| ctx.tree.get(n).symbol)
                .map(|t| matches!(ctx.graph.get(t).kind, SymbolKind::Class { .. }))
                .unwrap_or(false)
        }),
        _ => return,
    };
    if !has_class_prerequisite {
        let base = TypeRef::named(&ctx.config.object_base_type, None);
        if let SymbolKind::Interface { prerequisites, .. } = &mut ctx.graph.get_mut(sid).kind {
            prerequisites.push(base);
        }
    }
}

fn reconcile_struct(ctx: &mut Context, id: NodeId, sid: SymbolId) {
    // Type-struct records dissolve into the type they describe.
    if let Some(target) = ctx
        .tree
        .get(id)
        .attr("glib:is-gtype-struct-for")
        .map(str::to_string)
    {
        resolve_type_struct(ctx, id, sid, &target);
        return;
    }

    // A struct nested in another data type hoists its instance fields
    // into the parent under prefixed names.
    let Some(parent) = ctx.tree.get(id).parent else {
        return;
    };
    let parent_is_data = ctx
        .tree
        .get(parent)
        .symbol
        .map(|p| {
            matches!(
                ctx.graph.get(p).kind,
                SymbolKind::Class { .. } | SymbolKind::Struct { .. }
            )
        })
        .unwrap_or(false);
    if !parent_is_data {
        return;
    }

    let struct_name = ctx.tree.get(id).name.clone();
    let struct_girname = ctx.tree.get(id).girname.clone();
    let fields: Vec<NodeId> = ctx
        .tree
        .get(id)
        .children
        .iter()
        .copied()
        .filter(|&c| {
            !ctx.tree.get(c).merged
                && ctx
                    .tree
                    .get(c)
                    .symbol
                    .map(|s| matches!(ctx.graph.get(s).kind, SymbolKind::Field { .. }))
                    .unwrap_or(false)
        })
        .collect();
    for field in fields {
        let field_name = ctx.tree.get(field).name.clone();
        let hoisted = format!("{struct_name}_{field_name}");
        if let Some(fs) = ctx.tree.get(field).symbol {
            let symbol = ctx.graph.get_mut(fs);
            symbol.name = hoisted.clone();
            let inner = symbol.cname.clone().unwrap_or(field_name);
            symbol.cname = Some(format!("{struct_girname}.{inner}"));
        }
        ctx.tree.reparent(field, parent, hoisted);
    }
    tracing::debug!(name = %struct_name, "hoisted nested struct");
    merge_away(ctx, id);
}

fn resolve_type_struct(ctx: &mut Context, id: NodeId, sid: SymbolId, target: &str) {
    let target = normalize_name(target);
    let cname = ctx.graph.get(sid).cname.clone();
    let Some(parent) = ctx.tree.get(id).parent else {
        return;
    };
    let owner = ctx
        .tree
        .lookup(parent, &target)
        .iter()
        .copied()
        .find(|&c| c != id && !ctx.tree.get(c).merged);
    match owner.and_then(|o| ctx.tree.get(o).symbol) {
        Some(osid) => {
            if let SymbolKind::Interface {
                type_struct_cname, ..
            } = &mut ctx.graph.get_mut(osid).kind
            {
                *type_struct_cname = cname;
            }
            merge_away(ctx, id);
        }
        None => {
            let source = ctx.tree.get(id).source.clone();
            ctx.reporter.error(
                source,
                format!("type struct refers to unknown type `{target}`"),
            );
            merge_away(ctx, id);
        }
    }
}

// ---------------------------------------------------------------------
// Aliases and enumerations
// ---------------------------------------------------------------------

/// Shape an alias from its base type: opaque pointer aliases and
/// value-struct aliases become simple structs, class aliases become
/// subclasses, anything else wraps the base.
fn reconcile_alias(ctx: &mut Context, id: NodeId, sid: SymbolId) {
    let Some(base) = ctx.tree.get(id).base_type.clone() else {
        return;
    };
    let members = ctx
        .graph
        .get(sid)
        .members()
        .map(|m| m.to_vec())
        .unwrap_or_default();

    let new_kind = if base.is_void() && base.pointer_level >= 1 {
        SymbolKind::Struct {
            base: None,
            simple_type: true,
            members,
        }
    } else {
        let resolved = base.dotted_base().and_then(|d| {
            let segments: Vec<&str> = d.split('.').collect();
            params::locate_node(ctx, &segments).and_then(|n| ctx.tree.get(n).symbol)
        });
        match resolved.map(|t| &ctx.graph.get(t).kind) {
            Some(SymbolKind::Struct { simple_type, .. }) => SymbolKind::Struct {
                base: Some(base),
                simple_type: *simple_type,
                members,
            },
            Some(SymbolKind::Class { .. }) => SymbolKind::Class {
                base: Some(base),
                interfaces: Vec::new(),
                is_abstract: false,
                type_id: None,
                members,
            },
            _ => SymbolKind::Struct {
                base: Some(base),
                simple_type: true,
                members,
            },
        }
    };
    ctx.graph.get_mut(sid).kind = new_kind;
}

fn reconcile_enum(ctx: &mut Context, id: NodeId, sid: SymbolId) {
    // Members are not attached to the graph yet; read them off the
    // child nodes.
    let cnames: Vec<String> = ctx
        .tree
        .get(id)
        .children
        .iter()
        .filter(|&&c| !ctx.tree.get(c).merged && ctx.tree.get(c).element_kind == "member")
        .filter_map(|&c| ctx.tree.get(c).symbol)
        .filter_map(|s| ctx.graph.get(s).cname.clone())
        .collect();
    if let Some(prefix) = derive_common_prefix(&cnames) {
        ctx.graph.get_mut(sid).cprefix = Some(prefix);
    }
}

/// Longest shared prefix of the member C identifiers, shortened until
/// it ends in `_` and no stripped remainder is empty or multi-digit
/// numeric-leading.
pub(crate) fn derive_common_prefix(cnames: &[String]) -> Option<String> {
    let first = cnames.first()?;
    let mut len = first.len();
    for c in cnames {
        len = len.min(common_prefix_len(first, c));
    }
    let mut prefix = &first[..len];
    while !prefix.is_empty() {
        let valid = prefix.ends_with('_')
            && cnames.iter().all(|c| {
                let rest = &c[prefix.len()..];
                let leading_digit = rest.chars().next().is_some_and(|ch| ch.is_ascii_digit());
                !rest.is_empty() && (!leading_digit || rest.len() == 1)
            });
        if valid {
            return Some(prefix.to_string());
        }
        prefix = &prefix[..prefix.len() - 1];
    }
    None
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

// ---------------------------------------------------------------------
// Finalization and attachment
// ---------------------------------------------------------------------

/// Stamp deprecation, replacement, visibility and header metadata from
/// overrides and document attributes.
fn finalize_common(ctx: &mut Context, id: NodeId) {
    let node = ctx.tree.get(id);
    let Some(sid) = node.symbol else {
        return;
    };
    let matched = node.metadata.clone();
    let deprecated = ctx
        .metadata
        .get_bool(&matched, ArgumentType::Deprecated)
        .unwrap_or_else(|| node.attr_bool("deprecated", false));
    let deprecated_since = ctx
        .metadata
        .get_string(&matched, ArgumentType::DeprecatedSince)
        .or_else(|| node.attr("deprecated-version").map(str::to_string));
    let replacement = ctx
        .metadata
        .get_string(&matched, ArgumentType::Replacement)
        .or_else(|| node.attr("moved-to").map(str::to_string));
    let headers = ctx
        .metadata
        .get_string(&matched, ArgumentType::CheaderFilename);
    let hidden = ctx.metadata.get_bool(&matched, ArgumentType::Hidden);

    let symbol = ctx.graph.get_mut(sid);
    symbol.deprecated = deprecated || deprecated_since.is_some();
    symbol.deprecated_since = deprecated_since;
    symbol.replacement = replacement;
    if let Some(h) = headers {
        symbol.cheaders = h.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Some(h) = hidden {
        symbol.hidden = h;
    }
}

/// After a container's children are reconciled, wire the surviving
/// child symbols into it. Namespace-level functions are offered to the
/// prefix-matching re-homing pass first; classes without a creation
/// method receive an implicit default constructor.
fn attach_members(ctx: &mut Context, id: NodeId) {
    let node = ctx.tree.get(id);
    if node.merged {
        return;
    }
    let Some(sid) = node.symbol else {
        return;
    };
    if !ctx.graph.get(sid).is_container() {
        return;
    }
    let is_namespace = matches!(ctx.graph.get(sid).kind, SymbolKind::Namespace { .. });

    let children = ctx.tree.get(id).children.clone();
    for child in children {
        let cn = ctx.tree.get(child);
        if cn.merged || !cn.new_symbol {
            continue;
        }
        let Some(cs) = cn.symbol else {
            continue;
        };
        if ctx.graph.get(cs).hidden {
            continue;
        }

        // Explicit re-homing via the `parent` override.
        let matched = cn.metadata.clone();
        if let Some(target) = ctx.metadata.get_string(&matched, ArgumentType::Parent) {
            let segments: Vec<&str> = target.split('.').collect();
            let new_home = params::locate_node(ctx, &segments)
                .and_then(|n| ctx.tree.get(n).symbol)
                .filter(|&s| ctx.graph.get(s).is_container());
            match new_home {
                Some(new_home) => {
                    ctx.graph.add_member(new_home, cs);
                    continue;
                }
                None => {
                    let source = ctx.tree.get(child).source.clone();
                    ctx.reporter.error(
                        source,
                        format!("cannot relocate into unknown container `{target}`"),
                    );
                }
            }
        }

        let is_free_function = matches!(
            ctx.graph.get(cs).kind,
            SymbolKind::Method {
                kind: MethodKind::Static,
                ..
            }
        );
        if is_namespace && is_free_function {
            process_namespace_method(ctx, id, sid, child, cs);
            continue;
        }
        ctx.graph.add_member(sid, cs);
    }

    if matches!(ctx.graph.get(sid).kind, SymbolKind::Class { .. }) {
        synthesize_default_constructor(ctx, sid);
    }
}

/// Re-home one namespace-level function as a method of the sibling type
/// whose C-name prefix is the longest match for the function's C name.
/// Ties keep the first candidate in declaration order; a collision at
/// the target falls back to a namespace-level function.
fn process_namespace_method(
    ctx: &mut Context,
    ns_node: NodeId,
    ns_sid: SymbolId,
    m_node: NodeId,
    m_sid: SymbolId,
) {
    let Some(cname) = ctx.graph.get(m_sid).cname.clone() else {
        ctx.graph.add_member(ns_sid, m_sid);
        return;
    };

    let mut best: Option<(NodeId, SymbolId, usize)> = None;
    for &candidate in &ctx.tree.get(ns_node).children {
        if candidate == m_node || ctx.tree.get(candidate).merged {
            continue;
        }
        let Some(c_sid) = ctx.tree.get(candidate).symbol else {
            continue;
        };
        let symbol = ctx.graph.get(c_sid);
        if !symbol.is_container() || matches!(symbol.kind, SymbolKind::Namespace { .. }) {
            continue;
        }
        let Some(prefix) = symbol.lower_cname_prefix() else {
            continue;
        };
        if cname.starts_with(&prefix)
            && best.map(|(_, _, len)| prefix.len() > len).unwrap_or(true)
        {
            best = Some((candidate, c_sid, prefix.len()));
        }
    }

    let Some((target_node, target_sid, prefix_len)) = best else {
        ctx.graph.add_member(ns_sid, m_sid);
        return;
    };
    let new_name = cname[prefix_len..].to_string();
    if new_name.is_empty()
        || ctx.graph.find_member(target_sid, &new_name).is_some()
        || !ctx.tree.lookup(target_node, &new_name).is_empty()
    {
        ctx.graph.add_member(ns_sid, m_sid);
        return;
    }

    promote_to_instance_method(ctx, m_sid, target_sid);
    ctx.graph.get_mut(m_sid).name = new_name.clone();
    tracing::debug!(cname = %cname, target = %ctx.graph.get(target_sid).name, "re-homed namespace function");
    ctx.tree.reparent(m_node, target_node, new_name);
    ctx.graph.add_member(target_sid, m_sid);
}

/// When the re-homed function's first visible parameter is the target
/// type itself, it becomes an instance method and the parameter drops.
fn promote_to_instance_method(ctx: &mut Context, m_sid: SymbolId, target_sid: SymbolId) {
    let target_name = ctx.graph.get(target_sid).name.clone();
    let symbol = ctx.graph.get_mut(m_sid);
    let SymbolKind::Method {
        kind, signature, ..
    } = &mut symbol.kind
    else {
        return;
    };
    let first_visible = signature.parameters.iter().position(|p| p.is_visible());
    if let Some(idx) = first_visible
        && signature.parameters[idx].ty.base_name() == Some(target_name.as_str())
    {
        signature.parameters.remove(idx);
        *kind = MethodKind::Instance;
        let hidden: Vec<bool> = signature.parameters.iter().map(|p| !p.is_visible()).collect();
        assign_positions(&mut signature.parameters, &hidden);
    }
}

/// Classes with no surviving creation method get an implicit public
/// default constructor.
fn synthesize_default_constructor(ctx: &mut Context, class: SymbolId) {
    let has_creation = ctx.graph.members(class).iter().any(|&m| {
        matches!(
            ctx.graph.get(m).kind,
            SymbolKind::Method {
                kind: MethodKind::Creation,
                ..
            }
        )
    });
    if has_creation {
        return;
    }
    let cname = ctx
        .graph
        .get(class)
        .lower_cname_prefix()
        .map(|p| format!("{p}new"));
    let mut ctor = Symbol::new(
        "new",
        SymbolKind::Method {
            kind: MethodKind::Creation,
            signature: Signature::new(),
            is_virtual: false,
            is_abstract: false,
            vfunc_name: None,
            coroutine: false,
            no_wrapper: false,
            printf_format: false,
            finish_cname: None,
        },
    );
    ctor.access = Access::Public;
    ctor.cname = cname;
    let ctor_id = ctx.graph.alloc(ctor);
    ctx.graph.add_member(class, ctor_id);
}
