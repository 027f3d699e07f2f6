//! Parameter shaping and asynchronous pairing.
//!
//! Shaping decides which raw document parameters stay user-visible and
//! assigns every parameter its real-valued position: kept parameters
//! get consecutive integers from 1, hidden ones (array lengths,
//! closures, destroy notifiers, vararg placeholders, completion
//! callbacks) a fraction interpolated between the surrounding kept
//! positions.

use crate::model::{Direction, NodeId, Parameter, SymbolKind};
use crate::pipeline::Context;
use crate::typeref::TypeRef;

/// Build the final signature parameter list for a callable node from
/// its raw document parameters.
pub(crate) fn shape_callable(ctx: &mut Context, id: NodeId) {
    if ctx.tree.get(id).shaped {
        return;
    }
    let Some(sid) = ctx.tree.get(id).symbol else {
        return;
    };
    ctx.tree.get_mut(id).shaped = true;
    let coroutine = matches!(
        ctx.graph.get(sid).kind,
        SymbolKind::Method { coroutine: true, .. }
    );

    let node = ctx.tree.get(id);
    let count = node.parameters.len();
    let mut hidden = vec![false; count];
    let mut out_of_range = Vec::new();
    for &idx in node
        .array_length_parameters
        .iter()
        .chain(&node.closure_parameters)
        .chain(&node.destroy_parameters)
    {
        match hidden.get_mut(idx) {
            Some(slot) => *slot = true,
            None => out_of_range.push(idx),
        }
    }
    for (i, info) in node.parameters.iter().enumerate() {
        if !info.keep {
            hidden[i] = true;
        }
        if coroutine && info.param.scope.as_deref() == Some("async") {
            hidden[i] = true;
        }
        // Placeholder naming the first variadic argument.
        if i + 1 < count
            && node.parameters[i + 1].param.ellipsis
            && info.param.name.starts_with("first_")
        {
            hidden[i] = true;
        }
    }
    let mut params: Vec<Parameter> = node.parameters.iter().map(|p| p.param.clone()).collect();
    let source = node.source.clone();

    for idx in out_of_range {
        ctx.reporter.error(
            source.clone(),
            format!("parameter index {idx} out of range (callable has {count} parameters)"),
        );
    }

    assign_positions(&mut params, &hidden);

    // A void callable whose sole out parameter is a non-nullable value
    // struct returns that struct instead.
    let return_is_void = ctx
        .graph
        .get(sid)
        .signature()
        .map(|s| s.return_type.is_void())
        .unwrap_or(false);
    if return_is_void {
        let visible: Vec<usize> = (0..params.len()).filter(|&i| !hidden[i]).collect();
        if let [only] = visible.as_slice() {
            let p = &params[*only];
            if p.direction == Direction::Out
                && !p.ty.nullable
                && resolves_to_value_struct(ctx, &p.ty)
            {
                let promoted = params.remove(*only);
                hidden.remove(*only);
                assign_positions(&mut params, &hidden);
                if let Some(sig) = ctx.graph.get_mut(sid).signature_mut() {
                    sig.return_type = promoted.ty;
                }
            }
        }
    }

    if let Some(sig) = ctx.graph.get_mut(sid).signature_mut() {
        sig.parameters = params;
    }
}

/// Whether `ty` names a struct with value semantics and real contents.
/// Resolution goes through the node tree; graph membership is not
/// wired yet while callables are being shaped.
fn resolves_to_value_struct(ctx: &Context, ty: &TypeRef) -> bool {
    let Some(dotted) = ty.dotted_base() else {
        return false;
    };
    let segments: Vec<&str> = dotted.split('.').collect();
    let Some(target) = locate_node(ctx, &segments) else {
        return false;
    };
    ctx.tree.get(target).symbol.is_some_and(|s| {
        matches!(
            ctx.graph.get(s).kind,
            SymbolKind::Struct {
                simple_type: false,
                ..
            }
        )
    })
}

/// Resolve a dotted name to a live node. Qualified names descend from
/// the forest root; bare names search each loaded namespace.
pub(crate) fn locate_node(ctx: &Context, segments: &[&str]) -> Option<NodeId> {
    let root = ctx.tree.root();
    if let Some(hit) = descend(ctx, root, segments) {
        return Some(hit);
    }
    ctx.tree
        .get(root)
        .children
        .iter()
        .find_map(|&ns| descend(ctx, ns, segments))
}

fn descend(ctx: &Context, from: NodeId, segments: &[&str]) -> Option<NodeId> {
    let mut current = from;
    for segment in segments {
        current = ctx
            .tree
            .lookup(current, segment)
            .iter()
            .copied()
            .find(|&c| !ctx.tree.get(c).merged)?;
    }
    Some(current)
}

/// Assign every parameter its ordering position. Kept parameters get
/// 1, 2, 3…; each run of hidden parameters is spread evenly strictly
/// between the neighbouring kept positions (or past the last one).
pub(crate) fn assign_positions(params: &mut [Parameter], hidden: &[bool]) {
    let mut next = 1.0;
    for (i, p) in params.iter_mut().enumerate() {
        if !hidden[i] {
            p.position = Some(next);
            next += 1.0;
        }
    }
    let mut i = 0;
    while i < params.len() {
        if !hidden[i] {
            i += 1;
            continue;
        }
        let start = i;
        while i < params.len() && hidden[i] {
            i += 1;
        }
        let before = if start == 0 {
            0.0
        } else {
            params[start - 1].position.unwrap_or(0.0)
        };
        let after = if i == params.len() {
            before + 1.0
        } else {
            params[i].position.unwrap_or(before + 1.0)
        };
        let run = (i - start) as f64;
        for (k, j) in (start..i).enumerate() {
            let fraction = (k + 1) as f64 / (run + 1.0);
            params[j].position = Some(before + (after - before) * fraction);
        }
    }
}

/// Merge a two-phase `op`/`op_finish` pair into one coroutine-shaped
/// callable. The finish call supplies the return type, thrown-error
/// flag and out parameters; any cancellation token moves to the tail of
/// the visible list; the finish node is merged away.
pub(crate) fn pair_async(ctx: &mut Context, id: NodeId) {
    let node = ctx.tree.get(id);
    let Some(sid) = node.symbol else {
        return;
    };
    let Some(parent) = node.parent else {
        return;
    };
    let name = node.name.clone();
    let finish_cname = match &ctx.graph.get(sid).kind {
        SymbolKind::Method { finish_cname, .. } => finish_cname.clone(),
        _ => return,
    };

    let base = name.strip_suffix("_async").unwrap_or(&name);
    let finish_name = format!("{base}_finish");
    let finish = locate_finish(ctx, parent, id, &finish_name, finish_cname.as_deref());
    let Some(finish_id) = finish else {
        return;
    };
    // The finish half usually follows the start half in the document,
    // so it has not been reconciled yet; shape it now.
    shape_callable(ctx, finish_id);
    let Some(finish_sid) = ctx.tree.get(finish_id).symbol else {
        return;
    };
    let Some(finish_sig) = ctx.graph.get(finish_sid).signature().cloned() else {
        return;
    };

    let Some(sig) = ctx.graph.get_mut(sid).signature_mut() else {
        return;
    };
    sig.return_type = finish_sig.return_type.clone();
    sig.throws |= finish_sig.throws;
    for p in finish_sig
        .parameters
        .iter()
        .filter(|p| p.is_visible() && p.direction == Direction::Out)
    {
        sig.parameters.push(p.clone());
    }

    // Cancellation tokens go last among the visible parameters. A
    // token that actually moved keeps its original ordering key so the
    // C argument order stays reconstructible.
    let mut moved_token_position = None;
    if let Some(idx) = sig.parameters.iter().position(is_cancellable) {
        let token = sig.parameters.remove(idx);
        if idx != sig.parameters.len() {
            moved_token_position = token.position;
        }
        sig.parameters.push(token);
    }

    let hidden: Vec<bool> = sig.parameters.iter().map(|p| !p.is_visible()).collect();
    assign_positions(&mut sig.parameters, &hidden);
    if let (Some(original), Some(token)) = (moved_token_position, sig.parameters.last_mut()) {
        token.position = Some(original);
    }

    tracing::debug!(method = %name, finish = %finish_name, "paired asynchronous callable");
    ctx.tree.get_mut(finish_id).merged = true;
    ctx.graph.get_mut(finish_sid).hidden = true;
}

fn locate_finish(
    ctx: &Context,
    parent: NodeId,
    this: NodeId,
    finish_name: &str,
    finish_cname: Option<&str>,
) -> Option<NodeId> {
    let by_name = ctx
        .tree
        .lookup(parent, finish_name)
        .iter()
        .copied()
        .find(|&c| {
            c != this
                && !ctx.tree.get(c).merged
                && ctx
                    .tree
                    .get(c)
                    .symbol
                    .map(|s| matches!(ctx.graph.get(s).kind, SymbolKind::Method { .. }))
                    .unwrap_or(false)
        });
    if by_name.is_some() {
        return by_name;
    }
    // Fall back to scanning sibling C names.
    let wanted = finish_cname?;
    ctx.tree.get(parent).children.iter().copied().find(|&c| {
        c != this
            && !ctx.tree.get(c).merged
            && ctx
                .tree
                .get(c)
                .symbol
                .map(|s| {
                    let sym = ctx.graph.get(s);
                    matches!(sym.kind, SymbolKind::Method { .. })
                        && sym.cname.as_deref() == Some(wanted)
                })
                .unwrap_or(false)
    })
}

fn is_cancellable(p: &Parameter) -> bool {
    if !p.is_visible() {
        return false;
    }
    p.name == "cancellable"
        || p.ty
            .base_name()
            .map(|n| n.ends_with("Cancellable"))
            .unwrap_or(false)
}
