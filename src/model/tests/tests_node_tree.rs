#![allow(clippy::unwrap_used)]
use crate::model::{Node, NodeTree};

#[test]
fn push_child_records_scope_and_parent() {
    let mut tree = NodeTree::new();
    let ns = tree.alloc(Node::new("namespace", "Gtk"));
    tree.push_child(tree.root(), ns);
    let m = tree.alloc(Node::new("method", "frob"));
    tree.push_child(ns, m);

    assert_eq!(tree.get(m).parent, Some(ns));
    assert_eq!(tree.lookup(ns, "frob"), &[m]);
    // Every non-root node has exactly one parent.
    assert_eq!(tree.get(ns).parent, Some(tree.root()));
}

#[test]
fn scope_holds_collision_sets_in_declaration_order() {
    let mut tree = NodeTree::new();
    let cls = tree.alloc(Node::new("class", "Window"));
    tree.push_child(tree.root(), cls);
    let sig = tree.alloc(Node::new("signal", "changed"));
    let met = tree.alloc(Node::new("method", "changed"));
    tree.push_child(cls, sig);
    tree.push_child(cls, met);

    assert_eq!(tree.lookup(cls, "changed"), &[sig, met]);
    assert_eq!(tree.lookup_kind(cls, "changed", "method"), Some(met));
}

#[test]
fn siblings_named_excludes_self_and_merged() {
    let mut tree = NodeTree::new();
    let cls = tree.alloc(Node::new("class", "Window"));
    tree.push_child(tree.root(), cls);
    let a = tree.alloc(Node::new("field", "size"));
    let b = tree.alloc(Node::new("method", "size"));
    let c = tree.alloc(Node::new("signal", "size"));
    for id in [a, b, c] {
        tree.push_child(cls, id);
    }
    tree.get_mut(c).merged = true;

    assert_eq!(tree.siblings_named(a, "size"), vec![b]);
}

#[test]
fn reparent_moves_scope_entries() {
    let mut tree = NodeTree::new();
    let outer = tree.alloc(Node::new("record", "Outer"));
    let inner = tree.alloc(Node::new("record", "Inner"));
    let field = tree.alloc(Node::new("field", "x"));
    tree.push_child(tree.root(), outer);
    tree.push_child(outer, inner);
    tree.push_child(inner, field);

    tree.reparent(field, outer, "inner_x".into());

    assert!(tree.lookup(inner, "x").is_empty());
    assert_eq!(tree.lookup(outer, "inner_x"), &[field]);
    assert_eq!(tree.get(field).name, "inner_x");
    assert_eq!(tree.get(field).girname, "x");
}
