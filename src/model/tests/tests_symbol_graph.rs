#![allow(clippy::unwrap_used)]
use rstest::rstest;

use crate::model::{Symbol, SymbolGraph, SymbolKind, camel_to_snake};

fn namespace(name: &str) -> Symbol {
    Symbol::new(name, SymbolKind::Namespace { members: Vec::new() })
}

fn class(name: &str) -> Symbol {
    Symbol::new(
        name,
        SymbolKind::Class {
            base: None,
            interfaces: Vec::new(),
            is_abstract: false,
            type_id: None,
            members: Vec::new(),
        },
    )
}

#[test]
fn lookup_path_walks_containers() {
    let mut graph = SymbolGraph::new();
    let ns = graph.alloc(namespace("Gtk"));
    let cls = graph.alloc(class("Window"));
    graph.add_member(graph.root(), ns);
    graph.add_member(ns, cls);
    assert_eq!(graph.lookup_path(&["Gtk", "Window"]), Some(cls));
    assert_eq!(graph.lookup_path(&["Gtk", "Door"]), None);
}

#[test]
fn containers_tolerate_name_collisions() {
    // Uniqueness is not required pre-reconciliation.
    let mut graph = SymbolGraph::new();
    let ns = graph.alloc(namespace("Gtk"));
    graph.add_member(graph.root(), ns);
    let a = graph.alloc(class("Window"));
    let b = graph.alloc(class("Window"));
    graph.add_member(ns, a);
    graph.add_member(ns, b);
    assert_eq!(graph.members(ns).len(), 2);
    // First in declaration order wins for find_member.
    assert_eq!(graph.find_member(ns, "Window"), Some(a));
}

#[test]
fn add_member_rejects_non_containers() {
    let mut graph = SymbolGraph::new();
    let field = graph.alloc(Symbol::new(
        "x",
        SymbolKind::Field {
            ty: crate::typeref::TypeRef::named("int", None),
            array_length_cname: None,
        },
    ));
    let other = graph.alloc(class("C"));
    assert!(!graph.add_member(field, other));
}

#[test]
fn lower_cname_prefix_prefers_explicit() {
    let mut sym = class("Window");
    sym.cname = Some("GtkWindow".into());
    assert_eq!(sym.lower_cname_prefix().unwrap(), "gtk_window_");
    sym.cprefix = Some("gtk_win_".into());
    assert_eq!(sym.lower_cname_prefix().unwrap(), "gtk_win_");
}

#[rstest]
#[case("GtkWindow", "gtk_window")]
#[case("GIOStream", "gio_stream")]
#[case("Simple", "simple")]
#[case("already_snake", "already_snake")]
#[case("Widget2D", "widget2_d")]
fn camel_to_snake_cases(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(camel_to_snake(input), expected);
}
