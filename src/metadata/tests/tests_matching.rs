#![allow(clippy::unwrap_used)]
use std::sync::Arc;

use rstest::rstest;

use crate::diagnostics::Reporter;
use crate::metadata::{
    ArgumentType, MetadataHandle, MetadataTree, apply_name_pattern, glob_match, parse_metadata,
};

fn parse(input: &str) -> (MetadataTree, MetadataHandle) {
    let mut tree = MetadataTree::new();
    let root = parse_metadata(&mut tree, input, Arc::from("Test.metadata")).unwrap();
    (tree, MetadataHandle::One(root))
}

#[rstest]
#[case("*", "anything", true)]
#[case("get_*", "get_name", true)]
#[case("get_*", "set_name", false)]
#[case("?oo", "foo", true)]
#[case("?oo", "fooo", false)]
#[case("a*b*c", "aXbYc", true)]
#[case("a*b*c", "aXcYb", false)]
#[case("exact", "exact", true)]
#[case("exact", "exactly", false)]
fn glob_semantics(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
    assert_eq!(glob_match(pattern, name), expected);
}

#[test]
fn zero_matches_yield_empty_singleton() {
    let (tree, root) = parse("frob skip\n");
    let matched = tree.match_child(&root, "method", "other");
    assert!(matched.is_empty());
    assert_eq!(tree.get_bool(&matched, ArgumentType::Skip), None);
}

#[test]
fn later_rule_wins_on_key_collision() {
    // Rule A sets hidden, rule B (after A) sets hidden=false: the
    // effective value is false, while keys only one rule set survive.
    let (tree, root) = parse("frob#method hidden deprecated\nfrob#method hidden=false\n");
    let matched = tree.match_child(&root, "method", "frob");
    assert!(matches!(matched, MetadataHandle::Set(_)));
    assert_eq!(tree.get_bool(&matched, ArgumentType::Hidden), Some(false));
    assert_eq!(tree.get_bool(&matched, ArgumentType::Deprecated), Some(true));
}

#[test]
fn set_children_accumulate() {
    let (tree, root) = parse("Window.a skip\nWindow.b hidden\n");
    let class = tree.match_child(&root, "class", "Window");
    assert!(matches!(class, MetadataHandle::Set(_)));
    let a = tree.match_child(&class, "method", "a");
    let b = tree.match_child(&class, "method", "b");
    assert_eq!(tree.get_bool(&a, ArgumentType::Skip), Some(true));
    assert_eq!(tree.get_bool(&b, ArgumentType::Hidden), Some(true));
}

#[test]
fn dead_rules_and_arguments_warn() {
    let (tree, root) = parse("used skip\nnever hidden\n");
    let _ = tree.match_child(&root, "method", "used");
    // The skip argument was never read.
    let mut reporter = Reporter::new();
    tree.report_unused(&mut reporter);
    let messages: Vec<_> = reporter
        .diagnostics()
        .iter()
        .map(|d| d.message.clone())
        .collect();
    assert!(messages.contains(&"rule `never` never matched".to_string()));
    assert!(messages.contains(&"argument `skip` never used".to_string()));
}

#[test]
fn used_rules_do_not_warn() {
    let (tree, root) = parse("frob skip\n");
    let matched = tree.match_child(&root, "method", "frob");
    let _ = tree.get_bool(&matched, ArgumentType::Skip);
    let mut reporter = Reporter::new();
    tree.report_unused(&mut reporter);
    assert_eq!(reporter.warning_count(), 0);
}

#[rstest]
#[case("(.+)_async", "load_async", Some("load"))]
#[case("get_(.+)", "get_name", Some("name"))]
#[case("get_(.+)", "set_name", None)]
#[case("plain", "whatever", Some("plain"))]
#[case("(.+)_async", "_async", None)]
fn name_pattern_substitution(
    #[case] value: &str,
    #[case] original: &str,
    #[case] expected: Option<&str>,
) {
    assert_eq!(
        apply_name_pattern(value, original).as_deref(),
        expected
    );
}
