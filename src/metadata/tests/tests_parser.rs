#![allow(clippy::unwrap_used)]
use std::sync::Arc;

use rstest::rstest;

use crate::metadata::{
    ArgumentType, Expression, MetadataHandle, MetadataTree, ParseErrorKind, parse_metadata,
};

fn parse(input: &str) -> (MetadataTree, MetadataHandle) {
    let mut tree = MetadataTree::new();
    let root = parse_metadata(&mut tree, input, Arc::from("Test.metadata")).unwrap();
    (tree, MetadataHandle::One(root))
}

#[test]
fn bare_key_defaults_to_true() {
    let (tree, root) = parse("frob skip\n");
    let matched = tree.match_child(&root, "method", "frob");
    assert_eq!(tree.get_bool(&matched, ArgumentType::Skip), Some(true));
}

#[test]
fn selector_restricts_match() {
    let (tree, root) = parse("frob#signal hidden\n");
    assert!(tree.match_child(&root, "method", "frob").is_empty());
    assert!(!tree.match_child(&root, "signal", "frob").is_empty());
}

#[test]
fn nested_pattern_builds_chain() {
    let (tree, root) = parse("Window.open#method throws=false\n");
    let class = tree.match_child(&root, "class", "Window");
    assert!(!class.is_empty());
    let method = tree.match_child(&class, "method", "open");
    assert_eq!(tree.get_bool(&method, ArgumentType::Throws), Some(false));
}

#[test]
fn relative_rule_attaches_to_previous_absolute() {
    let (tree, root) = parse("Window#class\n.open skip\n");
    let class = tree.match_child(&root, "class", "Window");
    let method = tree.match_child(&class, "method", "open");
    assert_eq!(tree.get_bool(&method, ArgumentType::Skip), Some(true));
}

mod expressions {
    use super::*;

    #[rstest]
    #[case("x default=null", Expression::Null)]
    #[case("x default=true", Expression::Bool(true))]
    #[case("x default=42", Expression::Integer(42))]
    #[case("x default=-7", Expression::Integer(-7))]
    #[case("x default=2.5", Expression::Real(2.5))]
    #[case("x default=\"hi\"", Expression::String("hi".into()))]
    #[case(
        "x default=Gtk.Orientation.HORIZONTAL",
        Expression::Member(vec!["Gtk".into(), "Orientation".into(), "HORIZONTAL".into()])
    )]
    fn literal_forms(#[case] input: &str, #[case] expected: Expression) {
        let (tree, root) = parse(input);
        let matched = tree.match_child(&root, "method", "x");
        let arg = tree.get_argument(&matched, ArgumentType::Default).unwrap();
        assert_eq!(arg.expr, expected);
    }
}

#[test]
fn unknown_key_is_hard_error() {
    let mut tree = MetadataTree::new();
    let err = parse_metadata(&mut tree, "frob frobnicate=1\n", Arc::from("t")).unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::UnknownArgument("frobnicate".into())
    );
}

#[test]
fn pattern_where_identifier_expected_is_hard_error() {
    let mut tree = MetadataTree::new();
    let err = parse_metadata(&mut tree, "frob#get_* skip\n", Arc::from("t")).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::ExpectedIdentifier(_)));
}

#[test]
fn malformed_expression_is_hard_error() {
    let mut tree = MetadataTree::new();
    let err = parse_metadata(&mut tree, "frob default==\n", Arc::from("t")).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ExpectedExpression);
}

#[test]
fn error_position_points_at_offender() {
    let mut tree = MetadataTree::new();
    let err = parse_metadata(&mut tree, "a skip\nb bogus\n", Arc::from("t")).unwrap_err();
    assert_eq!(err.source_ref.span.start.line, 2);
    assert_eq!(err.source_ref.span.start.column, 2);
}
