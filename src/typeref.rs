//! Type references and the type-string mini-parser.
//!
//! A [`TypeRef`] is the structured descriptor attached to parameters,
//! return values, fields, properties and aliases. Textual references stay
//! [`UnresolvedSymbol`]s until the resolve phase; they are never bound
//! inline during construction.
//!
//! The mini-parser reads inline type expressions of the form
//! `[owned|unowned] dotted-name [<type-args>] [*…] [\[,…\]] [?]` with
//! depth-tracked splitting so nested generics parse correctly.

use thiserror::Error;

use crate::base::SourceRef;

/// A possibly-multi-segment dotted reference whose target may not exist
/// yet: `inner` chain plus leaf `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedSymbol {
    pub inner: Vec<String>,
    pub name: String,
    pub source: Option<SourceRef>,
}

impl UnresolvedSymbol {
    pub fn from_dotted(path: &str, source: Option<SourceRef>) -> Self {
        let mut segments: Vec<String> = path.split('.').map(str::to_string).collect();
        let name = segments.pop().unwrap_or_default();
        Self {
            inner: segments,
            name,
            source,
        }
    }

    /// The full chain, inner segments first.
    pub fn segments(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.inner.iter().map(String::as_str).collect();
        out.push(&self.name);
        out
    }

    pub fn to_dotted(&self) -> String {
        self.segments().join(".")
    }

    /// Replace the whole chain with new segments.
    pub fn set_segments(&mut self, segments: Vec<String>) {
        let mut segments = segments;
        self.name = segments.pop().unwrap_or_default();
        self.inner = segments;
    }
}

/// Base of a type reference.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeName {
    Void,
    Named(UnresolvedSymbol),
}

/// Structured type descriptor with C-level modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub base: TypeName,
    pub type_arguments: Vec<TypeRef>,
    pub pointer_level: usize,
    /// 0 = not an array; otherwise the array rank.
    pub array_rank: usize,
    pub nullable: bool,
    pub owned: bool,
}

impl TypeRef {
    pub fn void() -> Self {
        Self {
            base: TypeName::Void,
            type_arguments: Vec::new(),
            pointer_level: 0,
            array_rank: 0,
            nullable: false,
            owned: false,
        }
    }

    pub fn named(path: &str, source: Option<SourceRef>) -> Self {
        Self {
            base: TypeName::Named(UnresolvedSymbol::from_dotted(path, source)),
            type_arguments: Vec::new(),
            pointer_level: 0,
            array_rank: 0,
            nullable: false,
            owned: false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.base, TypeName::Void)
    }

    pub fn is_array(&self) -> bool {
        self.array_rank > 0
    }

    /// Leaf name of the base, if named.
    pub fn base_name(&self) -> Option<&str> {
        match &self.base {
            TypeName::Named(u) => Some(&u.name),
            TypeName::Void => None,
        }
    }

    pub fn dotted_base(&self) -> Option<String> {
        match &self.base {
            TypeName::Named(u) => Some(u.to_dotted()),
            TypeName::Void => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeParseError {
    #[error("expected type name")]
    MissingName,
    #[error("unbalanced `<` in type arguments")]
    UnbalancedTypeArguments,
    #[error("unterminated array brackets")]
    UnterminatedArray,
    #[error("`void` only admits pointer modifiers")]
    InvalidVoid,
    #[error("redundant `owned` keyword")]
    RedundantOwned,
    #[error("redundant `unowned` keyword")]
    RedundantUnowned,
    #[error("unexpected trailing `{0}`")]
    Trailing(String),
}

/// Parse an inline type expression.
///
/// The ownership keyword is contextual: with `owned_by_default` an
/// explicit `owned` is rejected as redundant and `unowned` flips the
/// default off; without it the mirror applies.
pub fn parse_type_string(
    input: &str,
    owned_by_default: bool,
    source: Option<SourceRef>,
) -> Result<TypeRef, TypeParseError> {
    let mut rest = input.trim();
    let mut owned = owned_by_default;

    if let Some(after) = strip_keyword(rest, "owned") {
        if owned_by_default {
            return Err(TypeParseError::RedundantOwned);
        }
        owned = true;
        rest = after;
    } else if let Some(after) = strip_keyword(rest, "unowned") {
        if !owned_by_default {
            return Err(TypeParseError::RedundantUnowned);
        }
        owned = false;
        rest = after;
    }

    // Base name: everything up to the first modifier character.
    let name_end = rest
        .find(|c| matches!(c, '<' | '*' | '[' | '?'))
        .unwrap_or(rest.len());
    let name = rest[..name_end].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return Err(TypeParseError::MissingName);
    }
    rest = rest[name_end..].trim_start();

    let mut ty = if name == "void" {
        TypeRef::void()
    } else {
        TypeRef::named(name, source.clone())
    };
    ty.owned = owned;

    if let Some(stripped) = rest.strip_prefix('<') {
        let (inner, after) =
            split_at_closing_angle(stripped).ok_or(TypeParseError::UnbalancedTypeArguments)?;
        for part in split_top_level(inner) {
            ty.type_arguments
                .push(parse_type_string(part, owned_by_default, source.clone())?);
        }
        rest = after.trim_start();
    }

    while let Some(after) = rest.strip_prefix('*') {
        ty.pointer_level += 1;
        rest = after.trim_start();
    }

    if let Some(stripped) = rest.strip_prefix('[') {
        let close = stripped.find(']').ok_or(TypeParseError::UnterminatedArray)?;
        let commas = &stripped[..close];
        if !commas.chars().all(|c| c == ',' || c.is_whitespace()) {
            return Err(TypeParseError::UnterminatedArray);
        }
        ty.array_rank = commas.matches(',').count() + 1;
        rest = stripped[close + 1..].trim_start();
    }

    if let Some(after) = rest.strip_prefix('?') {
        ty.nullable = true;
        rest = after.trim_start();
    }

    if !rest.is_empty() {
        return Err(TypeParseError::Trailing(rest.to_string()));
    }

    if ty.is_void() && (ty.array_rank > 0 || ty.nullable || !ty.type_arguments.is_empty()) {
        return Err(TypeParseError::InvalidVoid);
    }

    Ok(ty)
}

fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    let after = input.strip_prefix(keyword)?;
    // Must be a whole word followed by more input.
    if after.starts_with(|c: char| c.is_whitespace()) {
        Some(after.trim_start())
    } else {
        None
    }
}

/// Find the `>` closing the argument list at matching nesting depth,
/// tracking both `<>` and `[]`. Returns (inner, after-close).
fn split_at_closing_angle(input: &str) -> Option<(&str, &str)> {
    let mut angle = 0usize;
    let mut square = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '<' => angle += 1,
            '[' => square += 1,
            ']' => square = square.checked_sub(1)?,
            '>' if angle > 0 => angle -= 1,
            '>' if square == 0 => return Some((&input[..i], &input[i + 1..])),
            _ => {}
        }
    }
    None
}

/// Split a type-argument list at commas that sit at zero nesting depth.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0isize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = input[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn round_trip_full_form() {
        let ty = parse_type_string("owned Foo.Bar<Baz>*[,]?", false, None).unwrap();
        assert!(ty.nullable);
        assert!(ty.owned);
        assert_eq!(ty.pointer_level, 1);
        assert_eq!(ty.array_rank, 2);
        assert_eq!(ty.type_arguments.len(), 1);
        assert_eq!(ty.type_arguments[0].base_name(), Some("Baz"));
        assert_eq!(ty.dotted_base().as_deref(), Some("Foo.Bar"));
    }

    #[test]
    fn nested_generics_parse_at_depth() {
        let ty = parse_type_string("GLib.HashTable<string,GLib.List<int>>", true, None).unwrap();
        assert_eq!(ty.type_arguments.len(), 2);
        assert_eq!(ty.type_arguments[1].type_arguments.len(), 1);
        assert_eq!(
            ty.type_arguments[1].type_arguments[0].base_name(),
            Some("int")
        );
    }

    #[test]
    fn void_admits_only_pointers() {
        let ty = parse_type_string("void**", true, None).unwrap();
        assert!(ty.is_void());
        assert_eq!(ty.pointer_level, 2);
        assert_eq!(
            parse_type_string("void[]", true, None),
            Err(TypeParseError::InvalidVoid)
        );
        assert_eq!(
            parse_type_string("void?", true, None),
            Err(TypeParseError::InvalidVoid)
        );
    }

    #[rstest]
    #[case("owned Foo", true, Err(TypeParseError::RedundantOwned))]
    #[case("unowned Foo", false, Err(TypeParseError::RedundantUnowned))]
    fn redundant_ownership_rejected(
        #[case] input: &str,
        #[case] owned_by_default: bool,
        #[case] expected: Result<TypeRef, TypeParseError>,
    ) {
        assert_eq!(parse_type_string(input, owned_by_default, None), expected);
    }

    #[test]
    fn unowned_flips_default() {
        let ty = parse_type_string("unowned Foo", true, None).unwrap();
        assert!(!ty.owned);
        let ty = parse_type_string("owned Foo", false, None).unwrap();
        assert!(ty.owned);
    }

    #[rstest]
    #[case("")]
    #[case("Foo<Bar")]
    #[case("Foo[")]
    #[case("Foo junk")]
    #[case("Foo?x")]
    fn grammar_violations_fail(#[case] input: &str) {
        assert!(parse_type_string(input, true, None).is_err());
    }

    #[test]
    fn array_rank_counts_commas() {
        assert_eq!(parse_type_string("int[]", true, None).unwrap().array_rank, 1);
        assert_eq!(
            parse_type_string("int[,,]", true, None).unwrap().array_rank,
            3
        );
    }

    #[test]
    fn unresolved_chain_splits_inner_and_name() {
        let u = UnresolvedSymbol::from_dotted("A.B.C", None);
        assert_eq!(u.inner, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(u.name, "C");
        assert_eq!(u.to_dotted(), "A.B.C");
    }
}
