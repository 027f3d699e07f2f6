//! Depth-first streaming walk of one introspection document.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::metadata::{
    ArgumentType, MetadataHandle, apply_name_pattern, normalize_name, normalize_selector,
};
use crate::model::{
    Access, Direction, MethodKind, Node, NodeId, Parameter, ParameterInfo, Signature, Symbol,
    SymbolKind, Transfer,
};
use crate::pipeline::Context;
use crate::typeref::{TypeRef, parse_type_string};

use super::xml::{XmlPull, XmlToken};
use super::{GIR_VERSION, GirError};

/// Walks one GIR document, building provisional nodes and symbols into
/// the shared context.
pub struct DocumentWalker;

impl DocumentWalker {
    /// Walk `input`; `metadata_root` is the override tree parsed for
    /// this document (the empty handle when there is none).
    pub(crate) fn walk(
        ctx: &mut Context,
        input: &str,
        path: &str,
        metadata_root: MetadataHandle,
    ) -> Result<(), GirError> {
        let file: Arc<str> = Arc::from(path);
        let pull = XmlPull::new(input, file.clone())?;
        let root = ctx.tree.root();
        let graph_root = ctx.graph.root();
        ctx.tree.get_mut(root).symbol = Some(graph_root);
        let mut walker = Walker {
            ctx,
            pull,
            prefixes: Vec::new(),
            ns_version: String::new(),
            cheaders: Vec::new(),
            node_stack: vec![root],
            meta_stack: vec![metadata_root],
        };
        walker.parse_repository()
    }
}

struct Walker<'a, 'i> {
    ctx: &'a mut Context,
    pull: XmlPull<'i>,
    /// C identifier prefixes of the current namespace, document-wide.
    prefixes: Vec<String>,
    ns_version: String,
    /// `c:include` headers collected at repository level.
    cheaders: Vec<String>,
    node_stack: Vec<NodeId>,
    meta_stack: Vec<MetadataHandle>,
}

#[derive(Clone, Copy, PartialEq)]
enum CallableKind {
    Constructor,
    Method,
    Function,
    VirtualMethod,
    Callback,
    Signal,
}

/// Outcome of looking at the current child token.
enum Child {
    Element(String),
    Close,
}

impl<'a, 'i> Walker<'a, 'i> {
    /// Current child element name, or `Close` at the enclosing end tag.
    fn next_child(&self) -> Result<Child, GirError> {
        match self.pull.current() {
            XmlToken::Start { name, .. } => Ok(Child::Element(name.clone())),
            XmlToken::End { .. } => Ok(Child::Close),
            XmlToken::Eof => Err(GirError::UnexpectedEof),
        }
    }

    fn current_attrs(&self) -> FxHashMap<String, String> {
        self.pull.attributes().cloned().unwrap_or_default()
    }

    fn parse_repository(&mut self) -> Result<(), GirError> {
        let name = match self.pull.current() {
            XmlToken::Start { name, .. } => name.clone(),
            _ => return Err(GirError::UnexpectedEof),
        };
        if name != "repository" {
            return Err(GirError::UnexpectedRoot(name));
        }
        let version = self
            .current_attrs()
            .get("version")
            .cloned()
            .unwrap_or_default();
        if version != GIR_VERSION {
            return Err(GirError::UnsupportedVersion(version));
        }
        self.pull.advance()?;
        loop {
            let tag = match self.pull.current() {
                XmlToken::Start { name, .. } => name.clone(),
                XmlToken::End { .. } => return self.pull.advance(),
                XmlToken::Eof => return Ok(()),
            };
            match tag.as_str() {
                "include" => {
                    let attrs = self.current_attrs();
                    let dep = match (attrs.get("name"), attrs.get("version")) {
                        (Some(n), Some(v)) => format!("{n}-{v}"),
                        (Some(n), None) => n.clone(),
                        _ => String::new(),
                    };
                    if !dep.is_empty() {
                        self.ctx.dependencies.push(dep);
                    }
                    self.pull.skip_element()?;
                }
                "package" => {
                    let package = self
                        .current_attrs()
                        .get("name")
                        .cloned()
                        .unwrap_or_default();
                    if self.ctx.packages.contains(&package) {
                        // Already walked through an earlier document;
                        // halt this one.
                        tracing::debug!(package, "package repeated, halting document");
                        return Ok(());
                    }
                    self.ctx.packages.push(package);
                    self.pull.skip_element()?;
                }
                "c:include" => {
                    let attrs = self.current_attrs();
                    if let Some(header) = attrs.get("name") {
                        self.cheaders.push(header.clone());
                    }
                    self.pull.skip_element()?;
                }
                "namespace" => self.parse_namespace()?,
                "doc" | "doc:format" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("repository")?,
            }
        }
    }

    fn parse_namespace(&mut self) -> Result<(), GirError> {
        let attrs = self.current_attrs();
        self.prefixes = attrs
            .get("c:identifier-prefixes")
            .map(|p| p.split(',').map(str::to_string).collect())
            .unwrap_or_else(|| {
                attrs
                    .get("name")
                    .map(|n| vec![n.clone()])
                    .unwrap_or_default()
            });
        self.ns_version = attrs.get("version").cloned().unwrap_or_default();

        let Some(id) = self.push_node("namespace")? else {
            return Ok(());
        };
        if self.node(id).symbol.is_none() {
            self.assign_symbol(id, SymbolKind::Namespace { members: Vec::new() });
            let girname = self.node(id).girname.clone();
            let name = self.node(id).name.clone();
            if girname != name {
                self.ctx.namespace_map.insert(girname, vec![name]);
            }
            if let Some(sid) = self.node(id).symbol {
                let sym = self.ctx.graph.get_mut(sid);
                sym.cname = self.prefixes.first().cloned();
                sym.cprefix = self
                    .prefixes
                    .first()
                    .map(|p| format!("{}_", p.to_lowercase()));
            }
        }
        tracing::debug!(
            namespace = %self.node(id).name,
            version = %self.ns_version,
            "walking namespace"
        );
        if let Some(sid) = self.node(id).symbol {
            let headers = std::mem::take(&mut self.cheaders);
            self.ctx.graph.get_mut(sid).cheaders.extend(headers);
        }

        self.pull.advance()?;
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "alias" => self.parse_alias()?,
                "enumeration" => self.parse_enumeration(false)?,
                "bitfield" => self.parse_enumeration(true)?,
                "record" | "union" => self.parse_struct(&tag)?,
                "class" => self.parse_class()?,
                "interface" => self.parse_interface()?,
                "glib:boxed" => self.parse_boxed()?,
                "callback" => self.parse_callable("callback", CallableKind::Callback)?,
                "function" => self.parse_callable("function", CallableKind::Function)?,
                "constant" => self.parse_constant()?,
                "doc" | "docsection" | "function-macro" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("namespace")?,
            }
        }
        self.pull.advance()?;
        self.pop_node();
        Ok(())
    }

    fn parse_class(&mut self) -> Result<(), GirError> {
        let Some(id) = self.push_node("class")? else {
            return Ok(());
        };
        if self.node(id).symbol.is_none() {
            let node = self.node(id);
            let base = node
                .attr("parent")
                .map(|p| TypeRef::named(p, node.source.clone()));
            let is_abstract = node.attr_bool("abstract", false);
            let type_id = node.attr("glib:get-type").map(str::to_string);
            self.assign_symbol(
                id,
                SymbolKind::Class {
                    base,
                    interfaces: Vec::new(),
                    is_abstract,
                    type_id,
                    members: Vec::new(),
                },
            );
            if let Some(a) = self.meta_bool(id, ArgumentType::Abstract)
                && let Some(sid) = self.node(id).symbol
                && let SymbolKind::Class { is_abstract, .. } = &mut self.ctx.graph.get_mut(sid).kind
            {
                *is_abstract = a;
            }
        }

        self.pull.advance()?;
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "implements" => {
                    let iface = self.current_attrs().get("name").cloned();
                    let source = self.node(id).source.clone();
                    if let (Some(iface), Some(sid)) = (iface, self.node(id).symbol)
                        && let SymbolKind::Class { interfaces, .. } =
                            &mut self.ctx.graph.get_mut(sid).kind
                    {
                        interfaces.push(TypeRef::named(&iface, source));
                    }
                    self.pull.skip_element()?;
                }
                "constructor" => self.parse_callable("constructor", CallableKind::Constructor)?,
                "method" => self.parse_callable("method", CallableKind::Method)?,
                "function" => self.parse_callable("function", CallableKind::Function)?,
                "virtual-method" => {
                    self.parse_callable("virtual-method", CallableKind::VirtualMethod)?
                }
                "glib:signal" => self.parse_callable("glib:signal", CallableKind::Signal)?,
                "field" => self.parse_field()?,
                "property" => self.parse_property()?,
                "record" | "union" => self.parse_struct(&tag)?,
                "callback" => self.parse_callable("callback", CallableKind::Callback)?,
                "constant" => self.parse_constant()?,
                "doc" | "doc-deprecated" | "attribute" | "source-position" => {
                    self.pull.skip_element()?
                }
                _ => self.unexpected("class")?,
            }
        }
        self.pull.advance()?;
        self.pop_node();
        Ok(())
    }

    fn parse_interface(&mut self) -> Result<(), GirError> {
        let Some(id) = self.push_node("interface")? else {
            return Ok(());
        };
        if self.node(id).symbol.is_none() {
            self.assign_symbol(
                id,
                SymbolKind::Interface {
                    prerequisites: Vec::new(),
                    type_struct_cname: None,
                    members: Vec::new(),
                },
            );
        }
        self.pull.advance()?;
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "prerequisite" => {
                    let prereq = self.current_attrs().get("name").cloned();
                    let source = self.node(id).source.clone();
                    if let (Some(prereq), Some(sid)) = (prereq, self.node(id).symbol)
                        && let SymbolKind::Interface { prerequisites, .. } =
                            &mut self.ctx.graph.get_mut(sid).kind
                    {
                        prerequisites.push(TypeRef::named(&prereq, source));
                    }
                    self.pull.skip_element()?;
                }
                "method" => self.parse_callable("method", CallableKind::Method)?,
                "function" => self.parse_callable("function", CallableKind::Function)?,
                "virtual-method" => {
                    self.parse_callable("virtual-method", CallableKind::VirtualMethod)?
                }
                "glib:signal" => self.parse_callable("glib:signal", CallableKind::Signal)?,
                "property" => self.parse_property()?,
                "constant" => self.parse_constant()?,
                "doc" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("interface")?,
            }
        }
        self.pull.advance()?;
        self.pop_node();
        Ok(())
    }

    fn parse_struct(&mut self, tag: &str) -> Result<(), GirError> {
        let Some(id) = self.push_node(tag)? else {
            return Ok(());
        };
        if self.node(id).symbol.is_none() {
            let inferred = self.node(id).attr("glib:get-type").is_none()
                && self.node(id).attr("glib:is-gtype-struct-for").is_none();
            let simple = self
                .meta_bool(id, ArgumentType::Struct)
                .unwrap_or(inferred);
            self.assign_symbol(
                id,
                SymbolKind::Struct {
                    base: None,
                    simple_type: simple,
                    members: Vec::new(),
                },
            );
        }
        self.parse_compound_members("record")
    }

    fn parse_boxed(&mut self) -> Result<(), GirError> {
        let Some(id) = self.push_node("glib:boxed")? else {
            return Ok(());
        };
        if self.node(id).symbol.is_none() {
            self.assign_symbol(
                id,
                SymbolKind::Struct {
                    base: None,
                    simple_type: false,
                    members: Vec::new(),
                },
            );
        }
        self.parse_compound_members("glib:boxed")
    }

    /// Shared member loop for record/union/boxed containers.
    fn parse_compound_members(&mut self, context: &str) -> Result<(), GirError> {
        self.pull.advance()?;
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "field" => self.parse_field()?,
                "constructor" => self.parse_callable("constructor", CallableKind::Constructor)?,
                "method" => self.parse_callable("method", CallableKind::Method)?,
                "function" => self.parse_callable("function", CallableKind::Function)?,
                "record" | "union" => self.parse_struct(&tag)?,
                "callback" => self.parse_callable("callback", CallableKind::Callback)?,
                "doc" | "attribute" | "source-position" => self.pull.skip_element()?,
                _ => self.unexpected(context)?,
            }
        }
        self.pull.advance()?;
        self.pop_node();
        Ok(())
    }

    fn parse_enumeration(&mut self, is_flags: bool) -> Result<(), GirError> {
        let tag = if is_flags { "bitfield" } else { "enumeration" };
        let Some(id) = self.push_node(tag)? else {
            return Ok(());
        };
        let error_domain = self.node(id).attr("glib:error-domain").map(str::to_string);
        if self.node(id).symbol.is_none() {
            let kind = match &error_domain {
                Some(quark) => SymbolKind::ErrorDomain {
                    quark: Some(quark.clone()),
                    members: Vec::new(),
                },
                None => SymbolKind::Enum {
                    is_flags,
                    members: Vec::new(),
                },
            };
            self.assign_symbol(id, kind);
        }

        self.pull.advance()?;
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "member" => self.parse_enum_member(error_domain.is_some())?,
                "function" => self.parse_callable("function", CallableKind::Function)?,
                "doc" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("enumeration")?,
            }
        }
        self.pull.advance()?;
        self.pop_node();
        Ok(())
    }

    fn parse_enum_member(&mut self, is_error_code: bool) -> Result<(), GirError> {
        let Some(id) = self.push_node("member")? else {
            return Ok(());
        };
        if self.node(id).symbol.is_none() {
            let value = self.node(id).attr("value").map(str::to_string);
            let kind = if is_error_code {
                SymbolKind::ErrorCode { value }
            } else {
                SymbolKind::EnumValue { value }
            };
            self.assign_symbol(id, kind);
        }
        self.pull.skip_element()?;
        self.pop_node();
        Ok(())
    }

    fn parse_constant(&mut self) -> Result<(), GirError> {
        let Some(id) = self.push_node("constant")? else {
            return Ok(());
        };
        let value = self.node(id).attr("value").map(str::to_string);
        self.pull.advance()?;
        let mut ty = TypeRef::void();
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "type" | "array" => {
                    let (parsed, _) = self.parse_type_element()?;
                    ty = parsed;
                }
                "doc" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("constant")?,
            }
        }
        self.pull.advance()?;
        if let Some(t) = self.meta_type_override(id, true) {
            ty = t;
        }
        if self.node(id).symbol.is_none() {
            self.assign_symbol(id, SymbolKind::Constant { ty, value });
        }
        self.pop_node();
        Ok(())
    }

    fn parse_alias(&mut self) -> Result<(), GirError> {
        let Some(id) = self.push_node("alias")? else {
            return Ok(());
        };
        self.pull.advance()?;
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "type" | "array" => {
                    let (ty, _) = self.parse_type_element()?;
                    self.node_mut(id).base_type = Some(ty);
                }
                "doc" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("alias")?,
            }
        }
        self.pull.advance()?;
        if let Some(t) = self.meta_type_override(id, true) {
            self.node_mut(id).base_type = Some(t);
        }
        if self.node(id).symbol.is_none() {
            // Final shape is inferred from the base type during
            // reconciliation.
            self.assign_symbol(
                id,
                SymbolKind::Struct {
                    base: None,
                    simple_type: true,
                    members: Vec::new(),
                },
            );
        }
        self.pop_node();
        Ok(())
    }

    fn parse_field(&mut self) -> Result<(), GirError> {
        let Some(id) = self.push_node("field")? else {
            return Ok(());
        };
        self.pull.advance()?;
        let mut ty: Option<TypeRef> = None;
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "type" | "array" => {
                    let (parsed, _) = self.parse_type_element()?;
                    ty = Some(parsed);
                }
                "callback" => {
                    // Callback-typed field: the child node carries the
                    // delegate; the field's type references it.
                    let cb_name = self
                        .current_attrs()
                        .get("name")
                        .cloned()
                        .unwrap_or_default();
                    self.parse_callable("callback", CallableKind::Callback)?;
                    let source = self.node(id).source.clone();
                    ty = Some(TypeRef::named(&normalize_name(&cb_name), source));
                }
                "doc" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("field")?,
            }
        }
        self.pull.advance()?;
        let mut ty = ty.unwrap_or_else(TypeRef::void);
        if let Some(t) = self.meta_type_override(id, false) {
            ty = t;
        }
        self.apply_type_flags(id, &mut ty);
        if self.node(id).symbol.is_none() {
            let private = self.node(id).attr_bool("private", false);
            self.assign_symbol(
                id,
                SymbolKind::Field {
                    ty,
                    array_length_cname: None,
                },
            );
            if private && let Some(sid) = self.node(id).symbol {
                self.ctx.graph.get_mut(sid).access = Access::Private;
            }
        }
        self.pop_node();
        Ok(())
    }

    fn parse_property(&mut self) -> Result<(), GirError> {
        let Some(id) = self.push_node("property")? else {
            return Ok(());
        };
        self.pull.advance()?;
        let mut ty: Option<TypeRef> = None;
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "type" | "array" => {
                    let (parsed, _) = self.parse_type_element()?;
                    ty = Some(parsed);
                }
                "doc" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("property")?,
            }
        }
        self.pull.advance()?;
        let mut ty = ty.unwrap_or_else(TypeRef::void);
        if let Some(t) = self.meta_type_override(id, false) {
            ty = t;
        }
        self.apply_type_flags(id, &mut ty);
        if self.node(id).symbol.is_none() {
            let node = self.node(id);
            let readable = node.attr_bool("readable", true);
            let writable = node.attr_bool("writable", false);
            let construct =
                node.attr_bool("construct", false) || node.attr_bool("construct-only", false);
            self.assign_symbol(
                id,
                SymbolKind::Property {
                    ty,
                    readable,
                    writable,
                    construct,
                    accessor_methods: false,
                },
            );
        }
        self.pop_node();
        Ok(())
    }

    fn parse_callable(&mut self, tag: &str, kind: CallableKind) -> Result<(), GirError> {
        let Some(id) = self.push_node(tag)? else {
            return Ok(());
        };
        let throws = self.node(id).attr_bool("throws", false);
        let finish_cname = self.node(id).attr("glib:finish-func").map(str::to_string);
        let no_wrapper = self.node(id).attr("glib:no-wrapper").is_some();

        self.pull.advance()?;
        let mut return_type = TypeRef::void();
        loop {
            let child = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match child.as_str() {
                "return-value" => return_type = self.parse_return_value(id)?,
                "parameters" => self.parse_parameters(id)?,
                "doc" | "doc-deprecated" | "attribute" | "source-position" => {
                    self.pull.skip_element()?
                }
                _ => self.unexpected(tag)?,
            }
        }
        self.pull.advance()?;

        if let Some(t) = self.meta_type_override(id, true) {
            return_type = t;
        }
        self.apply_type_flags(id, &mut return_type);

        let mut signature = Signature::new();
        signature.return_type = return_type;
        signature.throws = throws;
        if let Some(t) = self.meta_bool(id, ArgumentType::Throws) {
            signature.throws = t;
        }
        let coroutine = self
            .node(id)
            .parameters
            .iter()
            .any(|p| p.param.scope.as_deref() == Some("async"));

        if self.node(id).symbol.is_none() {
            let matched = self.node(id).metadata.clone();
            let symbol_kind = match kind {
                CallableKind::Callback => SymbolKind::Delegate { signature },
                CallableKind::Signal => SymbolKind::Signal {
                    signature,
                    has_emitter: false,
                    is_virtual: false,
                },
                _ => SymbolKind::Method {
                    kind: match kind {
                        CallableKind::Constructor => MethodKind::Creation,
                        CallableKind::Method | CallableKind::VirtualMethod => MethodKind::Instance,
                        _ => MethodKind::Static,
                    },
                    signature,
                    is_virtual: kind == CallableKind::VirtualMethod
                        || self
                            .ctx
                            .metadata
                            .get_bool(&matched, ArgumentType::Virtual)
                            .unwrap_or(false),
                    is_abstract: self
                        .ctx
                        .metadata
                        .get_bool(&matched, ArgumentType::Abstract)
                        .unwrap_or(false),
                    vfunc_name: self
                        .ctx
                        .metadata
                        .get_string(&matched, ArgumentType::VfuncName),
                    coroutine,
                    no_wrapper,
                    printf_format: self
                        .ctx
                        .metadata
                        .get_bool(&matched, ArgumentType::PrintfFormat)
                        .unwrap_or(false),
                    finish_cname,
                },
            };
            self.assign_symbol(id, symbol_kind);
        }
        self.pop_node();
        Ok(())
    }

    fn parse_return_value(&mut self, id: NodeId) -> Result<TypeRef, GirError> {
        let attrs = self.current_attrs();
        self.pull.advance()?;
        let mut ty = TypeRef::void();
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "type" | "array" => {
                    let (parsed, length_idx) = self.parse_type_element()?;
                    ty = parsed;
                    if let Some(idx) = length_idx {
                        self.node_mut(id).array_length_parameters.push(idx);
                    }
                }
                "doc" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("return-value")?,
            }
        }
        self.pull.advance()?;
        ty.owned = matches!(
            attrs.get("transfer-ownership").map(String::as_str),
            Some("full") | Some("container")
        );
        if attrs.get("allow-none").map(String::as_str) == Some("1")
            || attrs.get("nullable").map(String::as_str) == Some("1")
        {
            ty.nullable = true;
        }
        Ok(ty)
    }

    fn parse_parameters(&mut self, id: NodeId) -> Result<(), GirError> {
        self.pull.advance()?;
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "parameter" => self.parse_parameter(id)?,
                "instance-parameter" | "doc" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("parameters")?,
            }
        }
        self.pull.advance()
    }

    fn parse_parameter(&mut self, id: NodeId) -> Result<(), GirError> {
        let attrs = self.current_attrs();
        let index = self.node(id).parameters.len();
        let raw_name = attrs
            .get("name")
            .cloned()
            .unwrap_or_else(|| format!("arg{index}"));
        let name = normalize_name(&raw_name);

        self.pull.advance()?;
        let mut ty = TypeRef::void();
        let mut length_idx = None;
        let mut ellipsis = false;
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "type" | "array" => {
                    let (parsed, idx) = self.parse_type_element()?;
                    ty = parsed;
                    length_idx = idx;
                }
                "varargs" => {
                    ellipsis = true;
                    self.pull.skip_element()?;
                }
                "doc" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("parameter")?,
            }
        }
        self.pull.advance()?;

        let mut param = Parameter::new(name.clone(), ty);
        param.ellipsis = ellipsis;
        param.transfer = match attrs.get("transfer-ownership").map(String::as_str) {
            Some("full") => Transfer::Full,
            Some("container") => Transfer::Container,
            _ => Transfer::None,
        };
        param.ty.owned = param.transfer != Transfer::None;
        param.direction = match attrs.get("direction").map(String::as_str) {
            Some("out") => Direction::Out,
            Some("inout") => Direction::InOut,
            _ => Direction::In,
        };
        if attrs.get("allow-none").map(String::as_str) == Some("1")
            || attrs.get("nullable").map(String::as_str) == Some("1")
        {
            param.ty.nullable = true;
        }
        param.scope = attrs.get("scope").cloned();

        let mut info = ParameterInfo::new(param);
        info.array_length_idx = length_idx;
        if let Some(idx) = length_idx {
            self.node_mut(id).array_length_parameters.push(idx);
        }
        if let Some(idx) = attrs.get("closure").and_then(|v| v.parse::<usize>().ok()) {
            info.closure_idx = Some(idx);
            self.node_mut(id).closure_parameters.push(idx);
        }
        if let Some(idx) = attrs.get("destroy").and_then(|v| v.parse::<usize>().ok()) {
            info.destroy_idx = Some(idx);
            self.node_mut(id).destroy_parameters.push(idx);
        }

        // Parameter-level overrides.
        let callable_meta = self.node(id).metadata.clone();
        let matched = self
            .ctx
            .metadata
            .match_child(&callable_meta, "parameter", &name);
        if !matched.is_empty() {
            self.apply_parameter_overrides(id, &mut info, &matched);
        }

        self.node_mut(id).parameters.push(info);
        Ok(())
    }

    fn apply_parameter_overrides(
        &mut self,
        id: NodeId,
        info: &mut ParameterInfo,
        matched: &MetadataHandle,
    ) {
        let meta = &self.ctx.metadata;
        if let Some(value) = meta.get_string(matched, ArgumentType::Type) {
            let source = self.node(id).source.clone();
            match parse_type_string(&value, false, source.clone()) {
                Ok(t) => info.param.ty = t,
                Err(e) => self.ctx.reporter.error(source, e.to_string()),
            }
        }
        let meta = &self.ctx.metadata;
        if let Some(n) = meta.get_bool(matched, ArgumentType::Nullable) {
            info.param.ty.nullable = n;
        }
        if meta.get_bool(matched, ArgumentType::Owned) == Some(true) {
            info.param.ty.owned = true;
        }
        if meta.get_bool(matched, ArgumentType::Unowned) == Some(true) {
            info.param.ty.owned = false;
        }
        if meta.get_bool(matched, ArgumentType::Out) == Some(true) {
            info.param.direction = Direction::Out;
        }
        if meta.get_bool(matched, ArgumentType::Ref) == Some(true) {
            info.param.direction = Direction::InOut;
        }
        if let Some(d) = meta.get_string(matched, ArgumentType::Default) {
            info.param.default = Some(d);
        }
        if let Some(s) = meta.get_string(matched, ArgumentType::Scope) {
            info.param.scope = Some(s);
        }
        if meta.get_bool(matched, ArgumentType::Array) == Some(true) {
            info.param.ty.array_rank = info.param.ty.array_rank.max(1);
        }
        if let Some(idx) = meta.get_integer(matched, ArgumentType::ArrayLengthIdx) {
            info.array_length_idx = Some(idx as usize);
            self.node_mut(id).array_length_parameters.push(idx as usize);
        }
        if self.ctx.metadata.get_bool(matched, ArgumentType::Skip) == Some(true) {
            info.keep = false;
        }
    }

    /// Parse a `type` or `array` element into a descriptor, returning
    /// the array-length parameter index when the document supplies one.
    fn parse_type_element(&mut self) -> Result<(TypeRef, Option<usize>), GirError> {
        let name = match self.pull.current() {
            XmlToken::Start { name, .. } => name.clone(),
            _ => return Err(GirError::UnexpectedEof),
        };
        let attrs = self.current_attrs();
        if name == "array" {
            let length = attrs.get("length").and_then(|v| v.parse::<usize>().ok());
            self.pull.advance()?;
            let mut element = TypeRef::void();
            loop {
                let tag = match self.next_child()? {
                    Child::Element(tag) => tag,
                    Child::Close => break,
                };
                match tag.as_str() {
                    "type" | "array" => {
                        let (parsed, _) = self.parse_type_element()?;
                        element = parsed;
                    }
                    _ => self.unexpected("array")?,
                }
            }
            self.pull.advance()?;
            element.array_rank += 1;
            return Ok((element, length));
        }

        // Plain `type` element, possibly with generic arguments.
        let source = self.pull.source();
        let type_name = attrs
            .get("name")
            .cloned()
            .or_else(|| {
                attrs
                    .get("c:type")
                    .map(|c| c.trim_end_matches('*').to_string())
            })
            .unwrap_or_default();
        self.pull.advance()?;
        let mut arguments = Vec::new();
        loop {
            let tag = match self.next_child()? {
                Child::Element(tag) => tag,
                Child::Close => break,
            };
            match tag.as_str() {
                "type" | "array" => {
                    let (parsed, _) = self.parse_type_element()?;
                    arguments.push(parsed);
                }
                "doc" | "attribute" => self.pull.skip_element()?,
                _ => self.unexpected("type")?,
            }
        }
        self.pull.advance()?;

        let mut ty = match type_name.as_str() {
            "none" | "" => TypeRef::void(),
            "gpointer" => {
                let mut t = TypeRef::void();
                t.pointer_level = 1;
                t
            }
            other => TypeRef::named(map_basic_type(other), Some(source)),
        };
        ty.type_arguments = arguments;
        Ok((ty, None))
    }

    // ------------------------------------------------------------------
    // Node and symbol plumbing
    // ------------------------------------------------------------------

    /// Begin an element: match overrides, decide skip/keep, resolve the
    /// effective name and create or reuse the node. Pushes the walk
    /// stacks on success; on skip the whole subtree is consumed.
    fn push_node(&mut self, tag: &str) -> Result<Option<NodeId>, GirError> {
        let attrs = self.current_attrs();
        let source = self.pull.source();
        let selector = normalize_selector(tag);
        let raw_name = attrs
            .get("name")
            .or_else(|| attrs.get("glib:name"))
            .cloned()
            .unwrap_or_default();
        let girname = normalize_name(&raw_name);

        let scope = self.meta_stack.last().cloned().unwrap_or_default();
        let matched = self.ctx.metadata.match_child(&scope, &selector, &girname);

        let skip = match self.ctx.metadata.get_bool(&matched, ArgumentType::Skip) {
            Some(skip) => skip,
            None => !attrs
                .get("introspectable")
                .map(|v| v != "0")
                .unwrap_or(true),
        };
        if skip {
            tracing::trace!(tag, name = girname, "skipping subtree");
            self.pull.skip_element()?;
            return Ok(None);
        }

        let name = match self.ctx.metadata.get_string(&matched, ArgumentType::Name) {
            Some(value) => apply_name_pattern(&value, &girname).unwrap_or(value),
            None => strip_enum_suffix(tag, &girname).to_string(),
        };

        // Top-level rules address namespace members, so the namespace
        // element itself keeps the file-root scope for its children.
        let child_scope = if selector == "namespace" {
            scope.clone()
        } else {
            matched.clone()
        };

        let parent = self
            .node_stack
            .last()
            .copied()
            .unwrap_or_else(|| self.ctx.tree.root());
        if let Some(existing) = self.ctx.tree.lookup_kind(parent, &name, &selector) {
            // A later document re-opening a node from an earlier file
            // extends a foreign type; the symbol records that.
            let node = self.ctx.tree.get(existing);
            let foreign = node
                .source
                .as_ref()
                .is_some_and(|s| s.file != source.file);
            if foreign && let Some(sid) = node.symbol {
                self.ctx.graph.get_mut(sid).external = true;
            }
            self.node_stack.push(existing);
            self.meta_stack.push(child_scope);
            return Ok(Some(existing));
        }

        let mut node = Node::new(selector, name);
        node.girname = girname;
        node.attributes = attrs;
        node.metadata = matched.clone();
        node.source = Some(source);
        let id = self.ctx.tree.alloc(node);
        self.ctx.tree.push_child(parent, id);
        self.node_stack.push(id);
        self.meta_stack.push(child_scope);
        Ok(Some(id))
    }

    fn pop_node(&mut self) {
        self.node_stack.pop();
        self.meta_stack.pop();
    }

    /// Create this node's provisional symbol. Membership is wired
    /// during reconciliation, once merges are adjudicated; a document
    /// extending an earlier one reuses nodes instead, in `push_node`.
    fn assign_symbol(&mut self, id: NodeId, kind: SymbolKind) {
        let name = self.node(id).name.clone();
        let mut symbol = Symbol::new(name, kind);
        symbol.source = self.node(id).source.clone();
        symbol.cname = self.element_cname(id);
        let sid = self.ctx.graph.alloc(symbol);
        self.node_mut(id).symbol = Some(sid);
        self.node_mut(id).new_symbol = true;
    }

    /// C-name of an element: explicit attributes win, type-like kinds
    /// fall back to the namespace identifier prefix.
    fn element_cname(&self, id: NodeId) -> Option<String> {
        let node = self.node(id);
        if let Some(c) = node
            .attr("c:identifier")
            .or_else(|| node.attr("c:type"))
            .or_else(|| node.attr("glib:type-name"))
        {
            return Some(c.to_string());
        }
        match node.element_kind.as_str() {
            "class" | "interface" | "record" | "union" | "enumeration" | "bitfield" | "alias"
            | "boxed" | "callback" => self
                .prefixes
                .first()
                .map(|p| format!("{p}{}", node.girname)),
            _ => None,
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        self.ctx.tree.get(id)
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.ctx.tree.get_mut(id)
    }

    fn meta_bool(&self, id: NodeId, key: ArgumentType) -> Option<bool> {
        self.ctx.metadata.get_bool(&self.node(id).metadata, key)
    }

    /// An override `type=` argument parsed through the mini-parser;
    /// parse failures report and yield no override.
    fn meta_type_override(&mut self, id: NodeId, owned_by_default: bool) -> Option<TypeRef> {
        let matched = self.node(id).metadata.clone();
        let value = self.ctx.metadata.get_string(&matched, ArgumentType::Type)?;
        let source = self.node(id).source.clone();
        match parse_type_string(&value, owned_by_default, source.clone()) {
            Ok(mut ty) => {
                if let Some(args) = self
                    .ctx
                    .metadata
                    .get_string(&matched, ArgumentType::TypeArguments)
                {
                    for part in args.split(',') {
                        match parse_type_string(part.trim(), owned_by_default, source.clone()) {
                            Ok(arg) => ty.type_arguments.push(arg),
                            Err(e) => self.ctx.reporter.error(source.clone(), e.to_string()),
                        }
                    }
                }
                Some(ty)
            }
            Err(e) => {
                self.ctx.reporter.error(source, e.to_string());
                None
            }
        }
    }

    /// Ownership/nullability/array flags from overrides, applied onto a
    /// document-derived type.
    fn apply_type_flags(&mut self, id: NodeId, ty: &mut TypeRef) {
        let matched = self.node(id).metadata.clone();
        if let Some(n) = self.ctx.metadata.get_bool(&matched, ArgumentType::Nullable) {
            ty.nullable = n;
        }
        if self.ctx.metadata.get_bool(&matched, ArgumentType::Owned) == Some(true) {
            ty.owned = true;
        }
        if self.ctx.metadata.get_bool(&matched, ArgumentType::Unowned) == Some(true) {
            ty.owned = false;
        }
        if self.ctx.metadata.get_bool(&matched, ArgumentType::Array) == Some(true) {
            ty.array_rank = ty.array_rank.max(1);
        }
    }

    /// Recoverable structural violation: report and skip the subtree.
    fn unexpected(&mut self, context: &str) -> Result<(), GirError> {
        let name = self.pull.start_name().unwrap_or("?").to_string();
        let source = self.pull.source();
        self.ctx.reporter.error(
            Some(source),
            format!("unexpected element `{name}` inside `{context}`"),
        );
        self.pull.skip_element()
    }
}

/// Enumeration names drop a trailing `Enum` unless nothing would
/// remain.
fn strip_enum_suffix<'n>(tag: &str, name: &'n str) -> &'n str {
    if tag != "enumeration" && tag != "bitfield" {
        return name;
    }
    match name.strip_suffix("Enum") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => name,
    }
}

/// GIR fundamental type names to language-level names.
fn map_basic_type(name: &str) -> &str {
    match name {
        "utf8" | "filename" => "string",
        "gboolean" => "bool",
        "gchar" => "char",
        "guchar" => "uchar",
        "gint" => "int",
        "guint" => "uint",
        "glong" => "long",
        "gulong" => "ulong",
        "gint8" => "int8",
        "guint8" => "uint8",
        "gint16" => "int16",
        "guint16" => "uint16",
        "gint32" => "int32",
        "guint32" => "uint32",
        "gint64" => "int64",
        "guint64" => "uint64",
        "gfloat" => "float",
        "gdouble" => "double",
        "gsize" => "size_t",
        "gssize" => "ssize_t",
        "gunichar" => "unichar",
        "GType" => "GLib.Type",
        other => other,
    }
}
