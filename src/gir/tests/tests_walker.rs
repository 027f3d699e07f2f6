use crate::model::{MethodKind, SymbolKind};
use crate::pipeline::{Pipeline, PipelineError, PipelineOutput};

fn run(xml: &str) -> PipelineOutput {
    run_with(xml, None)
}

fn run_with(xml: &str, overrides: Option<&str>) -> PipelineOutput {
    let mut pipeline = Pipeline::new();
    pipeline
        .parse_document(xml, "Foo-1.0.gir", overrides.map(|o| (o, "Foo-1.0.metadata")))
        .expect("document walks");
    pipeline.run()
}

#[test]
fn builds_class_with_method() {
    let out = run(r#"
        <repository version="1.2">
          <namespace name="Foo" version="1.0" c:identifier-prefixes="Foo">
            <class name="Widget" c:type="FooWidget" parent="GLib.Object"
                   glib:get-type="foo_widget_get_type">
              <method name="frob" c:identifier="foo_widget_frob">
                <return-value transfer-ownership="none"><type name="none"/></return-value>
              </method>
            </class>
          </namespace>
        </repository>"#);
    assert_eq!(out.error_count, 0);

    let widget = out.graph.lookup_path(&["Foo", "Widget"]).expect("class");
    match &out.graph.get(widget).kind {
        SymbolKind::Class { base, .. } => {
            assert_eq!(base.as_ref().and_then(|b| b.dotted_base()).as_deref(), Some("GLib.Object"));
        }
        other => panic!("expected class, got {other:?}"),
    }
    assert_eq!(out.graph.get(widget).cname.as_deref(), Some("FooWidget"));

    let frob = out.graph.lookup_path(&["Foo", "Widget", "frob"]).expect("method");
    assert!(matches!(
        out.graph.get(frob).kind,
        SymbolKind::Method {
            kind: MethodKind::Instance,
            ..
        }
    ));
    assert_eq!(out.graph.get(frob).cname.as_deref(), Some("foo_widget_frob"));
}

#[test]
fn version_mismatch_is_document_fatal() {
    let mut pipeline = Pipeline::new();
    let err = pipeline
        .parse_document(r#"<repository version="1.0"/>"#, "Old.gir", None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Document(_)));
}

#[test]
fn non_introspectable_elements_are_skipped() {
    let out = run(r#"
        <repository version="1.2">
          <namespace name="Foo">
            <class name="Widget" c:type="FooWidget">
              <method name="internal" introspectable="0" c:identifier="foo_widget_internal">
                <return-value><type name="none"/></return-value>
              </method>
              <method name="public" c:identifier="foo_widget_public">
                <return-value><type name="none"/></return-value>
              </method>
            </class>
          </namespace>
        </repository>"#);
    assert!(out.graph.lookup_path(&["Foo", "Widget", "internal"]).is_none());
    assert!(out.graph.lookup_path(&["Foo", "Widget", "public"]).is_some());
}

#[test]
fn overrides_skip_and_rename() {
    let out = run_with(
        r#"
        <repository version="1.2">
          <namespace name="Foo">
            <class name="Widget" c:type="FooWidget">
              <method name="frob" c:identifier="foo_widget_frob">
                <return-value><type name="none"/></return-value>
              </method>
            </class>
            <class name="Gizmo" c:type="FooGizmo"/>
          </namespace>
        </repository>"#,
        Some("Widget.frob#method skip\nGizmo name=Gadget\n"),
    );
    assert!(out.graph.lookup_path(&["Foo", "Widget", "frob"]).is_none());
    assert!(out.graph.lookup_path(&["Foo", "Gizmo"]).is_none());
    assert!(out.graph.lookup_path(&["Foo", "Gadget"]).is_some());
    assert_eq!(out.warning_count, 0, "all rules matched");
}

#[test]
fn dead_override_rules_warn() {
    let out = run_with(
        r#"
        <repository version="1.2">
          <namespace name="Foo">
            <class name="Widget" c:type="FooWidget"/>
          </namespace>
        </repository>"#,
        Some("Nonexistent skip\n"),
    );
    assert_eq!(out.warning_count, 1);
    assert!(out.diagnostics[0].message.contains("never matched"));
}

#[test]
fn broken_override_file_loses_overrides_only() {
    let out = run_with(
        r#"
        <repository version="1.2">
          <namespace name="Foo">
            <class name="Widget" c:type="FooWidget"/>
          </namespace>
        </repository>"#,
        Some("Widget hidden\nOther bogus_argument\n"),
    );
    // The parse error is reported, the document is still walked, and
    // the half-parsed rules neither apply nor count as dead.
    assert_eq!(out.error_count, 1);
    assert!(out.diagnostics.iter().any(|d| d.message.contains("bogus_argument")));
    assert_eq!(out.warning_count, 0);
    assert!(out.graph.lookup_path(&["Foo", "Widget"]).is_some());
}

#[test]
fn unexpected_child_reports_and_continues() {
    let out = run(r#"
        <repository version="1.2">
          <namespace name="Foo">
            <class name="Widget" c:type="FooWidget">
              <bogus><deeply><nested/></deeply></bogus>
              <method name="frob" c:identifier="foo_widget_frob">
                <return-value><type name="none"/></return-value>
              </method>
            </class>
          </namespace>
        </repository>"#);
    assert_eq!(out.error_count, 1);
    assert!(out.diagnostics[0].message.contains("bogus"));
    assert!(out.graph.lookup_path(&["Foo", "Widget", "frob"]).is_some());
}

#[test]
fn enumeration_bitfield_and_error_domain() {
    let out = run(r#"
        <repository version="1.2">
          <namespace name="Foo">
            <enumeration name="Mode" c:type="FooMode">
              <member name="fast" value="0" c:identifier="FOO_MODE_FAST"/>
              <member name="slow" value="1" c:identifier="FOO_MODE_SLOW"/>
            </enumeration>
            <bitfield name="Flags" c:type="FooFlags">
              <member name="a" value="1" c:identifier="FOO_FLAGS_A"/>
            </bitfield>
            <enumeration name="Error" c:type="FooError" glib:error-domain="foo-error-quark">
              <member name="failed" value="0" c:identifier="FOO_ERROR_FAILED"/>
            </enumeration>
          </namespace>
        </repository>"#);
    let mode = out.graph.lookup_path(&["Foo", "Mode"]).expect("enum");
    assert!(matches!(
        out.graph.get(mode).kind,
        SymbolKind::Enum { is_flags: false, .. }
    ));
    let flags = out.graph.lookup_path(&["Foo", "Flags"]).expect("bitfield");
    assert!(matches!(
        out.graph.get(flags).kind,
        SymbolKind::Enum { is_flags: true, .. }
    ));
    let error = out.graph.lookup_path(&["Foo", "Error"]).expect("error domain");
    match &out.graph.get(error).kind {
        SymbolKind::ErrorDomain { quark, .. } => {
            assert_eq!(quark.as_deref(), Some("foo-error-quark"));
        }
        other => panic!("expected error domain, got {other:?}"),
    }
    let failed = out.graph.lookup_path(&["Foo", "Error", "failed"]).expect("code");
    assert!(matches!(out.graph.get(failed).kind, SymbolKind::ErrorCode { .. }));
}

#[test]
fn dependencies_and_headers_are_collected() {
    let out = run(r#"
        <repository version="1.2">
          <include name="GLib" version="2.0"/>
          <package name="foo-1.0"/>
          <c:include name="foo/foo.h"/>
          <namespace name="Foo"/>
        </repository>"#);
    assert_eq!(out.dependencies, vec!["GLib-2.0".to_string()]);
    assert_eq!(out.packages, vec!["foo-1.0".to_string()]);
    let ns = out.graph.lookup_path(&["Foo"]).expect("namespace");
    assert_eq!(out.graph.get(ns).cheaders, vec!["foo/foo.h".to_string()]);
}

#[test]
fn repeated_package_halts_second_document() {
    let mut pipeline = Pipeline::new();
    pipeline
        .parse_document(
            r#"<repository version="1.2">
                 <package name="foo-1.0"/>
                 <namespace name="Foo"><class name="First" c:type="FooFirst"/></namespace>
               </repository>"#,
            "a.gir",
            None,
        )
        .expect("first document");
    pipeline
        .parse_document(
            r#"<repository version="1.2">
                 <package name="foo-1.0"/>
                 <namespace name="Foo"><class name="Second" c:type="FooSecond"/></namespace>
               </repository>"#,
            "b.gir",
            None,
        )
        .expect("second document halts silently");
    let out = pipeline.run();
    assert!(out.graph.lookup_path(&["Foo", "First"]).is_some());
    assert!(out.graph.lookup_path(&["Foo", "Second"]).is_none());
}

#[test]
fn second_document_extends_namespace() {
    let mut pipeline = Pipeline::new();
    pipeline
        .parse_document(
            r#"<repository version="1.2">
                 <namespace name="Foo"><class name="A" c:type="FooA"/></namespace>
               </repository>"#,
            "a.gir",
            None,
        )
        .expect("first document");
    pipeline
        .parse_document(
            r#"<repository version="1.2">
                 <namespace name="Foo"><class name="B" c:type="FooB"/></namespace>
               </repository>"#,
            "b.gir",
            None,
        )
        .expect("second document");
    let out = pipeline.run();
    assert!(out.graph.lookup_path(&["Foo", "A"]).is_some());
    assert!(out.graph.lookup_path(&["Foo", "B"]).is_some());
}

#[test]
fn reopened_class_is_marked_external() {
    let mut pipeline = Pipeline::new();
    pipeline
        .parse_document(
            r#"<repository version="1.2">
                 <namespace name="Foo">
                   <class name="A" c:type="FooA"/>
                   <class name="B" c:type="FooB"/>
                 </namespace>
               </repository>"#,
            "a.gir",
            None,
        )
        .expect("first document");
    pipeline
        .parse_document(
            r#"<repository version="1.2">
                 <namespace name="Foo">
                   <class name="A" c:type="FooA">
                     <method name="extra" c:identifier="foo_a_extra">
                       <return-value><type name="none"/></return-value>
                     </method>
                   </class>
                 </namespace>
               </repository>"#,
            "b.gir",
            None,
        )
        .expect("second document");
    let out = pipeline.run();
    let a = out.graph.lookup_path(&["Foo", "A"]).expect("reopened class");
    assert!(out.graph.get(a).external, "second file extends a foreign type");
    assert!(out.graph.lookup_path(&["Foo", "A", "extra"]).is_some());
    let b = out.graph.lookup_path(&["Foo", "B"]).expect("untouched class");
    assert!(!out.graph.get(b).external);
}

#[test]
fn namespace_rename_remaps_references() {
    let out = run_with(
        r#"
        <repository version="1.2">
          <namespace name="Foo">
            <class name="Base" c:type="FooBase"/>
            <class name="Derived" c:type="FooDerived" parent="Foo.Base"/>
          </namespace>
        </repository>"#,
        Some("Foo#namespace name=FooX\n"),
    );
    let derived = out.graph.lookup_path(&["FooX", "Derived"]).expect("renamed namespace");
    match &out.graph.get(derived).kind {
        SymbolKind::Class { base, .. } => {
            assert_eq!(base.as_ref().and_then(|b| b.dotted_base()).as_deref(), Some("FooX.Base"));
        }
        other => panic!("expected class, got {other:?}"),
    }
}

#[test]
fn opaque_pointer_alias_becomes_simple_struct() {
    let out = run(r#"
        <repository version="1.2">
          <namespace name="Foo">
            <alias name="Handle" c:type="FooHandle">
              <type c:type="gpointer"/>
            </alias>
          </namespace>
        </repository>"#);
    let handle = out.graph.lookup_path(&["Foo", "Handle"]).expect("alias");
    assert!(matches!(
        out.graph.get(handle).kind,
        SymbolKind::Struct {
            simple_type: true,
            ..
        }
    ));
}

#[test]
fn constant_carries_type_and_value() {
    let out = run(r#"
        <repository version="1.2">
          <namespace name="Foo">
            <constant name="MAX_DEPTH" value="32" c:type="FOO_MAX_DEPTH">
              <type name="gint"/>
            </constant>
          </namespace>
        </repository>"#);
    let c = out.graph.lookup_path(&["Foo", "MAX_DEPTH"]).expect("constant");
    match &out.graph.get(c).kind {
        SymbolKind::Constant { ty, value } => {
            assert_eq!(ty.base_name(), Some("int"));
            assert_eq!(value.as_deref(), Some("32"));
        }
        other => panic!("expected constant, got {other:?}"),
    }
}

#[test]
fn trailing_enum_suffix_is_stripped() {
    let out = run(r#"
        <repository version="1.2">
          <namespace name="Foo">
            <enumeration name="SortTypeEnum" c:type="FooSortType">
              <member name="asc" value="0" c:identifier="FOO_SORT_TYPE_ASC"/>
            </enumeration>
          </namespace>
        </repository>"#);
    assert!(out.graph.lookup_path(&["Foo", "SortType"]).is_some());
    assert!(out.graph.lookup_path(&["Foo", "SortTypeEnum"]).is_none());
}
