//! End-to-end runs through the public [`Pipeline`] API: multiple
//! documents, override files and the full reconciliation pass.

use girsym::{Config, Pipeline, SymbolKind};

const FOO_GIR: &str = r#"
<repository version="1.2">
  <include name="GLib" version="2.0"/>
  <package name="foo-1.0"/>
  <c:include name="foo/foo.h"/>
  <namespace name="Foo" version="1.0" c:identifier-prefixes="Foo"
             c:symbol-prefixes="foo">
    <enumeration name="Quality">
      <member name="low" c:identifier="FOO_QUALITY_LOW" value="0"/>
      <member name="high" c:identifier="FOO_QUALITY_HIGH" value="1"/>
    </enumeration>
    <class name="Widget" c:type="FooWidget" parent="GLib.Object"
           glib:get-type="foo_widget_get_type">
      <method name="get_quality" c:identifier="foo_widget_get_quality">
        <return-value><type name="Quality"/></return-value>
      </method>
      <method name="set_quality" c:identifier="foo_widget_set_quality">
        <return-value><type name="none"/></return-value>
        <parameters>
          <parameter name="quality"><type name="Quality"/></parameter>
        </parameters>
      </method>
      <property name="quality" readable="1" writable="1">
        <type name="Quality"/>
      </property>
      <glib:signal name="refreshed">
        <return-value><type name="none"/></return-value>
      </glib:signal>
      <method name="refreshed" c:identifier="foo_widget_refreshed">
        <return-value><type name="none"/></return-value>
      </method>
      <method name="render_async" c:identifier="foo_widget_render_async">
        <return-value><type name="none"/></return-value>
        <parameters>
          <parameter name="callback" scope="async" closure="1">
            <type name="Gio.AsyncReadyCallback"/>
          </parameter>
          <parameter name="user_data"><type name="gpointer"/></parameter>
        </parameters>
      </method>
      <method name="render_finish" c:identifier="foo_widget_render_finish" throws="1">
        <return-value><type name="gboolean"/></return-value>
        <parameters>
          <parameter name="result"><type name="Gio.AsyncResult"/></parameter>
        </parameters>
      </method>
    </class>
    <function name="widget_default" c:identifier="foo_widget_default">
      <return-value><type name="Widget"/></return-value>
    </function>
    <class name="Legacy" c:type="FooLegacy"/>
  </namespace>
</repository>"#;

const FOO_METADATA: &str = "Legacy hidden\nWidget.set_quality#method skip\n";

const BAR_GIR: &str = r#"
<repository version="1.2">
  <include name="Foo" version="1.0"/>
  <package name="bar-1.0"/>
  <namespace name="Bar" version="1.0" c:identifier-prefixes="Bar">
    <class name="Window" c:type="BarWindow" parent="Foo.Widget"/>
    <interface name="Paintable" c:type="BarPaintable"/>
  </namespace>
</repository>"#;

fn run_both(config: Config) -> girsym::PipelineOutput {
    let mut pipeline = Pipeline::with_config(config);
    pipeline
        .parse_document(FOO_GIR, "Foo-1.0.gir", Some((FOO_METADATA, "Foo-1.0.metadata")))
        .expect("first document walks");
    pipeline
        .parse_document(BAR_GIR, "Bar-1.0.gir", None)
        .expect("second document walks");
    pipeline.run()
}

#[test]
fn two_documents_build_one_graph() {
    let out = run_both(Config::default());
    assert_eq!(out.error_count, 0, "diagnostics: {:?}", out.diagnostics);
    assert_eq!(out.warning_count, 0, "every override rule matched");

    assert_eq!(out.packages, ["foo-1.0", "bar-1.0"]);
    assert!(out.dependencies.contains(&"GLib-2.0".to_string()));
    assert!(out.dependencies.contains(&"Foo-1.0".to_string()));

    let window = out.graph.lookup_path(&["Bar", "Window"]).expect("class");
    match &out.graph.get(window).kind {
        SymbolKind::Class { base, .. } => {
            assert_eq!(
                base.as_ref().and_then(|b| b.dotted_base()).as_deref(),
                Some("Foo.Widget")
            );
        }
        other => panic!("expected class, got {other:?}"),
    }
}

#[test]
fn overrides_hide_and_skip() {
    let out = run_both(Config::default());
    assert!(out.graph.lookup_path(&["Foo", "Widget", "set_quality"]).is_none());
    let legacy = out.graph.lookup_path(&["Foo", "Legacy"]);
    assert!(legacy.is_none(), "hidden symbols never attach");
}

#[test]
fn reconciliation_shapes_the_widget() {
    let out = run_both(Config::default());

    // set_quality was skipped, so the property keeps plain accessors.
    let quality = out
        .graph
        .lookup_path(&["Foo", "Widget", "quality"])
        .expect("property");
    assert!(matches!(
        out.graph.get(quality).kind,
        SymbolKind::Property {
            accessor_methods: false,
            ..
        }
    ));

    let refreshed = out
        .graph
        .lookup_path(&["Foo", "Widget", "refreshed"])
        .expect("signal");
    assert!(matches!(
        out.graph.get(refreshed).kind,
        SymbolKind::Signal {
            has_emitter: true,
            ..
        }
    ));

    let render = out
        .graph
        .lookup_path(&["Foo", "Widget", "render_async"])
        .expect("coroutine");
    match &out.graph.get(render).kind {
        SymbolKind::Method {
            coroutine,
            signature,
            ..
        } => {
            assert!(*coroutine);
            assert!(signature.throws);
            assert_eq!(signature.return_type.base_name(), Some("bool"));
        }
        other => panic!("expected method, got {other:?}"),
    }
    assert!(out.graph.lookup_path(&["Foo", "Widget", "render_finish"]).is_none());

    // foo_widget_default re-homes onto Widget by C-name prefix.
    let default = out
        .graph
        .lookup_path(&["Foo", "Widget", "default"])
        .expect("re-homed function");
    assert!(matches!(
        out.graph.get(default).kind,
        SymbolKind::Method { .. }
    ));
    assert!(out.graph.lookup_path(&["Foo", "widget_default"]).is_none());
}

#[test]
fn enum_members_share_a_derived_prefix() {
    let out = run_both(Config::default());
    let quality = out.graph.lookup_path(&["Foo", "Quality"]).expect("enum");
    assert!(matches!(out.graph.get(quality).kind, SymbolKind::Enum { .. }));
    assert_eq!(out.graph.get(quality).cprefix.as_deref(), Some("FOO_QUALITY_"));
    let low = out.graph.lookup_path(&["Foo", "Quality", "low"]).expect("member");
    assert!(matches!(
        out.graph.get(low).kind,
        SymbolKind::EnumValue { value: Some(ref v) } if v == "0"
    ));
}

#[test]
fn configured_base_type_feeds_interface_prerequisites() {
    let out = run_both(Config {
        object_base_type: "GObject.Object".into(),
    });
    let paintable = out
        .graph
        .lookup_path(&["Bar", "Paintable"])
        .expect("interface");
    match &out.graph.get(paintable).kind {
        SymbolKind::Interface { prerequisites, .. } => {
            assert_eq!(prerequisites.len(), 1);
            assert_eq!(
                prerequisites[0].dotted_base().as_deref(),
                Some("GObject.Object")
            );
        }
        other => panic!("expected interface, got {other:?}"),
    }
}
