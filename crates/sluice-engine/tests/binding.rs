//! End-to-end binding tests driven from source text

use sluice_engine::binder::symbols::OpInvokeData;
use sluice_engine::binder::{GenExprKind, JsonDiagnostic};
use sluice_engine::{Binder, BinderConfig, Location, SymbolId, SymbolKind};

fn bind(source: &str) -> Binder {
    let mut binder = Binder::new(BinderConfig::default());
    binder.add_source("main.spl", source).unwrap();
    binder.bind();
    binder
}

fn codes(binder: &Binder) -> Vec<String> {
    binder
        .diagnostics()
        .iter()
        .filter_map(|d| d.code().map(str::to_string))
        .collect()
}

fn invokes_named(binder: &Binder, name: &str) -> Vec<SymbolId> {
    binder
        .table()
        .symbols()
        .filter(|(_, s)| s.name == name && matches!(s.kind, SymbolKind::OpInvoke(_)))
        .map(|(id, _)| id)
        .collect()
}

fn invoke_data(binder: &Binder, sym: SymbolId) -> &OpInvokeData {
    match &binder.table().symbol(sym).kind {
        SymbolKind::OpInvoke(data) => data,
        other => panic!("expected invocation, got {}", other.kind_name()),
    }
}

// ============================================================================
// End to end
// ============================================================================

const TWO_INSTANCES: &str = "namespace ns;
    type T = tuple<int32 a>;
    composite C(input stream<T> In; output stream<T> Out) {
        graph stream<T> Out = Functor(In) { }
    }
    composite Main {
        graph
            stream<T> Src = Beacon() { }
            stream<T> A = C(Src) { }
            stream<T> B = C(Src) { }
    }";

#[test]
fn test_composite_instantiated_twice() {
    let mut binder = bind(TWO_INSTANCES);
    assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));

    let def = binder.lookup_qualified("ns::C").unwrap();
    let instances = match &binder.table().symbol(def).kind {
        SymbolKind::CompositeDef(data) => data.instances.clone(),
        _ => panic!("expected composite"),
    };
    assert_eq!(instances.len(), 2);

    let functor = binder.lookup_qualified("spl.relational::Functor").unwrap();
    let mut inner_invokes = Vec::new();
    for &instance in &instances {
        let SymbolKind::CompositeInstance(data) = &binder.table().symbol(instance).kind else {
            panic!("expected instance");
        };
        assert_eq!(data.invokes.len(), 1);
        let invoke = data.invokes[0];
        assert_eq!(invoke_data(&binder, invoke).target, Some(functor));
        inner_invokes.push(invoke);
    }
    assert_ne!(inner_invokes[0], inner_invokes[1]);

    // each instance's In port sees the caller's stream type
    for &instance in &instances {
        let scope = binder.table().symbol(instance).held.unwrap();
        let port = binder.table().scope(scope).get("In").unwrap();
        let ty = binder.type_of(port);
        assert_eq!(binder.display_type(ty), "tuple<int32 a>");
    }
}

#[test]
fn test_inner_outputs_alias_caller_streams() {
    let binder = bind(TWO_INSTANCES);
    let outs = invokes_named(&binder, "Out");
    assert_eq!(outs.len(), 2);
    let mut full_names: Vec<String> = outs
        .iter()
        .map(|&o| {
            let stream = invoke_data(&binder, o).outputs[0].stream;
            match &binder.table().symbol(stream).kind {
                SymbolKind::Stream(data) => data.full_name.clone(),
                _ => String::new(),
            }
        })
        .collect();
    full_names.sort();
    assert_eq!(full_names, vec!["A", "B"]);
}

#[test]
fn test_rebinding_adds_nothing() {
    let mut binder = bind(TWO_INSTANCES);
    let t = binder.lookup_qualified("ns::T").unwrap();
    binder.type_of(t);
    binder.held_scope(t);
    let total = binder.stats().total();
    let symbols = binder.table().symbol_count();
    binder.type_of(t);
    binder.held_scope(t);
    assert_eq!(binder.stats().total(), total);
    assert_eq!(binder.table().symbol_count(), symbols);
    assert_eq!(binder.stats().runs(t), 1);
}

const DISTINCT_ACTUALS: &str = "namespace ns;
    type T = tuple<int32 a>;
    composite C(input stream<T> In; output stream<T> Out) {
        graph
            stream<T> Mid = Functor(In) { param filter: a > 0; }
            stream<T> Out = Functor(Mid) { }
    }
    composite Main {
        graph
            stream<T> S1 = Beacon() { }
            stream<T> S2 = Beacon() { }
            stream<T> A = C(S1) { }
            stream<T> B = C(S2) { }
    }";

fn stream_full_name(binder: &Binder, stream: SymbolId) -> String {
    match &binder.table().symbol(stream).kind {
        SymbolKind::Stream(data) => data.full_name.clone(),
        _ => String::new(),
    }
}

#[test]
fn test_instances_see_only_their_own_actuals() {
    let binder = bind(DISTINCT_ACTUALS);
    assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
    let mut seen = Vec::new();
    for caller in ["A", "B"] {
        let invoke = invokes_named(&binder, caller)[0];
        let instance = invoke_data(&binder, invoke).instance.unwrap();
        let SymbolKind::CompositeInstance(data) = &binder.table().symbol(instance).kind else {
            panic!("expected instance");
        };
        let port = data.input_ports[0];
        let SymbolKind::CompositeInputPort(port) = &binder.table().symbol(port).kind else {
            panic!("expected input port");
        };
        let names: Vec<&str> = port
            .streams
            .iter()
            .map(|&s| binder.table().symbol(s).name.as_str())
            .collect();
        seen.push(names);

        let mids: Vec<String> = data
            .invokes
            .iter()
            .flat_map(|&i| invoke_data(&binder, i).outputs.iter().map(|o| o.stream))
            .map(|stream| stream_full_name(&binder, stream))
            .collect();
        assert_eq!(mids, vec![format!("{}.Mid", caller), caller.to_string()]);
    }
    assert_eq!(seen, vec![vec!["S1"], vec!["S2"]]);
}

#[test]
fn test_invocation_host_pool_in_reused_composite() {
    let binder = bind(
        "type T = tuple<int32 a>;
         composite C(output stream<T> Out) {
            graph stream<T> Out = Beacon() {
                config hostPool: p = createPool(1, Sys.Exclusive);
                       placement: host(p);
            }
         }
         composite Main {
            graph
                stream<T> A = C() { }
                stream<T> B = C() { }
         }",
    );
    assert!(binder.diagnostics().with_code("E2001").next().is_none(), "{:?}", codes(&binder));
    assert!(binder.diagnostics().with_code("N2001").next().is_none(), "{:?}", codes(&binder));
    let c = binder.lookup_qualified("C").unwrap();
    let SymbolKind::CompositeDef(def) = &binder.table().symbol(c).kind else {
        panic!("expected composite");
    };
    assert_eq!(def.instances.len(), 2);
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn test_inner_declaration_shadows_outer() {
    let mut binder = bind(
        "type x = int32;
         rstring f(rstring x) { return x; }",
    );
    assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
    let f = binder.lookup_qualified("f").unwrap();
    let formal = match &binder.table().symbol(f).kind {
        SymbolKind::FunctionHead(data) => data.formals[0],
        _ => panic!("expected function"),
    };
    let ty = binder.type_of(formal);
    assert_eq!(binder.display_type(ty), "rstring");
}

#[test]
fn test_mutual_types_terminate() {
    let mut binder = bind("type A = B; type B = A; type C = tuple<A a>;");
    assert_eq!(binder.diagnostics().with_code("E2005").count(), 1);
    let c = binder.lookup_qualified("C").unwrap();
    binder.type_of(c);
    assert_eq!(binder.diagnostics().with_code("E2005").count(), 1);
}

// ============================================================================
// Duplicates
// ============================================================================

#[test]
fn test_duplicate_has_both_locations() {
    let binder = bind("type T = int32;\ntype T = int64;");
    let duplicates: Vec<_> = binder.diagnostics().with_code("E2001").collect();
    assert_eq!(duplicates.len(), 1);

    let json = JsonDiagnostic::from_diagnostic(duplicates[0], binder.files());
    assert_eq!(json.labels.len(), 2);
    let primary = json.labels.iter().find(|l| l.style == "primary").unwrap();
    let secondary = json.labels.iter().find(|l| l.style == "secondary").unwrap();
    assert_eq!(primary.start_line, 2);
    assert_eq!(secondary.start_line, 1);
    assert_eq!(primary.file, "main.spl");
}

#[test]
fn test_same_name_in_different_domains() {
    let binder = bind(
        "type A = tuple<int32 a>;
         type B = tuple<int32 a>;
         int32 a(int32 b) { return b; }",
    );
    assert!(binder.diagnostics().is_empty(), "{:?}", codes(&binder));
}

#[test]
fn test_diagnostics_render_as_json() {
    let binder = bind("type T = Missing;");
    let json = binder.diagnostics().to_json(binder.files()).unwrap();
    let parsed: Vec<JsonDiagnostic> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].code.as_deref(), Some("E2006"));
    assert_eq!(parsed[0].severity, "error");
}

// ============================================================================
// Indirect references
// ============================================================================

const STREAMS: &str = "type T = tuple<int32 a, rstring b>;
    type V = tuple<rstring a>;";

fn attribute_in(binder: &Binder, invoke: &str, name: &str) -> SymbolId {
    let sym = invokes_named(binder, invoke)[0];
    let scope = invoke_data(binder, sym).expr_scope.unwrap();
    binder.table().scope(scope).get(name).unwrap()
}

#[test]
fn test_streams_on_one_port_merge() {
    let mut binder = bind(&format!(
        "{}
         composite Main {{
            graph
                stream<T> L = Beacon() {{ }}
                stream<T> R = Beacon() {{ }}
                stream<T> M = Functor(L, R) {{ param filter: a > 0; }}
         }}",
        STREAMS
    ));
    assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
    let a = attribute_in(&binder, "M", "a");
    let ty = binder.type_of(a);
    assert_eq!(binder.display_type(ty), "int32");
    let expr = binder.gen_expression(a, Location::INTRINSIC).unwrap();
    assert_eq!(
        expr.kind,
        GenExprKind::Attribute {
            base: Box::new(GenExprKind::InputTuple { port: 0 }),
            name: "a".into(),
        }
    );
}

#[test]
fn test_streams_on_two_ports_have_no_expression() {
    let mut binder = bind(&format!(
        "{}
         composite Main {{
            graph
                stream<T> L = Beacon() {{ }}
                stream<T> R = Beacon() {{ }}
                stream<T> J = Join(L; R) {{ param match: b == \"x\"; }}
         }}",
        STREAMS
    ));
    assert!(!binder.diagnostics().has_errors(), "{:?}", codes(&binder));
    let b = attribute_in(&binder, "J", "b");
    let ty = binder.type_of(b);
    assert_eq!(binder.display_type(ty), "rstring");
    assert!(binder.gen_expression(b, Location::INTRINSIC).is_none());
}

#[test]
fn test_conflicting_types_are_ambiguous() {
    let mut binder = bind(&format!(
        "{}
         composite Main {{
            graph
                stream<T> L = Beacon() {{ }}
                stream<V> R = Beacon() {{ }}
                stream<T> J = Join(L; R) {{ param match: a == b; }}
         }}",
        STREAMS
    ));
    assert_eq!(binder.diagnostics().with_code("E2008").count(), 1);
    let a = attribute_in(&binder, "J", "a");
    let ty = binder.type_of(a);
    assert!(binder.types().is_unknown(ty));
}

// ============================================================================
// Syntax-only mode
// ============================================================================

#[test]
fn test_syntax_only_downgrades_duplicate_clauses() {
    let source = "type T = tuple<int32 a>;
        composite Main {
            graph
                stream<T> S = Beacon() { param period: 1.0; period: 2.0; }
        }";
    let strict = bind(source);
    assert_eq!(strict.diagnostics().error_count(), 1);

    let mut lenient = Binder::new(BinderConfig {
        syntax_only: true,
        ..BinderConfig::default()
    });
    lenient.add_source("main.spl", source).unwrap();
    lenient.bind();
    assert_eq!(lenient.diagnostics().error_count(), 0);
    assert_eq!(lenient.diagnostics().warning_count(), 1);
}
