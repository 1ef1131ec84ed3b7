use fixtures::{SERVICE_FILE, all_files};
use rpcbridge_core::Registry;
use rpcbridge_core::descriptor::{BindingRule, Body, Method, ResolveError};

mod fixtures;

fn setup() -> (Registry, Method) {
    let mut registry = Registry::new();
    registry
        .load(all_files(), &[SERVICE_FILE.to_string()])
        .expect("fixtures should load");

    let method = registry.lookup_file(SERVICE_FILE).unwrap().services[0].methods[0].clone();
    (registry, method)
}

#[test]
fn test_resolve_nested_path() {
    let (registry, _) = setup();
    let outer = registry.lookup_message("", ".acme.v1.Outer").unwrap();

    let path = registry
        .resolve_field_path(outer, "inner.leaf.name", false)
        .unwrap();

    let names: Vec<_> = path.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["inner", "leaf", "name"]);
    assert_eq!(path.to_string(), "inner.leaf.name");
    assert!(path.is_nested());

    let owners: Vec<_> = path.iter().map(|c| c.target.message.as_str()).collect();
    assert_eq!(
        owners,
        vec![".acme.v1.Outer", ".acme.v1.Outer.Inner", ".acme.v1.Leaf"]
    );
}

#[test]
fn test_resolution_is_associative_over_hops() {
    let (registry, _) = setup();
    let outer = registry.lookup_message("", ".acme.v1.Outer").unwrap();
    let inner = registry.lookup_message("", ".acme.v1.Outer.Inner").unwrap();
    let leaf = registry.lookup_message("", ".acme.v1.Leaf").unwrap();

    let full = registry.resolve_field_path(outer, "inner.leaf.name", false).unwrap();
    let tail = registry.resolve_field_path(inner, "leaf.name", false).unwrap();
    let last = registry.resolve_field_path(leaf, "name", false).unwrap();

    assert_eq!(full.terminal(), tail.terminal());
    assert_eq!(tail.terminal(), last.terminal());
    assert_eq!(full.terminal().unwrap().message, ".acme.v1.Leaf");
}

#[test]
fn test_empty_path_resolves_to_empty_trail() {
    let (registry, _) = setup();
    let outer = registry.lookup_message("", ".acme.v1.Outer").unwrap();

    let path = registry.resolve_field_path(outer, "", true).unwrap();
    assert!(path.is_empty());
    assert!(path.terminal().is_none());
}

#[test]
fn test_non_aggregate_hop_is_an_error() {
    let (registry, _) = setup();
    let outer = registry.lookup_message("", ".acme.v1.Outer").unwrap();

    for (path, field) in [("count.value", "count"), ("inner.value.x", "value")] {
        let err = registry.resolve_field_path(outer, path, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("not an aggregate type: {field} in {path}")
        );
    }
}

#[test]
fn test_unknown_field_names_path_and_root() {
    let (registry, _) = setup();
    let outer = registry.lookup_message("", ".acme.v1.Outer").unwrap();

    let err = registry.resolve_field_path(outer, "inner.nope", false).unwrap_err();
    assert!(matches!(err, ResolveError::FieldNotFound { .. }));
    assert_eq!(err.to_string(), r#"no field "inner.nope" found in Outer"#);
}

#[test]
fn test_path_parameters() {
    let (registry, method) = setup();

    let id = registry.new_param(&method, "id").unwrap();
    assert_eq!(id.target.name(), "id");
    assert_eq!(id.method, "Lookup.Get");

    let count = registry.new_param(&method, "outer.count").unwrap();
    assert_eq!(count.field_path.len(), 2);

    // Well-known wrappers are allowed despite being messages.
    let limit = registry.new_param(&method, "outer.limit").unwrap();
    assert_eq!(limit.target.type_name(), ".google.protobuf.Int32Value");

    let err = registry.new_param(&method, "outer.leaf").unwrap_err();
    assert!(matches!(err, ResolveError::InvalidPathParameterType { .. }));
    assert!(err.to_string().starts_with("Lookup.Get: outer.leaf is a protobuf message type"));

    let err = registry.new_param(&method, "outer.nickname").unwrap_err();
    assert_eq!(
        err.to_string(),
        "optional field not allowed in field path: nickname in outer.nickname"
    );

    let err = registry.new_param(&method, "").unwrap_err();
    assert!(matches!(err, ResolveError::EmptyFieldPath(_)));
}

#[test]
fn test_body_keeps_three_cases_apart() {
    let (registry, method) = setup();

    assert_eq!(registry.new_body(&method, "").unwrap(), Body::None);
    assert_eq!(registry.new_body(&method, "*").unwrap(), Body::WholeMessage);

    // Optional fields are fine outside path parameters.
    let Body::Field(path) = registry.new_body(&method, "outer.nickname").unwrap() else {
        panic!("expected a field binding");
    };
    assert_eq!(path.to_string(), "outer.nickname");

    assert_eq!(registry.new_response(&method, "*").unwrap(), Body::WholeMessage);
    assert!(matches!(
        registry.new_response(&method, "name").unwrap(),
        Body::Field(ref p) if p.len() == 1
    ));

    let err = registry.new_response(&method, "nope").unwrap_err();
    assert_eq!(err.to_string(), r#"no field "nope" found in Leaf"#);
}

#[test]
fn test_new_binding() {
    let (registry, method) = setup();
    let rule = BindingRule {
        path_params: vec!["id".to_string(), "outer.inner.value".to_string()],
        body: "outer".to_string(),
        response_body: String::new(),
    };

    let binding = registry.new_binding(&method, &rule).unwrap();
    assert_eq!(binding.method, "Lookup.Get");
    assert_eq!(binding.path_params.len(), 2);
    assert_eq!(binding.path_params[1].field_path.to_string(), "outer.inner.value");
    assert!(matches!(binding.body, Body::Field(ref p) if p.len() == 1));
    assert_eq!(binding.response_body, Body::None);

    let bad = BindingRule {
        path_params: vec!["outer".to_string()],
        ..Default::default()
    };
    assert!(registry.new_binding(&method, &bad).is_err());
}
