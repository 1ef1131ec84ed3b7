use fixtures::{REMOTE_FILE, SERVICE_FILE, TYPES_FILE, all_files, file, message, service, unary};
use rpcbridge_core::Registry;
use rpcbridge_core::descriptor::{RegistryError, ResolveError};
use rpcbridge_core::prost_types::compiler::CodeGeneratorRequest;

mod fixtures;

fn load(targets: &[&str]) -> Registry {
    let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
    let mut registry = Registry::new();
    registry
        .load(all_files(), &targets)
        .expect("fixtures should load");
    registry
}

#[test]
fn test_services_resolve_across_files_in_any_order() {
    // remote.proto is registered after service.proto, which references it.
    let registry = load(&[SERVICE_FILE]);

    let file = registry.lookup_file(SERVICE_FILE).unwrap();
    assert_eq!(file.services.len(), 1, "the method-less service is dropped");

    let service = &file.services[0];
    assert_eq!(service.name(), "Lookup");
    assert_eq!(service.full_name(), "acme.v1.Lookup");

    let method = &service.methods[0];
    assert_eq!(method.request_type, ".acme.v1.GetRequest");
    assert_eq!(method.response_type, ".acme.v1.Leaf");
    assert_eq!(method.jsonrpc_name(), "Lookup.Get");
    assert_eq!(method.grpc_path(), "/acme.v1.Lookup/Get");
    assert!(!method.is_streaming());

    let request = registry.request_message(method).unwrap();
    let remote = request.field("remote").unwrap();
    assert_eq!(
        registry.lookup_message(&request.fqmn(), remote.type_name()).unwrap().file,
        REMOTE_FILE
    );

    let targets: Vec<_> = registry.files_to_generate().map(|f| f.name()).collect();
    assert_eq!(targets, vec![SERVICE_FILE]);
}

#[test]
fn test_services_are_only_loaded_for_targets() {
    let registry = load(&[TYPES_FILE]);

    assert!(registry.lookup_file(SERVICE_FILE).unwrap().services.is_empty());
    assert!(registry.lookup_message("", ".acme.v1.GetRequest").is_ok());
}

#[test]
fn test_absolute_names_resolve_from_any_scope() {
    let registry = load(&[]);
    let scopes = ["", "acme", ".acme.v1.Outer.Inner", "other.v1", "x.y.z"];

    let fqmns = registry.all_fqmns();
    assert!(fqmns.contains(&".acme.v1.Outer.Inner"));
    for fqmn in fqmns {
        for scope in scopes {
            let found = registry.lookup_message(scope, fqmn).unwrap();
            assert_eq!(found.fqmn(), fqmn);
        }
    }

    let fqens = registry.all_fqens();
    assert!(fqens.contains(&".acme.v1.Outer.Kind"));
    assert!(fqens.contains(&".acme.v1.Color"));
    for fqen in fqens {
        for scope in scopes {
            assert_eq!(registry.lookup_enum(scope, fqen).unwrap().fqen(), fqen);
        }
    }
}

#[test]
fn test_relative_names_resolve_from_enclosing_scopes() {
    let registry = load(&[]);

    // Innermost scope outwards.
    let leaf = registry.lookup_message(".acme.v1.Outer.Inner", "Leaf").unwrap();
    assert_eq!(leaf.fqmn(), ".acme.v1.Leaf");

    for scope in ["acme.v1.Outer", "acme.v1.Outer.Inner", ".acme.v1.Outer.Inner"] {
        let inner = registry.lookup_message(scope, "Inner").unwrap();
        assert_eq!(inner.fqmn(), ".acme.v1.Outer.Inner");
    }
    assert_eq!(
        registry.lookup_message("acme.v1", "Outer.Inner").unwrap().fqmn(),
        ".acme.v1.Outer.Inner"
    );

    // Once the scope no longer encloses the name, lookup fails.
    assert!(matches!(
        registry.lookup_message("acme", "Inner"),
        Err(RegistryError::MessageNotFound(name)) if name == "Inner"
    ));
    assert!(registry.lookup_message("other.v1", "Leaf").is_err());

    assert!(registry.lookup_enum("acme.v1.Outer.Inner", "Kind").is_ok());
    assert!(matches!(
        registry.lookup_enum("acme.v1", "Kind"),
        Err(RegistryError::EnumNotFound(_))
    ));
}

#[test]
fn test_unresolved_method_type_aborts_the_file() {
    let mut broken = file("broken.proto", "acme.v1", vec![message("Req", vec![])]);
    broken.service = vec![service("Broken", vec![unary("Do", "Req", "Missing")])];

    let mut registry = Registry::new();
    let err = registry
        .load(vec![broken], &["broken.proto".to_string()])
        .unwrap_err();

    match err {
        ResolveError::UnresolvedMethodType {
            service,
            method,
            role,
            type_name,
            ..
        } => {
            assert_eq!(service, "Broken");
            assert_eq!(method, "Do");
            assert_eq!(role, "output");
            assert_eq!(type_name, "Missing");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_target_file() {
    let mut registry = Registry::new();
    let err = registry
        .load(all_files(), &["nope.proto".to_string()])
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Registry(RegistryError::FileNotFound(path)) if path == "nope.proto"
    ));
}

#[test]
fn test_load_from_request() {
    let request = CodeGeneratorRequest {
        file_to_generate: vec![SERVICE_FILE.to_string()],
        proto_file: all_files(),
        ..Default::default()
    };

    let mut registry = Registry::new();
    registry.load_from_request(&request).unwrap();

    assert_eq!(registry.files_to_generate().count(), 1);
    assert_eq!(
        registry.lookup_file(SERVICE_FILE).unwrap().services[0].methods.len(),
        1
    );
}

#[test]
fn test_alias_reservation() {
    let mut registry = Registry::new();

    registry.reserve_alias("pb", "/a/pb").unwrap();
    registry.reserve_alias("pb", "/a/pb").unwrap();

    let err = registry.reserve_alias("pb", "/b/pb").unwrap_err();
    assert_eq!(err.alias, "pb");
    assert_eq!(err.taken, "/a/pb");
    assert_eq!(registry.alias_path("pb"), Some("/a/pb"));
}

#[test]
fn test_packages_sharing_a_name_get_distinct_aliases() {
    let mut registry = Registry::new();

    assert_eq!(registry.allocate_alias("pb", "/a/pb"), "pb");
    assert_eq!(registry.allocate_alias("pb", "/b/pb"), "pb_0");
    assert_eq!(registry.allocate_alias("pb", "/c/pb"), "pb_1");

    // Stable on repeated allocation.
    assert_eq!(registry.allocate_alias("pb", "/b/pb"), "pb_0");
    assert_eq!(registry.allocate_alias("pb", "/a/pb"), "pb");

    assert_eq!(registry.alias_path("pb"), Some("/a/pb"));
    assert_eq!(registry.alias_path("pb_0"), Some("/b/pb"));
    assert_eq!(registry.alias_path("pb_1"), Some("/c/pb"));
}

#[test]
fn test_loaded_files_get_unique_package_identifiers() {
    let first = file("a/pb/x.proto", "a.pb", vec![message("X", vec![])]);
    let second = file("b/pb/y.proto", "b.pb", vec![message("Y", vec![])]);
    let third = file("a/pb/z.proto", "a.pb", vec![message("Z", vec![])]);

    let mut registry = Registry::new();
    registry.load(vec![first, second, third], &[]).unwrap();

    let package = |path: &str| registry.lookup_file(path).unwrap().package.clone();

    assert_eq!(package("a/pb/x.proto").path, "a::pb");
    assert_eq!(package("a/pb/x.proto").identifier(), "pb");
    assert_eq!(package("b/pb/y.proto").path, "b::pb");
    assert_eq!(package("b/pb/y.proto").identifier(), "pb_0");
    assert_eq!(package("a/pb/z.proto").identifier(), "pb");
}

#[test]
fn test_package_map_prefix_and_standalone() {
    let mut registry = Registry::new();
    registry.add_package_map(TYPES_FILE, "acme_types");
    registry.set_prefix("gen");
    assert!(!registry.is_standalone());
    registry.set_standalone(true);
    assert!(registry.is_standalone());
    registry
        .load(vec![file("bare.proto", "", vec![]), fixtures::types_file()], &[])
        .unwrap();

    let types = &registry.lookup_file(TYPES_FILE).unwrap().package;
    assert_eq!(types.path, "gen::acme_types");
    assert_eq!(types.name, "acme_types");
    assert_eq!(types.identifier(), "extAcme_types");

    let bare = registry.lookup_file("bare.proto").unwrap();
    assert_eq!(bare.package.path, "gen::bare");
    assert_eq!(bare.package.identifier(), "extBare");
    assert_eq!(bare.generated_filename_prefix, "bare");
}

#[test]
fn test_settings() {
    let mut registry = load(&[]);
    assert_eq!(registry.recursive_depth(), 1000);
    registry.set_recursive_depth(8);
    assert_eq!(registry.recursive_depth(), 8);

    let mut field = registry
        .lookup_message("", ".acme.v1.Outer")
        .unwrap()
        .field("count")
        .unwrap()
        .clone();
    field.proto.json_name = Some("theCount".to_string());

    assert_eq!(registry.field_name(&field), "count");
    registry.set_use_json_names_for_fields(true);
    assert_eq!(registry.field_name(&field), "theCount");
}

#[test]
fn test_file_keeps_declaration_order_of_nested_types() {
    let registry = load(&[]);
    let types = registry.lookup_file(TYPES_FILE).unwrap();

    assert_eq!(
        types.messages,
        vec![".acme.v1.Outer", ".acme.v1.Outer.Inner", ".acme.v1.Leaf"]
    );
    assert_eq!(types.enums, vec![".acme.v1.Outer.Kind", ".acme.v1.Color"]);

    let inner = registry.lookup_message("", ".acme.v1.Outer.Inner").unwrap();
    assert_eq!(inner.outers, vec!["Outer".to_string()]);
    assert_eq!(inner.file, TYPES_FILE);
}

#[test]
fn test_map_fields_are_told_apart_from_repeated_messages() {
    use rpcbridge_core::prost_types::{
        MessageOptions,
        field_descriptor_proto::{Label, Type},
    };

    let mut entry = message(
        "LabelsEntry",
        vec![
            fixtures::field("key", 1, Type::String, None),
            fixtures::field("value", 2, Type::String, None),
        ],
    );
    entry.options = Some(MessageOptions {
        map_entry: Some(true),
        ..Default::default()
    });

    let mut labels = fixtures::field("labels", 1, Type::Message, Some("LabelsEntry"));
    labels.label = Some(Label::Repeated as i32);
    let mut items = fixtures::field("items", 2, Type::Message, Some(".tags.Item"));
    items.label = Some(Label::Repeated as i32);
    let single = fixtures::field("single", 3, Type::Message, Some(".tags.Item"));

    let mut tagged = message("Tagged", vec![labels, items, single]);
    tagged.nested_type.push(entry);

    let mut registry = Registry::new();
    registry
        .load(
            vec![file("tags.proto", "tags", vec![tagged, message("Item", vec![])])],
            &[],
        )
        .unwrap();

    let tagged = registry.lookup_message("", ".tags.Tagged").unwrap();
    assert!(registry.is_map_field(tagged.field("labels").unwrap()));
    assert!(!registry.is_map_field(tagged.field("items").unwrap()));
    assert!(!registry.is_map_field(tagged.field("single").unwrap()));
}
