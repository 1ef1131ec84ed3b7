//! Hand-built schema files shared by the registry and field-path tests.
#![allow(dead_code)]

use rpcbridge_core::prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    MethodDescriptorProto, OneofDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};

pub const TYPES_FILE: &str = "acme/v1/types.proto";
pub const SERVICE_FILE: &str = "acme/v1/service.proto";
pub const REMOTE_FILE: &str = "other/v1/remote.proto";
pub const WRAPPERS_FILE: &str = "google/protobuf/wrappers.proto";

pub fn field(name: &str, number: i32, ty: Type, type_name: Option<&str>) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        type_name: type_name.map(str::to_string),
        ..Default::default()
    }
}

pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

pub fn enumeration(name: &str) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

pub fn file(name: &str, package: &str, messages: Vec<DescriptorProto>) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: (!package.is_empty()).then(|| package.to_string()),
        message_type: messages,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

pub fn unary(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

pub fn service(name: &str, methods: Vec<MethodDescriptorProto>) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: methods,
        ..Default::default()
    }
}

pub fn wrappers_file() -> FileDescriptorProto {
    file(
        WRAPPERS_FILE,
        "google.protobuf",
        vec![
            message("Int32Value", vec![field("value", 1, Type::Int32, None)]),
            message("StringValue", vec![field("value", 1, Type::String, None)]),
        ],
    )
}

/// `acme.v1` types:
///
/// ```proto
/// message Outer {
///   message Inner {
///     string value = 1;
///     Leaf leaf = 2;           // relative, resolves to .acme.v1.Leaf
///     repeated string tags = 3;
///   }
///   enum Kind { KIND_UNSPECIFIED = 0; }
///   Inner inner = 1;
///   int32 count = 2;
///   optional string nickname = 3;
///   google.protobuf.Int32Value limit = 4;
///   Leaf leaf = 5;
///   Kind kind = 6;
/// }
/// message Leaf { string name = 1; int64 id = 2; }
/// enum Color { COLOR_UNSPECIFIED = 0; }
/// ```
pub fn types_file() -> FileDescriptorProto {
    let mut tags = field("tags", 3, Type::String, None);
    tags.label = Some(Label::Repeated as i32);

    let inner = message(
        "Inner",
        vec![
            field("value", 1, Type::String, None),
            field("leaf", 2, Type::Message, Some("Leaf")),
            tags,
        ],
    );

    let mut nickname = field("nickname", 3, Type::String, None);
    nickname.proto3_optional = Some(true);
    nickname.oneof_index = Some(0);

    let mut outer = message(
        "Outer",
        vec![
            field("inner", 1, Type::Message, Some(".acme.v1.Outer.Inner")),
            field("count", 2, Type::Int32, None),
            nickname,
            field("limit", 4, Type::Message, Some(".google.protobuf.Int32Value")),
            field("leaf", 5, Type::Message, Some(".acme.v1.Leaf")),
            field("kind", 6, Type::Enum, Some(".acme.v1.Outer.Kind")),
        ],
    );
    outer.nested_type = vec![inner];
    outer.enum_type = vec![enumeration("Kind")];
    outer.oneof_decl = vec![OneofDescriptorProto {
        name: Some("_nickname".to_string()),
        ..Default::default()
    }];

    let leaf = message(
        "Leaf",
        vec![
            field("name", 1, Type::String, None),
            field("id", 2, Type::Int64, None),
        ],
    );

    let mut types = file(TYPES_FILE, "acme.v1", vec![outer, leaf]);
    types.dependency = vec![WRAPPERS_FILE.to_string()];
    types.enum_type = vec![enumeration("Color")];
    types
}

/// `acme.v1` services, referencing types from two other files:
///
/// ```proto
/// message GetRequest { Outer outer = 1; string id = 2; other.v1.Remote remote = 3; }
/// service Lookup { rpc Get(GetRequest) returns (Leaf); }
/// service Idle {}
/// ```
pub fn service_file() -> FileDescriptorProto {
    let request = message(
        "GetRequest",
        vec![
            field("outer", 1, Type::Message, Some("Outer")),
            field("id", 2, Type::String, None),
            field("remote", 3, Type::Message, Some(".other.v1.Remote")),
        ],
    );

    let mut services = file(SERVICE_FILE, "acme.v1", vec![request]);
    services.dependency = vec![TYPES_FILE.to_string(), REMOTE_FILE.to_string()];
    services.service = vec![
        service("Lookup", vec![unary("Get", "GetRequest", "Leaf")]),
        service("Idle", vec![]),
    ];
    services
}

/// `other.v1`: `message Remote { string token = 1; }`
pub fn remote_file() -> FileDescriptorProto {
    file(
        REMOTE_FILE,
        "other.v1",
        vec![message("Remote", vec![field("token", 1, Type::String, None)])],
    )
}

/// Every fixture file, with the one the services depend on last.
pub fn all_files() -> Vec<FileDescriptorProto> {
    vec![wrappers_file(), types_file(), service_file(), remote_file()]
}
