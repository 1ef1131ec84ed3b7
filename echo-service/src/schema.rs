use prost_reflect::{DescriptorError, DescriptorPool};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MethodDescriptorProto, OneofDescriptorProto,
    ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};

pub const ECHO_FILE: &str = "echo/v1/echo.proto";
pub const WRAPPERS_FILE: &str = "google/protobuf/wrappers.proto";

/// Both schema files, dependencies first.
pub fn file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![wrappers_file(), echo_file()],
    }
}

pub fn descriptor_pool() -> Result<DescriptorPool, DescriptorError> {
    DescriptorPool::from_file_descriptor_set(file_descriptor_set())
}

/// The subset of `google/protobuf/wrappers.proto` the echo schema uses.
pub fn wrappers_file() -> FileDescriptorProto {
    let wrapper = |name: &str, ty: Type| DescriptorProto {
        name: Some(name.to_string()),
        field: vec![field("value", 1, ty, None)],
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some(WRAPPERS_FILE.to_string()),
        package: Some("google.protobuf".to_string()),
        message_type: vec![
            wrapper("StringValue", Type::String),
            wrapper("Int32Value", Type::Int32),
        ],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

pub fn echo_file() -> FileDescriptorProto {
    let meta = DescriptorProto {
        name: Some("Meta".to_string()),
        field: vec![
            field("trace_id", 1, Type::String, None),
            field("mood", 2, Type::Enum, Some(".echo.v1.Mood")),
        ],
        ..Default::default()
    };

    let mut note = field("note", 4, Type::String, None);
    note.proto3_optional = Some(true);
    note.oneof_index = Some(0);

    let request = DescriptorProto {
        name: Some("EchoRequest".to_string()),
        field: vec![
            field("message", 1, Type::String, None),
            field("delay_ms", 2, Type::Int32, None),
            field("meta", 3, Type::Message, Some(".echo.v1.EchoRequest.Meta")),
            note,
            field("label", 5, Type::Message, Some(".google.protobuf.StringValue")),
        ],
        nested_type: vec![meta],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("_note".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };

    let response = DescriptorProto {
        name: Some("EchoResponse".to_string()),
        field: vec![
            field("message", 1, Type::String, None),
            field("delay_ms", 2, Type::Int32, None),
            field("meta", 3, Type::Message, Some(".echo.v1.EchoRequest.Meta")),
        ],
        ..Default::default()
    };

    let mood = EnumDescriptorProto {
        name: Some("Mood".to_string()),
        value: vec![
            EnumValueDescriptorProto {
                name: Some("MOOD_UNSPECIFIED".to_string()),
                number: Some(0),
                ..Default::default()
            },
            EnumValueDescriptorProto {
                name: Some("MOOD_HAPPY".to_string()),
                number: Some(1),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let echo = ServiceDescriptorProto {
        name: Some("EchoService".to_string()),
        method: vec![
            method("UnaryEcho", false),
            method("Fail", false),
            method("Slow", false),
            method("ServerStreamingEcho", true),
        ],
        ..Default::default()
    };

    let silent = ServiceDescriptorProto {
        name: Some("Silent".to_string()),
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some(ECHO_FILE.to_string()),
        package: Some("echo.v1".to_string()),
        dependency: vec![WRAPPERS_FILE.to_string()],
        message_type: vec![request, response],
        enum_type: vec![mood],
        service: vec![echo, silent],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn field(name: &str, number: i32, ty: Type, type_name: Option<&str>) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        type_name: type_name.map(str::to_string),
        json_name: Some(json_name(name)),
        ..Default::default()
    }
}

fn method(name: &str, server_streaming: bool) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(".echo.v1.EchoRequest".to_string()),
        output_type: Some(".echo.v1.EchoResponse".to_string()),
        server_streaming: Some(server_streaming),
        ..Default::default()
    }
}

fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
