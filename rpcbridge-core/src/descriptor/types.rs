use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    MethodDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};
use std::fmt;

/// Message types that may terminate a path parameter even though they are messages.
///
/// Each of them has an unambiguous scalar string representation.
const WELL_KNOWN_WRAPPER_TYPES: &[&str] = &[
    ".google.protobuf.Timestamp",
    ".google.protobuf.Duration",
    ".google.protobuf.StringValue",
    ".google.protobuf.FloatValue",
    ".google.protobuf.DoubleValue",
    ".google.protobuf.BoolValue",
    ".google.protobuf.BytesValue",
    ".google.protobuf.Int32Value",
    ".google.protobuf.UInt32Value",
    ".google.protobuf.Int64Value",
    ".google.protobuf.UInt64Value",
];

/// Returns whether `type_name` (an absolute name such as `.google.protobuf.Int32Value`)
/// is a recognized well-known wrapper type.
pub fn is_well_known_type(type_name: &str) -> bool {
    WELL_KNOWN_WRAPPER_TYPES.contains(&type_name)
}

/// The generated-output identity of a schema file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Package {
    /// Full module path of the generated output (e.g. `acme::greeter::v1`).
    pub path: String,
    /// Short display name, the last segment of `path`.
    pub name: String,
    /// Local alias, set when `name` is already taken by another package.
    pub alias: Option<String>,
}

impl Package {
    /// The identifier generated code should use to refer to this package.
    pub fn identifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A schema compilation unit.
#[derive(Debug, Clone)]
pub struct File {
    pub proto: FileDescriptorProto,
    pub package: Package,
    /// File name without the `.proto` extension.
    pub generated_filename_prefix: String,
    /// FQMNs of every message declared in this file, nested ones included, in declaration order.
    pub messages: Vec<String>,
    /// FQENs of every enum declared in this file, nested ones included, in declaration order.
    pub enums: Vec<String>,
    /// Services with at least one loaded method. Empty until services are loaded.
    pub services: Vec<Service>,
}

impl File {
    /// The file path as given by the compiler (e.g. `acme/greeter.proto`).
    pub fn name(&self) -> &str {
        self.proto.name()
    }

    /// The proto package, or an empty string if the file declares none.
    pub fn proto_package(&self) -> &str {
        self.proto.package()
    }
}

/// A message type, possibly nested inside other messages.
#[derive(Debug, Clone)]
pub struct Message {
    /// Path of the owning file.
    pub file: String,
    /// Proto package of the owning file.
    pub package: String,
    /// Names of the enclosing messages, outermost first.
    pub outers: Vec<String>,
    pub proto: DescriptorProto,
    /// Position among its siblings.
    pub index: usize,
    pub fields: Vec<Field>,
}

impl Message {
    pub fn name(&self) -> &str {
        self.proto.name()
    }

    /// Fully-qualified message name, e.g. `.acme.Outer.Inner`.
    pub fn fqmn(&self) -> String {
        qualified_name(&self.package, &self.outers, self.name())
    }

    /// Whether this is the synthetic entry type the compiler emits for a `map<K, V>` field.
    pub fn is_map_entry(&self) -> bool {
        self.proto
            .options
            .as_ref()
            .is_some_and(|options| options.map_entry())
    }

    /// Finds a direct field by its proto name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }
}

/// An enum type, possibly nested inside messages.
#[derive(Debug, Clone)]
pub struct Enum {
    pub file: String,
    pub package: String,
    pub outers: Vec<String>,
    pub proto: EnumDescriptorProto,
    pub index: usize,
}

impl Enum {
    pub fn name(&self) -> &str {
        self.proto.name()
    }

    /// Fully-qualified enum name, e.g. `.acme.Outer.Kind`.
    pub fn fqen(&self) -> String {
        qualified_name(&self.package, &self.outers, self.name())
    }
}

/// A field of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// FQMN of the owning message.
    pub message: String,
    pub proto: FieldDescriptorProto,
}

impl Field {
    pub fn name(&self) -> &str {
        self.proto.name()
    }

    pub fn json_name(&self) -> &str {
        self.proto.json_name()
    }

    pub fn field_type(&self) -> Type {
        self.proto.r#type()
    }

    /// Target type name for message, group and enum fields. Empty for scalars.
    pub fn type_name(&self) -> &str {
        self.proto.type_name()
    }

    /// Message and group fields can be traversed by a field path.
    pub fn is_aggregate(&self) -> bool {
        matches!(self.field_type(), Type::Message | Type::Group)
    }

    pub fn is_repeated(&self) -> bool {
        self.proto.label() == Label::Repeated
    }

    /// Whether the field was declared with the proto3 `optional` keyword.
    pub fn is_proto3_optional(&self) -> bool {
        self.proto.proto3_optional()
    }
}

/// A service with its loaded methods.
#[derive(Debug, Clone)]
pub struct Service {
    pub file: String,
    pub package: String,
    pub proto: ServiceDescriptorProto,
    pub methods: Vec<Method>,
}

impl Service {
    pub fn name(&self) -> &str {
        self.proto.name()
    }

    /// Dotted name without the leading dot, e.g. `acme.Greeter`.
    pub fn full_name(&self) -> String {
        match self.package.as_str() {
            "" => self.name().to_string(),
            package => format!("{package}.{}", self.name()),
        }
    }
}

/// A method whose input and output types have been resolved.
#[derive(Debug, Clone)]
pub struct Method {
    /// Short name of the owning service.
    pub service: String,
    /// Dotted full name of the owning service.
    pub service_full_name: String,
    pub proto: MethodDescriptorProto,
    /// FQMN of the request message.
    pub request_type: String,
    /// FQMN of the response message.
    pub response_type: String,
}

impl Method {
    pub fn name(&self) -> &str {
        self.proto.name()
    }

    /// The JSON-RPC method name this method is served under, e.g. `Greeter.SayHello`.
    pub fn jsonrpc_name(&self) -> String {
        format!("{}.{}", self.service, self.name())
    }

    /// The HTTP/2 path of the gRPC call, e.g. `/acme.Greeter/SayHello`.
    pub fn grpc_path(&self) -> String {
        format!("/{}/{}", self.service_full_name, self.name())
    }

    pub fn is_streaming(&self) -> bool {
        self.proto.client_streaming() || self.proto.server_streaming()
    }
}

/// One resolved hop of a dotted field path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPathComponent {
    pub name: String,
    pub target: Field,
}

/// An ordered resolution trail from a root message down to a (possibly nested) field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPath(pub Vec<FieldPathComponent>);

impl FieldPath {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path traverses at least one nested message.
    pub fn is_nested(&self) -> bool {
        self.0.len() > 1
    }

    /// The field the path ends at.
    pub fn terminal(&self) -> Option<&Field> {
        self.0.last().map(|c| &c.target)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldPathComponent> {
        self.0.iter()
    }
}

impl From<Vec<FieldPathComponent>> for FieldPath {
    fn from(components: Vec<FieldPathComponent>) -> Self {
        Self(components)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&component.name)?;
        }
        Ok(())
    }
}

/// A path-style binding of a scalar leaf of the request message.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub field_path: FieldPath,
    /// JSON-RPC name of the method the parameter belongs to.
    pub method: String,
    pub target: Field,
}

/// Which part of a request or response message is bound to the payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// The payload is not mapped to the message.
    #[default]
    None,
    /// The payload is the entire message.
    WholeMessage,
    /// The payload is the sub-field at the end of the path.
    Field(FieldPath),
}

impl Body {
    /// The resolution trail, if any. `WholeMessage` yields an empty trail and
    /// `None` yields nothing.
    pub fn field_path(&self) -> Option<&FieldPath> {
        const ROOT: &FieldPath = &FieldPath(Vec::new());
        match self {
            Body::None => None,
            Body::WholeMessage => Some(ROOT),
            Body::Field(path) => Some(path),
        }
    }
}

/// User-declared binding expressions for one method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingRule {
    /// Dotted paths into the request message bound as path parameters.
    pub path_params: Vec<String>,
    /// `""` for no body, `"*"` for the whole request, or a dotted path.
    pub body: String,
    /// `""` for no body, `"*"` for the whole response, or a dotted path.
    pub response_body: String,
}

/// A resolved per-method binding description.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub method: String,
    pub path_params: Vec<Parameter>,
    pub body: Body,
    pub response_body: Body,
}

pub(crate) fn qualified_name(package: &str, outers: &[String], name: &str) -> String {
    let mut fqn = String::new();
    for component in std::iter::once(package)
        .filter(|p| !p.is_empty())
        .chain(outers.iter().map(String::as_str))
        .chain(std::iter::once(name))
    {
        fqn.push('.');
        fqn.push_str(component);
    }
    fqn
}
