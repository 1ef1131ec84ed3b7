//! # Service Loader & Field-Path Resolver
//!
//! Cross-links methods to their request/response messages and resolves dotted field
//! paths (`"a.b.c"`) into ordered trails of field descriptors.
//!
//! Everything here must run after every file's types are registered, since both method
//! types and intermediate field types may be declared in any file of the compilation.
use super::registry::{Registry, RegistryError};
use super::types::{
    Binding, BindingRule, Body, FieldPath, FieldPathComponent, File, Message, Method,
    Parameter, Service, is_well_known_type,
};
use prost_types::{MethodDescriptorProto, ServiceDescriptorProto};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{service}.{method}: unresolved {role} type '{type_name}'")]
    UnresolvedMethodType {
        service: String,
        method: String,
        role: &'static str,
        type_name: String,
        #[source]
        source: RegistryError,
    },

    #[error("no field {path:?} found in {root}")]
    FieldNotFound { path: String, root: String },

    #[error("not an aggregate type: {field} in {path}")]
    NotAnAggregate { field: String, path: String },

    #[error("optional field not allowed in field path: {field} in {path}")]
    OptionalNotAllowedInPath { field: String, path: String },

    #[error(
        "{method}: {path} is a protobuf message type. Protobuf message types cannot be used as path parameters, use a scalar value type (such as string) instead"
    )]
    InvalidPathParameterType { method: String, path: String },

    #[error("invalid field access list for {0}")]
    EmptyFieldPath(String),
}

impl Registry {
    /// Resolves and stores the services declared in the file at `path`.
    ///
    /// Services left without methods are dropped from the file.
    pub fn load_services(&mut self, path: &str) -> Result<(), ResolveError> {
        let file = self.lookup_file(path)?;
        tracing::debug!(file = file.name(), "loading services");

        let mut services = Vec::new();
        for sd in &file.proto.service {
            let service = self.new_service(file, sd)?;

            if service.methods.is_empty() {
                continue;
            }

            tracing::debug!(
                service = service.name(),
                methods = service.methods.len(),
                "registered service"
            );
            services.push(service);
        }

        self.file_mut(path)?.services = services;
        Ok(())
    }

    fn new_service(&self, file: &File, sd: &ServiceDescriptorProto) -> Result<Service, ResolveError> {
        tracing::debug!(service = sd.name(), "registering service");

        let mut service = Service {
            file: file.name().to_string(),
            package: file.proto_package().to_string(),
            proto: sd.clone(),
            methods: Vec::with_capacity(sd.method.len()),
        };

        for md in &sd.method {
            tracing::debug!(service = sd.name(), method = md.name(), "processing method");
            let method = self.new_method(&service, md)?;
            service.methods.push(method);
        }

        Ok(service)
    }

    fn new_method(
        &self,
        service: &Service,
        md: &MethodDescriptorProto,
    ) -> Result<Method, ResolveError> {
        let request_type = self
            .lookup_message(&service.package, md.input_type())
            .map_err(|source| unresolved_type(service, md, "input", md.input_type(), source))?
            .fqmn();
        let response_type = self
            .lookup_message(&service.package, md.output_type())
            .map_err(|source| unresolved_type(service, md, "output", md.output_type(), source))?
            .fqmn();

        Ok(Method {
            service: service.name().to_string(),
            service_full_name: service.full_name(),
            proto: md.clone(),
            request_type,
            response_type,
        })
    }

    /// The request message of a loaded method.
    pub fn request_message(&self, method: &Method) -> Result<&Message, RegistryError> {
        self.lookup_message("", &method.request_type)
    }

    /// The response message of a loaded method.
    pub fn response_message(&self, method: &Method) -> Result<&Message, RegistryError> {
        self.lookup_message("", &method.response_type)
    }

    /// Resolves `path` in the request message as a path parameter.
    ///
    /// The terminal field must be a scalar or a well-known wrapper type, and no hop may be
    /// a proto3 `optional` field.
    pub fn new_param(&self, method: &Method, path: &str) -> Result<Parameter, ResolveError> {
        let message = self.request_message(method)?;
        let field_path = self.resolve_field_path(message, path, true)?;

        let Some(target) = field_path.terminal().cloned() else {
            return Err(ResolveError::EmptyFieldPath(path.to_string()));
        };

        if target.is_aggregate() {
            if !is_well_known_type(target.type_name()) {
                return Err(ResolveError::InvalidPathParameterType {
                    method: method.jsonrpc_name(),
                    path: path.to_string(),
                });
            }
            tracing::debug!(field = target.name(), "found well known aggregate type");
        }

        Ok(Parameter {
            field_path,
            method: method.jsonrpc_name(),
            target,
        })
    }

    /// Resolves the request body binding: `""` binds nothing, `"*"` binds the whole
    /// request, anything else binds the field at the end of the path.
    pub fn new_body(&self, method: &Method, path: &str) -> Result<Body, ResolveError> {
        let message = self.request_message(method)?;
        self.new_body_binding(message, path)
    }

    /// Resolves the response body binding, with the same rules as [`Self::new_body`].
    pub fn new_response(&self, method: &Method, path: &str) -> Result<Body, ResolveError> {
        let message = self.response_message(method)?;
        self.new_body_binding(message, path)
    }

    fn new_body_binding(&self, message: &Message, path: &str) -> Result<Body, ResolveError> {
        match path {
            "" => Ok(Body::None),
            "*" => Ok(Body::WholeMessage),
            path => Ok(Body::Field(self.resolve_field_path(message, path, false)?)),
        }
    }

    /// Resolves every expression of `rule` against `method`.
    pub fn new_binding(&self, method: &Method, rule: &BindingRule) -> Result<Binding, ResolveError> {
        let path_params = rule
            .path_params
            .iter()
            .map(|path| self.new_param(method, path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Binding {
            method: method.jsonrpc_name(),
            path_params,
            body: self.new_body(method, &rule.body)?,
            response_body: self.new_response(method, &rule.response_body)?,
        })
    }

    /// Resolves a dotted `path` into the chain of fields it names, starting from `root`.
    ///
    /// Every hop but the last must be a message or group field. When `is_path_param` is set,
    /// proto3 `optional` fields are rejected. An empty path resolves to an empty trail.
    pub fn resolve_field_path(
        &self,
        root: &Message,
        path: &str,
        is_path_param: bool,
    ) -> Result<FieldPath, ResolveError> {
        if path.is_empty() {
            return Ok(FieldPath::default());
        }

        let mut message = root;
        let mut components: Vec<FieldPathComponent> = Vec::new();

        for name in path.split('.') {
            if let Some(previous) = components.last() {
                let hop = &previous.target;
                if !hop.is_aggregate() {
                    return Err(ResolveError::NotAnAggregate {
                        field: hop.name().to_string(),
                        path: path.to_string(),
                    });
                }
                message = self.lookup_message(&message.fqmn(), hop.type_name())?;
            }

            tracing::debug!(component = name, message = %message.fqmn(), "lookup field");

            let Some(field) = message.field(name) else {
                return Err(ResolveError::FieldNotFound {
                    path: path.to_string(),
                    root: root.name().to_string(),
                });
            };

            if is_path_param && field.is_proto3_optional() {
                return Err(ResolveError::OptionalNotAllowedInPath {
                    field: field.name().to_string(),
                    path: path.to_string(),
                });
            }

            components.push(FieldPathComponent {
                name: name.to_string(),
                target: field.clone(),
            });
        }

        Ok(FieldPath(components))
    }
}

fn unresolved_type(
    service: &Service,
    md: &MethodDescriptorProto,
    role: &'static str,
    type_name: &str,
    source: RegistryError,
) -> ResolveError {
    ResolveError::UnresolvedMethodType {
        service: service.name().to_string(),
        method: md.name().to_string(),
        role,
        type_name: type_name.to_string(),
        source,
    }
}
