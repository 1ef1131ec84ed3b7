//! # Name Registry
//!
//! Holds every file, message and enum of a schema compilation, keyed by file path and by
//! fully-qualified name, and hands out unique package aliases for generated output.
//!
//! Loading happens in two passes. All types of all files are registered first, then the
//! services of the files selected for generation are resolved against the complete tables,
//! so a method may reference a message declared in any file regardless of load order.
use super::services::ResolveError;
use super::types::{Enum, Field, File, Message, Package};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    compiler::CodeGeneratorRequest,
};
use std::collections::HashMap;

const DEFAULT_RECURSIVE_DEPTH: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no message found: {0}")]
    MessageNotFound(String),
    #[error("no enum found: {0}")]
    EnumNotFound(String),
    #[error("no such file given: {0}")]
    FileNotFound(String),
}

/// Returned when an alias is already bound to a different package path.
#[derive(Debug, thiserror::Error)]
#[error("package name {alias} is already taken by '{taken}'. Use another alias")]
pub struct AliasConflict {
    pub alias: String,
    pub taken: String,
}

/// Registry of the information extracted from a set of compiled schema files.
#[derive(Debug, Clone)]
pub struct Registry {
    /// Fully-qualified message name to message.
    messages: HashMap<String, Message>,
    /// Fully-qualified enum name to enum.
    enums: HashMap<String, Enum>,
    /// File path to file.
    files: HashMap<String, File>,
    /// Paths of the files whose services were loaded, in request order.
    files_to_generate: Vec<String>,
    /// Prefix joined in front of every package path.
    prefix: String,
    /// User-specified mapping from file path to package path.
    package_map: HashMap<String, String>,
    /// Aliases already taken, mapped to the package path holding them.
    package_aliases: HashMap<String, String>,
    standalone: bool,
    use_json_names_for_fields: bool,
    recursive_depth: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            messages: HashMap::new(),
            enums: HashMap::new(),
            files: HashMap::new(),
            files_to_generate: Vec::new(),
            prefix: String::new(),
            package_map: HashMap::new(),
            package_aliases: HashMap::new(),
            standalone: false,
            use_json_names_for_fields: false,
            recursive_depth: DEFAULT_RECURSIVE_DEPTH,
        }
    }

    /// Loads a plugin-protocol request: every `proto_file` is registered and the
    /// services of `file_to_generate` are resolved.
    pub fn load_from_request(&mut self, request: &CodeGeneratorRequest) -> Result<(), ResolveError> {
        self.load(request.proto_file.iter().cloned(), &request.file_to_generate)
    }

    /// Loads a descriptor set, treating every file in it as a generation target.
    pub fn load_from_descriptor_set(&mut self, set: FileDescriptorSet) -> Result<(), ResolveError> {
        let targets: Vec<String> = set.file.iter().map(|f| f.name().to_string()).collect();
        self.load(set.file, &targets)
    }

    /// Registers the types of all `files`, then loads the services of `files_to_generate`.
    pub fn load(
        &mut self,
        files: impl IntoIterator<Item = FileDescriptorProto>,
        files_to_generate: &[String],
    ) -> Result<(), ResolveError> {
        for proto in files {
            self.load_file(proto);
        }

        for path in files_to_generate {
            self.load_services(path)?;
            if !self.files_to_generate.contains(path) {
                self.files_to_generate.push(path.clone());
            }
        }

        Ok(())
    }

    /// Registers the messages, enums and fields of a file. Services are not loaded here.
    fn load_file(&mut self, proto: FileDescriptorProto) {
        let mut package = self.package_of(&proto);

        if self.standalone {
            package.alias = Some(format!("ext{}", capitalize(&package.name)));
        }

        let wanted = package.identifier().to_string();
        let alias = self.allocate_alias(&wanted, &package.path);
        if alias != package.name {
            package.alias = Some(alias);
        }

        let generated_filename_prefix = proto
            .name()
            .strip_suffix(".proto")
            .unwrap_or(proto.name())
            .to_string();

        let mut file = File {
            proto,
            package,
            generated_filename_prefix,
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
        };

        let messages = file.proto.message_type.clone();
        let enums = file.proto.enum_type.clone();
        self.register_messages(&mut file, &[], &messages);
        self.register_enums(&mut file, &[], &enums);

        tracing::debug!(
            file = file.name(),
            package = %file.package.path,
            alias = file.package.identifier(),
            "registered file"
        );

        self.files.insert(file.name().to_string(), file);
    }

    fn register_messages(&mut self, file: &mut File, outers: &[String], protos: &[DescriptorProto]) {
        for (index, proto) in protos.iter().enumerate() {
            let mut message = Message {
                file: file.name().to_string(),
                package: file.proto_package().to_string(),
                outers: outers.to_vec(),
                proto: proto.clone(),
                index,
                fields: Vec::new(),
            };
            let fqmn = message.fqmn();
            message.fields = proto
                .field
                .iter()
                .map(|fd| Field {
                    message: fqmn.clone(),
                    proto: fd.clone(),
                })
                .collect();

            tracing::debug!(name = %fqmn, "register name");
            file.messages.push(fqmn.clone());
            self.messages.insert(fqmn, message);

            let mut nested = outers.to_vec();
            nested.push(proto.name().to_string());
            self.register_messages(file, &nested, &proto.nested_type);
            self.register_enums(file, &nested, &proto.enum_type);
        }
    }

    fn register_enums(&mut self, file: &mut File, outers: &[String], protos: &[EnumDescriptorProto]) {
        for (index, proto) in protos.iter().enumerate() {
            let e = Enum {
                file: file.name().to_string(),
                package: file.proto_package().to_string(),
                outers: outers.to_vec(),
                proto: proto.clone(),
                index,
            };
            let fqen = e.fqen();
            tracing::debug!(name = %fqen, "register enum name");
            file.enums.push(fqen.clone());
            self.enums.insert(fqen, e);
        }
    }

    fn package_of(&self, proto: &FileDescriptorProto) -> Package {
        let path = match self.package_map.get(proto.name()) {
            Some(mapped) => mapped.clone(),
            None if !proto.package().is_empty() => proto.package().replace('.', "::"),
            None => file_stem(proto.name()).to_string(),
        };
        let path = match self.prefix.as_str() {
            "" => path,
            prefix => format!("{prefix}::{path}"),
        };
        let name = path.rsplit("::").next().unwrap_or(&path).to_string();

        Package {
            path,
            name,
            alias: None,
        }
    }

    /// Looks up a message type by `name`.
    ///
    /// A name with a leading dot is absolute. Otherwise it is resolved relative to
    /// `location` (a package or message FQN), trying the innermost scope first and
    /// walking outwards one component at a time.
    pub fn lookup_message(&self, location: &str, name: &str) -> Result<&Message, RegistryError> {
        tracing::debug!(name, location, "lookup message");
        resolve_scoped(&self.messages, location, name)
            .ok_or_else(|| RegistryError::MessageNotFound(name.to_string()))
    }

    /// Looks up an enum type by `name`, with the same scoping rules as [`Self::lookup_message`].
    pub fn lookup_enum(&self, location: &str, name: &str) -> Result<&Enum, RegistryError> {
        tracing::debug!(name, location, "lookup enum");
        resolve_scoped(&self.enums, location, name)
            .ok_or_else(|| RegistryError::EnumNotFound(name.to_string()))
    }

    /// Looks up a file by its path.
    pub fn lookup_file(&self, path: &str) -> Result<&File, RegistryError> {
        self.files
            .get(path)
            .ok_or_else(|| RegistryError::FileNotFound(path.to_string()))
    }

    pub(crate) fn file_mut(&mut self, path: &str) -> Result<&mut File, RegistryError> {
        self.files
            .get_mut(path)
            .ok_or_else(|| RegistryError::FileNotFound(path.to_string()))
    }

    /// Files whose services were loaded, in the order they were requested.
    pub fn files_to_generate(&self) -> impl Iterator<Item = &File> {
        self.files_to_generate
            .iter()
            .filter_map(|path| self.files.get(path))
    }

    /// Whether `field` is a `map<K, V>` field.
    pub fn is_map_field(&self, field: &Field) -> bool {
        field.is_repeated()
            && field.is_aggregate()
            && self
                .lookup_message(&field.message, field.type_name())
                .is_ok_and(Message::is_map_entry)
    }

    /// Reserves `alias` for the package at `path`.
    ///
    /// Reserving the same alias for the same path again is a no-op. Once reserved, the
    /// alias is never handed to another package.
    pub fn reserve_alias(&mut self, alias: &str, path: &str) -> Result<(), AliasConflict> {
        match self.package_aliases.get(alias) {
            Some(taken) if taken == path => Ok(()),
            Some(taken) => Err(AliasConflict {
                alias: alias.to_string(),
                taken: taken.clone(),
            }),
            None => {
                self.package_aliases
                    .insert(alias.to_string(), path.to_string());
                Ok(())
            }
        }
    }

    /// Returns a unique alias for the package at `path`: `name` if it is free (or already
    /// held by `path`), otherwise the first free `name_0`, `name_1`, ...
    pub fn allocate_alias(&mut self, name: &str, path: &str) -> String {
        if self.reserve_alias(name, path).is_ok() {
            return name.to_string();
        }

        let mut i = 0usize;
        loop {
            let alias = format!("{name}_{i}");
            if self.reserve_alias(&alias, path).is_ok() {
                return alias;
            }
            i += 1;
        }
    }

    /// The package path an alias is bound to.
    pub fn alias_path(&self, alias: &str) -> Option<&str> {
        self.package_aliases.get(alias).map(String::as_str)
    }

    /// Adds a mapping from a `.proto` file to the package path of its generated output.
    pub fn add_package_map(&mut self, file: impl Into<String>, path: impl Into<String>) {
        self.package_map.insert(file.into(), path.into());
    }

    /// Sets the prefix joined in front of package paths.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    /// In standalone mode generated code lives outside the schema package, so every
    /// package gets an `ext`-prefixed alias.
    pub fn set_standalone(&mut self, standalone: bool) {
        self.standalone = standalone;
    }

    pub fn is_standalone(&self) -> bool {
        self.standalone
    }

    /// Sets the maximum depth renderers may follow when walking nested messages.
    pub fn set_recursive_depth(&mut self, depth: usize) {
        self.recursive_depth = depth;
    }

    pub fn recursive_depth(&self) -> usize {
        self.recursive_depth
    }

    pub fn set_use_json_names_for_fields(&mut self, use_json_names: bool) {
        self.use_json_names_for_fields = use_json_names;
    }

    pub fn use_json_names_for_fields(&self) -> bool {
        self.use_json_names_for_fields
    }

    /// The name a renderer should emit for `field`.
    pub fn field_name<'a>(&self, field: &'a Field) -> &'a str {
        if self.use_json_names_for_fields {
            field.json_name()
        } else {
            field.name()
        }
    }

    /// All registered fully-qualified message names.
    pub fn all_fqmns(&self) -> Vec<&str> {
        self.messages.keys().map(String::as_str).collect()
    }

    /// All registered fully-qualified enum names.
    pub fn all_fqens(&self) -> Vec<&str> {
        self.enums.keys().map(String::as_str).collect()
    }
}

fn resolve_scoped<'a, T>(table: &'a HashMap<String, T>, location: &str, name: &str) -> Option<&'a T> {
    if name.starts_with('.') {
        return table.get(name);
    }

    let location = if location.starts_with('.') {
        location.to_string()
    } else {
        format!(".{location}")
    };

    let mut components: Vec<&str> = location.split('.').collect();
    while !components.is_empty() {
        let candidate = format!("{}.{name}", components.join("."));
        if let Some(found) = table.get(&candidate) {
            return Some(found);
        }
        components.pop();
    }

    None
}

fn file_stem(path: &str) -> &str {
    let base = path.rsplit('/').next().unwrap_or(path);
    base.strip_suffix(".proto").unwrap_or(base)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
