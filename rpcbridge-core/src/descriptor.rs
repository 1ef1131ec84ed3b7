//! # Descriptor Registry
//!
//! The schema side of the bridge. A [`Registry`] is filled once from a set of compiled
//! `FileDescriptorProto`s and is read-only afterwards.
//!
//! * [`registry`]: name tables, scoped lookups and package alias allocation.
//! * [`services`]: service/method loading and dotted field-path resolution.
//! * [`types`]: the resolved entities the other two produce.
pub mod registry;
pub mod services;
pub mod types;

pub use registry::{AliasConflict, Registry, RegistryError};
pub use services::ResolveError;
pub use types::{
    Binding, BindingRule, Body, Enum, Field, FieldPath, FieldPathComponent, File, Message,
    Method, Package, Parameter, Service, is_well_known_type,
};
