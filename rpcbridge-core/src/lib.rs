//! # rpcbridge core
//!
//! `rpcbridge-core` exposes gRPC services described by Protobuf schemas as JSON-RPC 2.0
//! endpoints over HTTP, without compile-time knowledge of the schemas.
//!
//! ## Key Components
//!
//! * **[`Registry`]:** Loads compiled `FileDescriptorProto`s in two passes (types, then
//!   services), answers scoped name lookups, allocates package aliases and resolves dotted
//!   field paths into per-method binding descriptions.
//! * **[`ServeMux`]:** A JSON-RPC dispatcher. Built once with a table of method handlers,
//!   then shared by every request. Implements `tower_service::Service`.
//! * **[`GrpcClient`]:** A dynamic unary gRPC client using a custom codec, the capability
//!   the generated handlers invoke.
//! * **[`proxy`]:** Registers one handler per loaded unary method, forwarding each JSON-RPC
//!   call to an upstream gRPC server.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, `prost-types` and `tonic` to ensure that
//! consumers use compatible versions of these underlying dependencies.
pub mod descriptor;
pub mod grpc;
pub mod jsonrpc;
pub mod proxy;

pub use descriptor::Registry;
pub use grpc::client::{GrpcClient, GrpcRequestError};
pub use jsonrpc::{ServeMux, ServeMuxBuilder};

// Re-exports
pub use prost;
pub use prost_reflect;
pub use prost_types;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
