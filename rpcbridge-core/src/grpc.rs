//! # Dynamic gRPC Transport
//!
//! The `invoke` capability the JSON-RPC handlers call into.
//!
//! Unlike standard `tonic` clients, which are strongly typed, the components here send
//! `prost_reflect::DynamicMessage` requests and hand back `serde_json::Value` responses,
//! transcoding to and from Protobuf binary format on the fly.
pub mod client;
pub mod codec;
