//! # Echo Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide a schema and an in-process gRPC
//! server for integration testing `rpcbridge`. It is not intended for production use.
//!
//! The schema is built in code rather than compiled from a `.proto` file, so the tests need
//! no `protoc`. It describes `echo/v1/echo.proto`:
//!
//! ```proto
//! syntax = "proto3";
//! package echo.v1;
//! import "google/protobuf/wrappers.proto";
//!
//! enum Mood { MOOD_UNSPECIFIED = 0; MOOD_HAPPY = 1; }
//!
//! message EchoRequest {
//!   message Meta {
//!     string trace_id = 1;
//!     Mood mood = 2;
//!   }
//!   string message = 1;
//!   int32 delay_ms = 2;
//!   Meta meta = 3;
//!   optional string note = 4;
//!   google.protobuf.StringValue label = 5;
//! }
//!
//! message EchoResponse {
//!   string message = 1;
//!   int32 delay_ms = 2;
//!   EchoRequest.Meta meta = 3;
//! }
//!
//! service EchoService {
//!   rpc UnaryEcho(EchoRequest) returns (EchoResponse);
//!   rpc Fail(EchoRequest) returns (EchoResponse);
//!   rpc Slow(EchoRequest) returns (EchoResponse);
//!   rpc ServerStreamingEcho(EchoRequest) returns (stream EchoResponse);
//! }
//!
//! service Silent {}
//! ```
mod schema;
mod server;

pub use schema::{ECHO_FILE, WRAPPERS_FILE, descriptor_pool, echo_file, file_descriptor_set, wrappers_file};
pub use server::EchoServer;

/// Full name of the echo service.
pub const SERVICE: &str = "echo.v1.EchoService";
