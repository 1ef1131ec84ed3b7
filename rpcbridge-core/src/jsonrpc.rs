//! # JSON-RPC 2.0 over HTTP
//!
//! The runtime side of the bridge.
//!
//! * [`message`]: the wire envelope.
//! * [`codec`]: size-capped body reading, batch detection and pluggable marshaling.
//! * [`http`]: request validation, status mapping, metadata forwarding and error envelopes.
//! * [`mux`]: the method routing table and the tower service that drives the others.
//!
//! Transport failures (wrong verb, oversize body, unsupported media type, batches,
//! malformed JSON) are answered with a bare `text/plain` HTTP error. Every request that
//! decodes to a single envelope gets a JSON-RPC success or error envelope back.
pub mod codec;
pub mod http;
pub mod message;
pub mod mux;

pub use codec::{CodecError, DEFAULT_MAX_BODY_BYTES, JsonMarshaler, Marshaler, ServerCodec};
pub use message::{JsonRpcError, JsonRpcMessage};
pub use mux::{
    HandleFunc, HandlerError, HandlerOutput, RequestContext, ServeMux, ServeMuxBuilder,
};
