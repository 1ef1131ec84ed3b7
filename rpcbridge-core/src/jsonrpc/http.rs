//! # HTTP Transport
//!
//! Everything that touches HTTP directly: request validation, plain transport errors,
//! the RPC code to HTTP status table, response metadata forwarding and error envelopes.
use super::codec::Marshaler;
use super::message::{JsonRpcError, JsonRpcMessage};
use super::mux::HandlerError;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode, header};
use http_body_util::Full;
use prost::Message as _;
use prost_reflect::{DescriptorPool, DynamicMessage};
use serde_json::{Map, Value};
use std::time::Duration;
use tonic::{Code, Status, metadata::KeyAndValueRef, metadata::MetadataMap};

/// Body type of every response the mux produces.
pub type ResponseBody = Full<Bytes>;

/// Prefix of the HTTP headers that carry forwarded gRPC metadata.
pub const METADATA_HEADER_PREFIX: &str = "Grpc-Metadata-";

/// `Content-Type` values accepted for requests.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "application/json-rpc",
    "application/jsonrequest",
];

/// Metadata keys that belong to the gRPC transport and are never forwarded.
const RESERVED_METADATA: &[&str] = &[
    "content-type",
    "content-length",
    "connection",
    "te",
    "trailer",
    "transfer-encoding",
    "grpc-status",
    "grpc-message",
    "grpc-status-details-bin",
    "grpc-encoding",
    "grpc-accept-encoding",
    "grpc-timeout",
];

/// Transport-level rejections, answered before any envelope is decoded.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0} method not allowed")]
    MethodNotAllowed(Method),
    #[error("content length too large ({length}>{limit})")]
    PayloadTooLarge { length: u64, limit: usize },
    #[error("invalid content type, only application/json is supported")]
    UnsupportedMediaType,
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RequestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        }
    }
}

/// Checks the verb, declared length and content type of a request.
pub fn validate_request(
    method: &Method,
    headers: &HeaderMap,
    max_body_bytes: usize,
) -> Result<(), RequestError> {
    if method != Method::POST {
        return Err(RequestError::MethodNotAllowed(method.clone()));
    }

    let length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    if let Some(length) = length
        && length > max_body_bytes as u64
    {
        return Err(RequestError::PayloadTooLarge {
            length,
            limit: max_body_bytes,
        });
    }

    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(media_type);
    match media_type {
        Some(mt) if ACCEPTED_CONTENT_TYPES.contains(&mt.as_str()) => Ok(()),
        _ => Err(RequestError::UnsupportedMediaType),
    }
}

/// The lowercased media type of a `Content-Type` value, parameters dropped.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// A bare `text/plain` error with no JSON-RPC envelope.
pub fn plain_error(status: StatusCode, message: impl std::fmt::Display) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(Bytes::from(format!("{message}\n"))));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}

/// Maps an RPC status code to the HTTP status of its response.
pub fn http_status_from_code(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => {
            StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::FailedPrecondition => StatusCode::BAD_REQUEST,
        Code::Aborted => StatusCode::CONFLICT,
        Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
    }
}

/// Copies call metadata into `headers` as `Grpc-Metadata-<key>` entries.
pub fn forward_response_metadata(headers: &mut HeaderMap, metadata: &MetadataMap) {
    for entry in metadata.iter() {
        let (key, value) = match entry {
            KeyAndValueRef::Ascii(key, value) => (key.as_str(), value.as_encoded_bytes()),
            KeyAndValueRef::Binary(key, value) => (key.as_str(), value.as_encoded_bytes()),
        };

        if RESERVED_METADATA.contains(&key) {
            continue;
        }

        let name = format!("{METADATA_HEADER_PREFIX}{key}");
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::debug!(key, "dropping metadata that is not a valid header"),
        }
    }
}

/// Wraps a marshaled success envelope, forwarding the call metadata as headers.
pub fn success_response(
    body: Bytes,
    metadata: &MetadataMap,
    marshaler: &dyn Marshaler,
) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(body));
    set_content_type(response.headers_mut(), marshaler);
    forward_response_metadata(response.headers_mut(), metadata);
    response
}

/// Builds the error envelope for `request`.
///
/// The HTTP status comes from the RPC code unless the error carries an explicit override.
/// When the envelope itself cannot be marshaled, a fixed `Internal` envelope is sent with
/// HTTP 500 instead.
pub fn error_response(
    request: &JsonRpcMessage,
    error: HandlerError,
    marshaler: &dyn Marshaler,
    pool: Option<&DescriptorPool>,
) -> Response<ResponseBody> {
    let HandlerError {
        status,
        http_status,
    } = error;

    let envelope = JsonRpcMessage::failure(
        request,
        JsonRpcError {
            code: status.code() as i32,
            message: status.message().to_string(),
            data: status_details(&status, pool),
        },
    );

    let bytes = match marshaler.marshal(&envelope) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, code = ?status.code(), "failed to marshal error message");
            return fallback_response(request);
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = http_status.unwrap_or_else(|| http_status_from_code(status.code()));

    let headers = response.headers_mut();
    set_content_type(headers, marshaler);
    if status.code() == Code::Unauthenticated
        && let Ok(value) = HeaderValue::from_str(status.message())
    {
        headers.insert(header::WWW_AUTHENTICATE, value);
    }
    forward_response_metadata(headers, status.metadata());

    response
}

fn fallback_response(request: &JsonRpcMessage) -> Response<ResponseBody> {
    let fallback = JsonRpcMessage::failure(
        request,
        JsonRpcError {
            code: Code::Internal as i32,
            message: "failed to marshal error message".to_string(),
            data: None,
        },
    );

    let bytes = serde_json::to_vec(&fallback).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

fn set_content_type(headers: &mut HeaderMap, marshaler: &dyn Marshaler) {
    let value = HeaderValue::from_str(marshaler.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static("application/json"));
    headers.insert(header::CONTENT_TYPE, value);
}

/// Wire shape of `google.rpc.Status`, as carried in `grpc-status-details-bin`.
#[derive(Clone, PartialEq, prost::Message)]
struct RpcStatus {
    #[prost(int32, tag = "1")]
    code: i32,
    #[prost(string, tag = "2")]
    message: String,
    #[prost(message, repeated, tag = "3")]
    details: Vec<prost_types::Any>,
}

/// Decodes the rich error details of `status` into the `data` member of an error.
///
/// Details whose type is known to `pool` are rendered in full, others only by type URL.
pub fn status_details(status: &Status, pool: Option<&DescriptorPool>) -> Option<Value> {
    if status.details().is_empty() {
        return None;
    }

    let decoded = match RpcStatus::decode(status.details()) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::debug!(error = %e, "undecodable status details");
            return None;
        }
    };

    if decoded.details.is_empty() {
        return None;
    }

    let details = decoded
        .details
        .iter()
        .map(|any| detail_to_json(any, pool))
        .collect();
    Some(Value::Array(details))
}

fn detail_to_json(any: &prost_types::Any, pool: Option<&DescriptorPool>) -> Value {
    let type_name = any.type_url.rsplit('/').next().unwrap_or_default();

    let mut object = pool
        .and_then(|pool| pool.get_message_by_name(type_name))
        .and_then(|desc| DynamicMessage::decode(desc, any.value.as_slice()).ok())
        .and_then(|msg| serde_json::to_value(&msg).ok())
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_else(Map::new);

    object.insert("@type".to_string(), Value::String(any.type_url.clone()));
    Value::Object(object)
}

/// Parses a `Grpc-Timeout` header value: up to eight digits followed by a unit.
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || value.len() > 9 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(amount * 60 * 60)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}
