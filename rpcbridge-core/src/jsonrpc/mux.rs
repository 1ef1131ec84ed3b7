//! # Dispatch Mux
//!
//! A method-name routing table, built once with [`ServeMuxBuilder`] and then shared
//! read-only by every request. Each POST carries exactly one JSON-RPC request; the mux
//! validates it, runs the registered handler under the request deadline and writes a
//! success or error envelope echoing the request `id` and `method`.
//!
//! [`ServeMux`] is a `tower_service::Service` over any `http_body::Body`, so it can be
//! handed to any server that speaks tower.
use super::codec::{CodecError, DEFAULT_MAX_BODY_BYTES, Incoming, JsonMarshaler, Marshaler, ServerCodec};
use super::http::{
    ResponseBody, error_response, parse_grpc_timeout, plain_error, success_response,
    validate_request,
};
use super::message::JsonRpcMessage;
use crate::BoxError;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use http::{HeaderMap, StatusCode, Uri};
use http_body::Body as HttpBody;
use prost_reflect::DescriptorPool;
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tonic::{Status, metadata::MetadataMap};

/// Header clients use to bound how long a call may take.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

pub type HandlerFuture = BoxFuture<'static, Result<HandlerOutput, HandlerError>>;

/// A registered method handler. It receives the request context and the raw `params`
/// payload (`null` when absent) and yields the raw `result` payload.
pub type HandleFunc = Arc<dyn Fn(RequestContext, Value) -> HandlerFuture + Send + Sync>;

/// What a handler sees of the inbound HTTP request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    uri: Uri,
    headers: HeaderMap,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(uri: Uri, headers: HeaderMap, deadline: Option<Instant>) -> Self {
        Self {
            uri,
            headers,
            deadline,
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

/// A successful handler result.
#[derive(Debug, Clone, Default)]
pub struct HandlerOutput {
    pub result: Value,
    /// Forwarded to the client as `Grpc-Metadata-*` headers.
    pub metadata: MetadataMap,
}

impl HandlerOutput {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            metadata: MetadataMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A failed handler result.
#[derive(Debug)]
pub struct HandlerError {
    pub status: Status,
    /// Replaces the HTTP status otherwise derived from the RPC code.
    pub http_status: Option<StatusCode>,
}

impl HandlerError {
    pub fn with_http_status(status: Status, http_status: StatusCode) -> Self {
        Self {
            status,
            http_status: Some(http_status),
        }
    }
}

impl From<Status> for HandlerError {
    fn from(status: Status) -> Self {
        Self {
            status,
            http_status: None,
        }
    }
}

/// Collects handlers and options for a [`ServeMux`].
pub struct ServeMuxBuilder {
    handlers: HashMap<String, HandleFunc>,
    max_body_bytes: usize,
    timeout: Option<Duration>,
    marshaler: Arc<dyn Marshaler>,
    descriptor_pool: Option<DescriptorPool>,
}

impl Default for ServeMuxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServeMuxBuilder {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            timeout: None,
            marshaler: Arc::new(JsonMarshaler),
            descriptor_pool: None,
        }
    }

    /// Routes `method` to `handler`, replacing any previous handler for it.
    pub fn register<F, Fut>(&mut self, method: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerOutput, HandlerError>> + Send + 'static,
    {
        let handler: HandleFunc = Arc::new(move |ctx, params| handler(ctx, params).boxed());
        self.handlers.insert(method.into(), handler);
        self
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Caps request bodies, 5 MiB by default.
    pub fn max_body_bytes(&mut self, max_body_bytes: usize) -> &mut Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Bounds every call. A shorter inbound `Grpc-Timeout` still wins.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn marshaler(&mut self, marshaler: impl Marshaler + 'static) -> &mut Self {
        self.marshaler = Arc::new(marshaler);
        self
    }

    /// Pool used to render rich status details in error envelopes.
    pub fn descriptor_pool(&mut self, pool: DescriptorPool) -> &mut Self {
        self.descriptor_pool = Some(pool);
        self
    }

    pub fn build(&mut self) -> ServeMux {
        let inner = Inner {
            handlers: std::mem::take(&mut self.handlers),
            max_body_bytes: self.max_body_bytes,
            timeout: self.timeout,
            marshaler: self.marshaler.clone(),
            descriptor_pool: self.descriptor_pool.clone(),
        };
        ServeMux {
            inner: Arc::new(inner),
        }
    }
}

struct Inner {
    handlers: HashMap<String, HandleFunc>,
    max_body_bytes: usize,
    timeout: Option<Duration>,
    marshaler: Arc<dyn Marshaler>,
    descriptor_pool: Option<DescriptorPool>,
}

/// The JSON-RPC over HTTP dispatcher. Cheap to clone.
#[derive(Clone)]
pub struct ServeMux {
    inner: Arc<Inner>,
}

impl fmt::Debug for ServeMux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.inner.handlers.keys().collect();
        methods.sort();
        f.debug_struct("ServeMux")
            .field("methods", &methods)
            .field("max_body_bytes", &self.inner.max_body_bytes)
            .field("timeout", &self.inner.timeout)
            .field("marshaler", &self.inner.marshaler)
            .finish()
    }
}

impl ServeMux {
    pub fn builder() -> ServeMuxBuilder {
        ServeMuxBuilder::new()
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.inner.handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    /// Serves one HTTP exchange.
    pub async fn serve<B>(&self, request: http::Request<B>) -> http::Response<ResponseBody>
    where
        B: HttpBody,
        B::Error: Into<BoxError>,
    {
        let inner = &self.inner;
        let (parts, body) = request.into_parts();

        if let Err(e) = validate_request(&parts.method, &parts.headers, inner.max_body_bytes) {
            tracing::debug!(error = %e, method = %parts.method, "rejected request");
            return plain_error(e.status_code(), e);
        }

        let deadline = self.deadline(&parts.headers);

        let codec =
            match ServerCodec::read_from(body, inner.max_body_bytes, inner.marshaler.clone()).await
            {
                Ok(codec) => codec,
                Err(e @ CodecError::PayloadTooLarge { .. }) => {
                    return plain_error(StatusCode::PAYLOAD_TOO_LARGE, e);
                }
                Err(e) => return plain_error(StatusCode::BAD_REQUEST, e),
            };

        let message = match codec.read_batch() {
            Ok(Incoming::Single(message)) => message,
            Ok(Incoming::Batch(_)) => {
                return plain_error(StatusCode::BAD_REQUEST, CodecError::BatchNotSupported);
            }
            Err(e) => return plain_error(StatusCode::BAD_REQUEST, e),
        };

        let marshaler = codec.marshaler().clone();
        let pool = inner.descriptor_pool.as_ref();

        let Some(handler) = inner.handlers.get(&message.method) else {
            tracing::debug!(method = %message.method, "method not implemented");
            let status = Status::unimplemented("method not implemented");
            return error_response(&message, status.into(), marshaler.as_ref(), pool);
        };

        tracing::debug!(method = %message.method, "dispatching");

        let ctx = RequestContext::new(parts.uri, parts.headers, deadline);
        let params = message.params.clone().unwrap_or(Value::Null);
        let call = handler(ctx, params);

        let outcome = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Status::deadline_exceeded("context deadline exceeded").into()),
            },
            None => call.await,
        };

        match outcome {
            Ok(output) => {
                let envelope = JsonRpcMessage::success(&message, output.result);
                match codec.write(&envelope) {
                    Ok(body) => success_response(body, &output.metadata, marshaler.as_ref()),
                    Err(e) => {
                        let status = Status::internal(e.to_string());
                        error_response(&message, status.into(), marshaler.as_ref(), pool)
                    }
                }
            }
            Err(e) => {
                tracing::debug!(method = %message.method, code = ?e.status.code(), "handler failed");
                error_response(&message, e, marshaler.as_ref(), pool)
            }
        }
    }

    fn deadline(&self, headers: &HeaderMap) -> Option<Instant> {
        let inbound = headers
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_grpc_timeout);

        let timeout = match (self.inner.timeout, inbound) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        timeout.and_then(|t| Instant::now().checked_add(t))
    }
}

impl<B> tower_service::Service<http::Request<B>> for ServeMux
where
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<B>) -> Self::Future {
        let mux = self.clone();
        async move { Ok(mux.serve(request).await) }.boxed()
    }
}
