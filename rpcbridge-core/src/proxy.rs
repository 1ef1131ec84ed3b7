//! # gRPC Proxy Handlers
//!
//! Turns the loaded services of a [`Registry`] into [`ServeMux`] handlers that forward each
//! JSON-RPC call to an upstream gRPC server through a [`GrpcClient`].
//!
//! For every unary method, the handler registered under `"<Service>.<Method>"`:
//!
//! 1. Decodes `params` into the request type, ignoring unknown fields. Missing or `null`
//!    params yield the default message.
//! 2. Forwards `Grpc-Metadata-*` headers (prefix stripped) and `Authorization` upstream.
//! 3. Calls the method with whatever is left of the request deadline.
//! 4. Returns the JSON response with its metadata, or the upstream `Status`.
//!
//! [`ServeMux`]: crate::ServeMux
use crate::descriptor::{File, Method, Registry};
use crate::grpc::client::{GrpcClient, GrpcRequestError};
use crate::jsonrpc::http::METADATA_HEADER_PREFIX;
use crate::jsonrpc::{HandlerError, HandlerOutput, RequestContext, ServeMuxBuilder};
use crate::BoxError;
use http::HeaderMap;
use http_body::Body as HttpBody;
use prost_reflect::{DescriptorPool, DeserializeOptions, DynamicMessage, MethodDescriptor};
use serde_json::Value;
use tonic::{Status, client::GrpcService};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("method '{0}' not found in the descriptor pool")]
    MethodNotInPool(String),
}

/// Registers a handler for every unary method of the services loaded for `file`.
///
/// Streaming methods are skipped. Returns the number of registered handlers.
pub fn register_file<S>(
    builder: &mut ServeMuxBuilder,
    file: &File,
    pool: &DescriptorPool,
    client: GrpcClient<S>,
) -> Result<usize, ProxyError>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    let mut registered = 0;

    for service in &file.services {
        for method in &service.methods {
            if method.is_streaming() {
                tracing::warn!(
                    method = %method.jsonrpc_name(),
                    "skipping streaming method, only unary calls can be proxied"
                );
                continue;
            }

            let descriptor = method_descriptor(pool, method)?;
            register_method(builder, method.jsonrpc_name(), descriptor, client.clone());
            registered += 1;
        }
    }

    tracing::info!(file = file.name(), methods = registered, "registered proxy handlers");
    Ok(registered)
}

/// Registers handlers for every file whose services were loaded into `registry`.
pub fn register_all<S>(
    builder: &mut ServeMuxBuilder,
    registry: &Registry,
    pool: &DescriptorPool,
    client: GrpcClient<S>,
) -> Result<usize, ProxyError>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    let mut registered = 0;
    for file in registry.files_to_generate() {
        registered += register_file(builder, file, pool, client.clone())?;
    }
    Ok(registered)
}

fn method_descriptor(pool: &DescriptorPool, method: &Method) -> Result<MethodDescriptor, ProxyError> {
    pool.get_service_by_name(&method.service_full_name)
        .and_then(|service| service.methods().find(|m| m.name() == method.name()))
        .ok_or_else(|| ProxyError::MethodNotInPool(method.grpc_path()))
}

fn register_method<S>(
    builder: &mut ServeMuxBuilder,
    name: String,
    method: MethodDescriptor,
    client: GrpcClient<S>,
) where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    tracing::debug!(method = %name, path = %method.full_name(), "registering proxy handler");

    builder.register(name, move |ctx: RequestContext, params: Value| {
        let mut client = client.clone();
        let method = method.clone();

        async move {
            let request = match decode_params(&method, params) {
                Ok(request) => request,
                Err(status) => return Err(HandlerError::from(status)),
            };
            let headers = outgoing_metadata(ctx.headers());

            match client.unary(&method, request, headers, ctx.remaining()).await {
                Ok(Ok((result, metadata))) => {
                    Ok(HandlerOutput::new(result).with_metadata(metadata))
                }
                Ok(Err(status)) => Err(HandlerError::from(status)),
                Err(e @ GrpcRequestError::ClientNotReady(_)) => {
                    Err(Status::unavailable(e.to_string()).into())
                }
                Err(e) => Err(Status::invalid_argument(e.to_string()).into()),
            }
        }
    });
}

/// Decodes JSON-RPC `params` into the method's request type.
pub fn decode_params(method: &MethodDescriptor, params: Value) -> Result<DynamicMessage, Status> {
    if params.is_null() {
        return Ok(DynamicMessage::new(method.input()));
    }

    let options = DeserializeOptions::new().deny_unknown_fields(false);
    DynamicMessage::deserialize_with_options(method.input(), params, &options)
        .map_err(|e| Status::invalid_argument(e.to_string()))
}

/// The inbound headers forwarded upstream as call metadata.
pub fn outgoing_metadata(headers: &HeaderMap) -> Vec<(String, String)> {
    let prefix = METADATA_HEADER_PREFIX.to_ascii_lowercase();

    headers
        .iter()
        .filter_map(|(name, value)| {
            let key = match name.as_str().strip_prefix(&prefix) {
                Some(key) => key,
                None if *name == http::header::AUTHORIZATION => name.as_str(),
                None => return None,
            };
            if key.is_empty() || key.ends_with("-bin") {
                return None;
            }
            let value = value.to_str().ok()?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_outgoing_metadata() {
        let mut headers = HeaderMap::new();
        headers.insert("grpc-metadata-x-user", HeaderValue::from_static("alice"));
        headers.insert("authorization", HeaderValue::from_static("Bearer t"));
        headers.insert("grpc-metadata-trace-bin", HeaderValue::from_static("AAA="));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let mut metadata = outgoing_metadata(&headers);
        metadata.sort();

        assert_eq!(
            metadata,
            vec![
                ("authorization".to_string(), "Bearer t".to_string()),
                ("x-user".to_string(), "alice".to_string()),
            ]
        );
    }
}
