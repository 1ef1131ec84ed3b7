//! A dynamic in-process gRPC server for the echo schema.
//!
//! * `UnaryEcho` copies the request into the response, returns `x-echo: true` metadata and
//!   echoes an inbound `x-user` entry back.
//! * `Fail` answers `NOT_FOUND` with `x-reason` metadata, or `UNAUTHENTICATED` when the
//!   request message is `"unauthenticated"`.
//! * `Slow` sleeps `delay_ms` milliseconds, then echoes.
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor, MethodDescriptor, Value};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tonic::{
    Request, Response, Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
    metadata::{MetadataMap, MetadataValue},
    server::{Grpc, UnaryService},
};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Serves every method of the echo schema found in its descriptor pool.
#[derive(Debug, Clone)]
pub struct EchoServer {
    pool: DescriptorPool,
}

impl EchoServer {
    pub fn new(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    fn method(&self, path: &str) -> Option<MethodDescriptor> {
        let (service, method) = path.strip_prefix('/')?.split_once('/')?;
        self.pool
            .get_service_by_name(service)?
            .methods()
            .find(|m| m.name() == method)
    }
}

impl tower_service::Service<http::Request<tonic::body::Body>> for EchoServer {
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<tonic::body::Body>) -> Self::Future {
        let Some(method) = self.method(req.uri().path()) else {
            let status = Status::unimplemented(format!("unknown method {}", req.uri().path()));
            return Box::pin(async move { Ok(status.into_http()) });
        };

        Box::pin(async move {
            let codec = DynamicCodec(method.input());
            let mut grpc = Grpc::new(codec);
            Ok(grpc.unary(EchoMethod(method), req).await)
        })
    }
}

struct EchoMethod(MethodDescriptor);

impl UnaryService<DynamicMessage> for EchoMethod {
    type Response = DynamicMessage;
    type Future = BoxFuture<Result<Response<DynamicMessage>, Status>>;

    fn call(&mut self, request: Request<DynamicMessage>) -> Self::Future {
        let method = self.0.clone();
        Box::pin(async move {
            match method.name() {
                "UnaryEcho" => echo(&method, request),
                "Fail" => fail(request.get_ref()),
                "Slow" => {
                    let delay = match request.get_ref().get_field_by_name("delay_ms").as_deref() {
                        Some(Value::I32(ms)) => u64::try_from(*ms).unwrap_or_default(),
                        _ => 0,
                    };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    echo(&method, request)
                }
                other => Err(Status::unimplemented(format!("{other} is not served"))),
            }
        })
    }
}

fn echo(
    method: &MethodDescriptor,
    request: Request<DynamicMessage>,
) -> Result<Response<DynamicMessage>, Status> {
    let user = request.metadata().get("x-user").cloned();
    let bytes = request.into_inner().encode_to_vec();

    let message = DynamicMessage::decode(method.output(), bytes.as_slice())
        .map_err(|e| Status::internal(e.to_string()))?;

    let mut response = Response::new(message);
    response
        .metadata_mut()
        .insert("x-echo", MetadataValue::from_static("true"));
    if let Some(user) = user {
        response.metadata_mut().insert("x-user", user);
    }
    Ok(response)
}

fn fail(request: &DynamicMessage) -> Result<Response<DynamicMessage>, Status> {
    let message = request.get_field_by_name("message");
    if let Some(Value::String(text)) = message.as_deref()
        && text == "unauthenticated"
    {
        return Err(Status::unauthenticated("Bearer realm=\"echo\""));
    }

    let mut metadata = MetadataMap::new();
    metadata.insert("x-reason", MetadataValue::from_static("testing"));
    Err(Status::with_metadata(
        tonic::Code::NotFound,
        "no echo for you",
        metadata,
    ))
}

/// Decodes requests of the wrapped type. Responses are already dynamic messages.
struct DynamicCodec(MessageDescriptor);

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;

    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder(self.0.clone())
    }
}

struct DynamicEncoder;

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode_raw(dst);
        Ok(())
    }
}

struct DynamicDecoder(MessageDescriptor);

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut msg = DynamicMessage::new(self.0.clone());
        msg.merge(src)
            .map_err(|e| Status::internal(format!("Failed to decode Protobuf bytes: {e}")))?;
        Ok(Some(msg))
    }
}
