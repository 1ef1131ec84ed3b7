//! # Envelope Codec
//!
//! Reads one size-capped request body and frames it into JSON-RPC envelopes, and turns
//! outgoing envelopes back into bytes through a [`Marshaler`].
//!
//! A [`ServerCodec`] belongs to the single task serving one HTTP exchange. Writing consumes
//! it, so a response can only ever be produced once.
use super::message::JsonRpcMessage;
use crate::BoxError;
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::fmt;
use std::sync::Arc;

/// Default cap on request bodies: 5 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to read request body: {0}")]
    Read(#[source] BoxError),
    #[error("content length too large (>{limit})")]
    PayloadTooLarge { limit: usize },
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
    #[error("batch request not supported")]
    BatchNotSupported,
}

/// Serializes outgoing envelopes.
pub trait Marshaler: fmt::Debug + Send + Sync {
    /// The `Content-Type` of the marshaled bytes.
    fn content_type(&self) -> &str;

    fn marshal(&self, message: &JsonRpcMessage) -> Result<Vec<u8>, BoxError>;
}

/// The default [`Marshaler`], plain `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMarshaler;

impl Marshaler for JsonMarshaler {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn marshal(&self, message: &JsonRpcMessage) -> Result<Vec<u8>, BoxError> {
        Ok(serde_json::to_vec(message)?)
    }
}

/// What a request body decoded to.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Single(JsonRpcMessage),
    Batch(Vec<JsonRpcMessage>),
}

/// Server side of one JSON-RPC exchange.
#[derive(Debug)]
pub struct ServerCodec {
    body: Bytes,
    marshaler: Arc<dyn Marshaler>,
}

impl ServerCodec {
    /// Reads `body` to the end, failing once more than `limit` bytes have arrived.
    pub async fn read_from<B>(
        body: B,
        limit: usize,
        marshaler: Arc<dyn Marshaler>,
    ) -> Result<Self, CodecError>
    where
        B: HttpBody,
        B::Error: Into<BoxError>,
    {
        let collected = Limited::new(body, limit).collect().await.map_err(|e| {
            if e.is::<LengthLimitError>() {
                CodecError::PayloadTooLarge { limit }
            } else {
                CodecError::Read(e)
            }
        })?;

        Ok(Self {
            body: collected.to_bytes(),
            marshaler,
        })
    }

    /// Wraps an already buffered body.
    pub fn from_bytes(body: impl Into<Bytes>, marshaler: Arc<dyn Marshaler>) -> Self {
        Self {
            body: body.into(),
            marshaler,
        }
    }

    /// Decodes the body. A top-level JSON array is a batch.
    pub fn read_batch(&self) -> Result<Incoming, CodecError> {
        let is_batch = self
            .body
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'[');

        if is_batch {
            let messages: Vec<JsonRpcMessage> = serde_json::from_slice(&self.body)?;
            Ok(Incoming::Batch(messages))
        } else {
            let message: JsonRpcMessage = serde_json::from_slice(&self.body)?;
            Ok(Incoming::Single(message))
        }
    }

    /// Decodes the body as exactly one envelope, rejecting batches.
    pub fn read_single(&self) -> Result<JsonRpcMessage, CodecError> {
        match self.read_batch()? {
            Incoming::Single(message) => Ok(message),
            Incoming::Batch(_) => Err(CodecError::BatchNotSupported),
        }
    }

    pub fn marshaler(&self) -> &Arc<dyn Marshaler> {
        &self.marshaler
    }

    /// Marshals the reply, closing the codec.
    pub fn write(self, message: &JsonRpcMessage) -> Result<Bytes, BoxError> {
        self.marshaler.marshal(message).map(Bytes::from)
    }
}
