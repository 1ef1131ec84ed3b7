//! # Dynamic Protobuf -> JSON Codec
//!
//! Implements `tonic::codec::Codec` so `tonic` can carry schema-less messages.
//!
//! 1. **Encoder**: writes an already validated `DynamicMessage` to the wire, after checking it
//!    is an instance of the method's input type.
//! 2. **Decoder**: merges the response bytes into a `DynamicMessage` of the output type and
//!    converts it to a `serde_json::Value`, emitting unpopulated fields so every declared
//!    field of the response is present in the JSON-RPC `result`.
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage, SerializeOptions};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// Bridges `DynamicMessage` requests and `serde_json::Value` responses with the Protobuf
/// binary format.
pub struct JsonCodec {
    /// Schema for the input message.
    req_desc: MessageDescriptor,
    /// Schema for the output message.
    res_desc: MessageDescriptor,
}

impl JsonCodec {
    /// Creates a new `JsonCodec`.
    ///
    /// # Arguments
    /// * `req_desc` - Descriptor for the request message type.
    /// * `res_desc` - Descriptor for the response message type.
    pub fn new(req_desc: MessageDescriptor, res_desc: MessageDescriptor) -> Self {
        Self { req_desc, res_desc }
    }
}

impl Codec for JsonCodec {
    type Encode = DynamicMessage;
    type Decode = serde_json::Value;

    type Encoder = DynamicEncoder;
    type Decoder = JsonDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder(self.req_desc.clone())
    }

    fn decoder(&mut self) -> Self::Decoder {
        JsonDecoder(self.res_desc.clone())
    }
}

/// Writes a `DynamicMessage` as Protobuf bytes.
pub struct DynamicEncoder(MessageDescriptor);

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        self.check_type(&item)?;
        item.encode_raw(dst);
        Ok(())
    }
}

impl DynamicEncoder {
    /// Rejects messages that are not instances of the method's input type.
    fn check_type(&self, item: &DynamicMessage) -> Result<(), Status> {
        if item.descriptor() != self.0 {
            return Err(Status::invalid_argument(format!(
                "expected a '{}' message, got '{}'",
                self.0.full_name(),
                item.descriptor().full_name()
            )));
        }
        Ok(())
    }
}

/// Decodes Protobuf bytes into a JSON value.
pub struct JsonDecoder(MessageDescriptor);

impl Decoder for JsonDecoder {
    type Item = serde_json::Value;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut msg = DynamicMessage::new(self.0.clone());
        msg.merge(src)
            .map_err(|e| Status::internal(format!("Failed to decode Protobuf bytes: {}", e)))?;

        let options = SerializeOptions::new().skip_default_fields(false);
        let value = msg
            .serialize_with_options(serde_json::value::Serializer, &options)
            .map_err(|e| Status::internal(format!("Failed to map response to JSON: {}", e)))?;

        Ok(Some(value))
    }
}
