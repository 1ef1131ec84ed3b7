use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The protocol version every envelope carries.
pub const VERSION: &str = "2.0";

/// A JSON-RPC 2.0 envelope.
///
/// Requests carry `params`; responses carry either `result` or `error`. The `id` and
/// `method` of a request are echoed back unchanged in its response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(rename = "jsonrpc", default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric RPC status code.
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcMessage {
    /// A request envelope, mostly useful to clients and tests.
    pub fn request(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            version: VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params: Some(params),
            ..Default::default()
        }
    }

    /// A success response to `request`.
    pub fn success(request: &JsonRpcMessage, result: Value) -> Self {
        Self {
            version: VERSION.to_string(),
            id: request.id.clone(),
            method: request.method.clone(),
            result: Some(result),
            ..Default::default()
        }
    }

    /// An error response to `request`.
    pub fn failure(request: &JsonRpcMessage, error: JsonRpcError) -> Self {
        Self {
            version: VERSION.to_string(),
            id: request.id.clone(),
            method: request.method.clone(),
            error: Some(error),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_echoes_id_and_method() {
        let request = JsonRpcMessage::request("7", "Echo.Say", json!({"text": "hi"}));
        let response = JsonRpcMessage::success(&request, json!({"text": "hi"}));

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "id": "7", "method": "Echo.Say", "result": {"text": "hi"}})
        );
    }

    #[test]
    fn test_error_omits_missing_data() {
        let request = JsonRpcMessage::request(1, "Foo.Bar", Value::Null);
        let response = JsonRpcMessage::failure(
            &request,
            JsonRpcError {
                code: 12,
                message: "method not implemented".to_string(),
                data: None,
            },
        );

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "Foo.Bar",
                "error": {"code": 12, "message": "method not implemented"}
            })
        );
    }

    #[test]
    fn test_absent_params_deserialize_to_none() {
        let message: JsonRpcMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"1","method":"A.B"}"#).unwrap();
        assert_eq!(message.params, None);
        assert_eq!(message.method, "A.B");
    }
}
