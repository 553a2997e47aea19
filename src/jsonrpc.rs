//! JSON-RPC 2.0 envelope shared by the A2A and MCP transports.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// A2A-specific error codes.
pub const TASK_NOT_FOUND: i32 = -32001;
pub const TASK_NOT_CANCELABLE: i32 = -32002;
pub const UNSUPPORTED_OPERATION: i32 = -32004;

/// JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: Option<Value>, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }

    /// Requests without an id are notifications and get no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
                data: None,
            }),
        }
    }

    /// Build an error response from a library error, picking the matching code.
    pub fn from_error(id: Option<Value>, error: &RelayError) -> Self {
        Self::error(id, error_code(error), &error.to_string())
    }

    /// Unwrap the result, turning an error member back into a `RelayError`.
    pub fn into_result(self) -> crate::Result<Value> {
        if let Some(error) = self.error {
            return Err(error.into_error());
        }
        self.result
            .ok_or_else(|| RelayError::Protocol("Response has neither result nor error".to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Map a remote error onto the local error taxonomy.
    pub fn into_error(self) -> RelayError {
        match self.code {
            TASK_NOT_FOUND => RelayError::TaskNotFound(self.message),
            TASK_NOT_CANCELABLE => RelayError::TaskNotCancelable(self.message),
            UNSUPPORTED_OPERATION => RelayError::Unsupported(self.message),
            INVALID_PARAMS => RelayError::InvalidInput(self.message),
            code => RelayError::Protocol(format!("{} (code {})", self.message, code)),
        }
    }
}

/// JSON-RPC error code for a library error.
pub fn error_code(error: &RelayError) -> i32 {
    match error {
        RelayError::TaskNotFound(_) => TASK_NOT_FOUND,
        RelayError::TaskNotCancelable(_) => TASK_NOT_CANCELABLE,
        RelayError::Unsupported(_) => UNSUPPORTED_OPERATION,
        RelayError::InvalidInput(_) | RelayError::Json(_) => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    }
}

/// Parse a raw request body.
///
/// Malformed JSON is a parse error; well-formed JSON that is not a request
/// object is an invalid request, answered with the caller's id when it has one.
pub fn parse_request(body: &[u8]) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| JsonRpcResponse::error(None, PARSE_ERROR, "Parse error"))?;

    let id = value
        .get("id")
        .filter(|id| id.is_string() || id.is_number())
        .cloned();
    serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::error(id, INVALID_REQUEST, &format!("Invalid Request: {}", e))
    })
}

/// Deserialize request params, reporting missing or malformed params as invalid input.
pub fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> crate::Result<T> {
    let params = params.ok_or_else(|| RelayError::InvalidInput("Missing params".to_string()))?;
    serde_json::from_value(params)
        .map_err(|e| RelayError::InvalidInput(format!("Invalid params: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes_survive_the_wire() {
        let response = JsonRpcResponse::from_error(
            Some(json!(1)),
            &RelayError::Unsupported("Cancel not supported".to_string()),
        );
        let wire = serde_json::to_string(&response).unwrap();
        let parsed: JsonRpcResponse = serde_json::from_str(&wire).unwrap();

        match parsed.into_result() {
            Err(RelayError::Unsupported(message)) => assert_eq!(message, "Cancel not supported"),
            other => panic!("Expected unsupported error, got {:?}", other),
        }
    }

    #[test]
    fn test_notification_has_no_id() {
        let request: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_parse_request_error_codes() {
        let garbage = parse_request(b"{not json").unwrap_err();
        assert_eq!(garbage.error.unwrap().code, PARSE_ERROR);
        assert_eq!(garbage.id, None);

        let no_method = parse_request(br#"{"jsonrpc":"2.0","id":1}"#).unwrap_err();
        assert_eq!(no_method.error.unwrap().code, INVALID_REQUEST);
        assert_eq!(no_method.id, Some(json!(1)));

        let not_object = parse_request(b"[1, 2]").unwrap_err();
        assert_eq!(not_object.error.unwrap().code, INVALID_REQUEST);

        let request = parse_request(br#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#).unwrap();
        assert_eq!(request.method, "ping");
    }

    #[test]
    fn test_parse_params_reports_invalid_input() {
        #[derive(Debug, Deserialize)]
        struct Params {
            #[allow(dead_code)]
            id: String,
        }

        let err = parse_params::<Params>(Some(json!({"other": 1}))).unwrap_err();
        assert_eq!(error_code(&err), INVALID_PARAMS);

        let err = parse_params::<Params>(None).unwrap_err();
        assert!(err.to_string().contains("Missing params"));
    }
}
