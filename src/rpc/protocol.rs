//! JSON-RPC 2.0 message shapes and the error code taxonomy from spec.md
//! §4.9. Parsing strictness comes for free from `serde_json`, which already
//! rejects comments and trailing commas per RFC 8259 — no custom scanner is
//! needed to satisfy the "strict JSON only" requirement.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// A `{"jsonrpc": "2.0", "id": ..., "method": ..., "params": ...}` message.
/// `id` is `string | number` per the JSON-RPC spec; kept as raw [`Value`]
/// rather than a custom enum so malformed ids (objects, arrays) are caught
/// by validation instead of a deserialization failure that would obscure
/// the distinction between "not JSON" and "not a valid request".
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Same shape as [`Request`] but with no `id` — never answered directly.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, id, result: Some(result), error: None }
    }

    pub fn failure(id: Value, error: &RpcError) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, id, result: None, error: Some(error.to_object()) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The error taxonomy from spec.md §4.9, plus its two extension codes used
/// by the transport layer (`content_too_large`) rather than the dispatcher
/// itself.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("content too large: {0} bytes")]
    ContentTooLarge(usize),
    #[error("request timed out after {0}s")]
    RequestTimeout(u64),
    #[error("server not initialized")]
    ServerNotInitialized,
    #[error("request cancelled")]
    RequestCancelled,
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::ParseError(_) => -32700,
            RpcError::InvalidRequest(_) => -32600,
            RpcError::MethodNotFound(_) => -32601,
            RpcError::InvalidParams(_) => -32602,
            RpcError::InternalError(_) => -32603,
            RpcError::ContentTooLarge(_) => -32001,
            RpcError::RequestTimeout(_) => -32002,
            RpcError::ServerNotInitialized => -32003,
            RpcError::RequestCancelled => -32004,
        }
    }

    pub fn to_object(&self) -> RpcErrorObject {
        let data = match self {
            RpcError::RequestTimeout(seconds) => Some(Value::from(*seconds)),
            _ => None,
        };
        RpcErrorObject { code: self.code(), message: self.to_string(), data }
    }
}

impl From<crate::domain::Error> for RpcError {
    fn from(err: crate::domain::Error) -> Self {
        RpcError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_the_documented_taxonomy() {
        assert_eq!(RpcError::ParseError(String::new()).code(), -32700);
        assert_eq!(RpcError::InvalidRequest(String::new()).code(), -32600);
        assert_eq!(RpcError::MethodNotFound(String::new()).code(), -32601);
        assert_eq!(RpcError::InvalidParams(String::new()).code(), -32602);
        assert_eq!(RpcError::InternalError(String::new()).code(), -32603);
        assert_eq!(RpcError::ContentTooLarge(0).code(), -32001);
        assert_eq!(RpcError::RequestTimeout(0).code(), -32002);
        assert_eq!(RpcError::ServerNotInitialized.code(), -32003);
        assert_eq!(RpcError::RequestCancelled.code(), -32004);
    }

    #[test]
    fn strict_json_rejects_comments_and_trailing_commas() {
        let with_comment = br#"{"jsonrpc":"2.0","id":1,"method":"m" /*c*/ }"#;
        assert!(serde_json::from_slice::<Value>(with_comment).is_err());

        let with_trailing_comma = br#"{"jsonrpc":"2.0","id":1,"method":"m",}"#;
        assert!(serde_json::from_slice::<Value>(with_trailing_comma).is_err());
    }
}
