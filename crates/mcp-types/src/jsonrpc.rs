//! JSON-RPC 2.0 envelopes shared by every MCP message.
//!
//! A wire message is one of four shapes, discriminated by the presence of
//! `id`/`method`/`result`/`error` per the JSON-RPC 2.0 spec. [`JSONRPCMessage`]
//! is the untagged union a transport reads off the wire; [`JSONRPCMessage::parse`]
//! is the single entry point that performs the discrimination described in the
//! data model.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use ts_rs::TS;

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC error codes. The MCP-specific codes are not standardized; only
/// the four generic ones below are part of the JSON-RPC 2.0 spec.
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Identifies a request/response pair. A session only ever generates integer
/// ids (see `mcp-session`), but the wire format allows strings too, so both
/// must round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(type = "string | number")]
pub enum RequestId {
    String(String),
    Integer(i64),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Integer(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct JSONRPCRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct JSONRPCNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct JSONRPCResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct JSONRPCErrorError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct JSONRPCError {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: JSONRPCErrorError,
}

impl JSONRPCError {
    pub fn new(id: RequestId, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JSONRPCErrorError {
                code,
                message: message.into(),
                data: None,
            },
        }
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }
}

/// The four message shapes a peer may send, distinguished by the rules in
/// the data model: a `method` without `id` is a notification, a `method`
/// with `id` is a request, and otherwise the `result`/`error` field
/// distinguishes a response from an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
pub enum JSONRPCMessage {
    Request(JSONRPCRequest),
    Notification(JSONRPCNotification),
    Response(JSONRPCResponse),
    Error(JSONRPCError),
}

#[derive(Debug, thiserror::Error)]
pub enum JSONRPCParseError {
    #[error("not a JSON object")]
    NotAnObject,
    #[error("message has neither `method` nor `result`/`error`")]
    Unrecognized,
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl JSONRPCMessage {
    /// Maps a raw JSON value to one of {request, response, notification,
    /// error} by the discrimination rules in the data model, rather than
    /// relying solely on serde's untagged-enum field probing (which would
    /// accept garbage shapes as whichever variant happens to parse first).
    pub fn parse(value: Value) -> Result<Self, JSONRPCParseError> {
        let obj = value.as_object().ok_or(JSONRPCParseError::NotAnObject)?;
        if obj.contains_key("method") {
            if obj.contains_key("id") {
                Ok(JSONRPCMessage::Request(serde_json::from_value(value)?))
            } else {
                Ok(JSONRPCMessage::Notification(serde_json::from_value(
                    value,
                )?))
            }
        } else if obj.contains_key("error") {
            Ok(JSONRPCMessage::Error(serde_json::from_value(value)?))
        } else if obj.contains_key("result") {
            Ok(JSONRPCMessage::Response(serde_json::from_value(value)?))
        } else {
            Err(JSONRPCParseError::Unrecognized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_request() {
        let value = json!({"jsonrpc":"2.0","id":1,"method":"ping"});
        let msg = JSONRPCMessage::parse(value).unwrap();
        assert_eq!(
            msg,
            JSONRPCMessage::Request(JSONRPCRequest {
                jsonrpc: "2.0".into(),
                id: RequestId::Integer(1),
                method: "ping".into(),
                params: None,
            })
        );
    }

    #[test]
    fn parses_notification() {
        let value = json!({"jsonrpc":"2.0","method":"notifications/initialized"});
        let msg = JSONRPCMessage::parse(value).unwrap();
        assert!(matches!(msg, JSONRPCMessage::Notification(_)));
    }

    #[test]
    fn parses_error_response() {
        let value = json!({"jsonrpc":"2.0","id":"x-7","error":{"code":-32601,"message":"Method not found: unknown.method"}});
        let msg = JSONRPCMessage::parse(value).unwrap();
        assert_eq!(
            msg,
            JSONRPCMessage::Error(JSONRPCError {
                jsonrpc: "2.0".into(),
                id: RequestId::String("x-7".into()),
                error: JSONRPCErrorError {
                    code: METHOD_NOT_FOUND,
                    message: "Method not found: unknown.method".into(),
                    data: None,
                },
            })
        );
    }

    #[test]
    fn round_trips_every_shape() {
        let messages = vec![
            JSONRPCMessage::Request(JSONRPCRequest {
                jsonrpc: "2.0".into(),
                id: RequestId::Integer(7),
                method: "tools/list".into(),
                params: Some(json!({"cursor": "abc"})),
            }),
            JSONRPCMessage::Notification(JSONRPCNotification {
                jsonrpc: "2.0".into(),
                method: "notifications/message".into(),
                params: None,
            }),
            JSONRPCMessage::Response(JSONRPCResponse {
                jsonrpc: "2.0".into(),
                id: RequestId::String("c-0".into()),
                result: json!({"ok": true}),
            }),
        ];
        for msg in messages {
            let value = serde_json::to_value(&msg).unwrap();
            let parsed = JSONRPCMessage::parse(value).unwrap();
            assert_eq!(msg, parsed);
        }
    }
}
