use serde_json::Value;
use thiserror::Error;

/// Failure modes surfaced by [`crate::Session`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is not running")]
    NotRunning,

    #[error("session is closed")]
    Closed,

    #[error("request timed out")]
    Timeout,

    #[error("peer returned error {code}: {message}")]
    Protocol {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error(transparent)]
    Transport(#[from] mcp_transport::TransportError),
}

impl From<mcp_types::JSONRPCErrorError> for SessionError {
    fn from(error: mcp_types::JSONRPCErrorError) -> Self {
        SessionError::Protocol {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}
