//! Handler shapes installed into a [`crate::Session`]'s routing tables.

use std::sync::Arc;

use futures::future::BoxFuture;
use mcp_types::INTERNAL_ERROR;
use serde_json::Value;

/// What an inbound request handler failed with. Surfaced to the peer as a
/// JSON-RPC error response carrying this `code`/`message`.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub code: i64,
    pub message: String,
}

impl HandlerFailure {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: message.into(),
        }
    }

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for HandlerFailure {}

/// Produces the `result` payload for a registered request method, or a
/// failure that becomes a JSON-RPC error response.
pub type RequestHandler =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, Result<Value, HandlerFailure>> + Send + Sync>;

/// Handles a registered notification method. Failures are logged by the
/// session and never surfaced to the peer.
pub type NotificationHandler =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
