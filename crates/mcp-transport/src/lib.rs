//! Transport implementations for the Model Context Protocol.
//!
//! A [`Transport`] delivers framed JSON-RPC envelopes between two peers in
//! order, in both directions, independent of whatever runs on top of it
//! (that is `mcp-session`'s job). Two concrete variants are provided: a
//! line-delimited child-process transport ([`stdio`]) and an HTTP+SSE
//! transport ([`sse`]).

pub mod error;
pub mod framing;
mod queue;
pub mod sse;
pub mod stdio;

pub use error::TransportError;

use std::sync::Arc;

use futures::future::BoxFuture;
use mcp_types::JSONRPCMessage;
use serde::de::DeserializeOwned;

/// Invoked for every inbound envelope. A returned message (if any) is the
/// caller's responsibility to route back out; in practice a Session
/// installs itself as this handler and never returns one directly, instead
/// driving its own outbound path.
pub type InboundHandler =
    Arc<dyn Fn(JSONRPCMessage) -> BoxFuture<'static, Option<JSONRPCMessage>> + Send + Sync>;

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Begin bidirectional operation. Resolves once the underlying channel
    /// is established (process spawned, SSE endpoint discovered, ...);
    /// `handler` is installed before this resolves, so no inbound message
    /// can be observed by the caller before the handler is in place.
    async fn connect(&self, handler: InboundHandler) -> Result<(), TransportError>;

    /// Enqueue `message` for transmission. Resolves once the message has
    /// been accepted into the outbound queue, not once the peer has
    /// received it. Fails fast with [`TransportError::EnqueueFailed`] if
    /// the bounded queue is full.
    async fn send_message(&self, message: JSONRPCMessage) -> Result<(), TransportError>;

    /// Stop accepting new outbound traffic, flush what's queued, and
    /// release the transport's resources.
    async fn close_gracefully(&self) -> Result<(), TransportError>;
}

/// Decode a raw JSON value into a declared payload type. Used by request
/// and notification handlers to decode `params`.
pub fn unmarshal<T: DeserializeOwned>(raw: serde_json::Value) -> Result<T, TransportError> {
    serde_json::from_value(raw).map_err(TransportError::Decode)
}
