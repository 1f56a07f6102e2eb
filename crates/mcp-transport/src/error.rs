use thiserror::Error;

/// Failure modes shared by every concrete [`crate::Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("outbound queue is full")]
    EnqueueFailed,

    #[error("transport channel is closed")]
    Closed,

    #[error("failed to spawn child process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("i/o error: {0}")]
    Io(#[source] std::io::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to parse envelope: {0}")]
    Parse(#[from] mcp_types::JSONRPCParseError),

    #[error("sse endpoint was not discovered within the bounded wait")]
    EndpointDiscoveryTimeout,

    #[error("http request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("server responded with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("unknown session id in request path")]
    UnknownSession,
}
