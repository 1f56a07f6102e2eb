use mcp_session::SessionError;

/// Failure modes surfaced by the client role, layered over [`SessionError`]
/// so a transport or protocol failure keeps its cause chain.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("server does not advertise the `{0}` capability")]
    MissingServerCapability(&'static str),

    #[error(
        "server chose protocol version `{chosen}`, which is not in this client's supported list"
    )]
    UnsupportedProtocolVersion { chosen: String },

    #[error("client is already initialized")]
    AlreadyInitialized,

    #[error("client must be initialized before calling `{0}`")]
    NotInitialized(&'static str),

    #[error("sampling capability is advertised but no sampling handler was registered")]
    SamplingHandlerRequired,

    #[error(transparent)]
    Session(#[from] SessionError),
}
