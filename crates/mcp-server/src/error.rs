use mcp_session::SessionError;

/// Failure modes surfaced by the server role, layered over [`SessionError`]
/// so a transport or protocol failure keeps its cause chain.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server is already initialized")]
    AlreadyInitialized,

    #[error("server must be initialized before calling `{0}`")]
    NotInitialized(&'static str),

    #[error("the `{0}` capability is not advertised by this server")]
    MissingOwnCapability(&'static str),

    #[error("client does not advertise the `{0}` capability")]
    MissingClientCapability(&'static str),

    #[error("tool `{0}` is already registered")]
    ToolAlreadyRegistered(String),

    #[error("tool `{0}` is not registered")]
    ToolNotFound(String),

    #[error("resource `{0}` is already registered")]
    ResourceAlreadyRegistered(String),

    #[error("resource `{0}` is not registered")]
    ResourceNotFound(String),

    #[error("resource template `{0}` is already registered")]
    ResourceTemplateAlreadyRegistered(String),

    #[error("resource template `{0}` is not registered")]
    ResourceTemplateNotFound(String),

    #[error("prompt `{0}` is already registered")]
    PromptAlreadyRegistered(String),

    #[error("prompt `{0}` is not registered")]
    PromptNotFound(String),

    #[error("uri `{0}` is not subscribed")]
    NotSubscribed(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}
