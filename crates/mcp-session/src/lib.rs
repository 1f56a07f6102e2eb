//! The transport-agnostic JSON-RPC peer shared by the client and server
//! roles: request id generation and correlation, per-request timeouts,
//! method-name dispatch, and the session state machine.

mod error;
mod handler;
mod session;

pub use error::SessionError;
pub use handler::HandlerFailure;
pub use handler::NotificationHandler;
pub use handler::RequestHandler;
pub use session::DEFAULT_REQUEST_TIMEOUT;
pub use session::Session;
pub use session::SessionState;
