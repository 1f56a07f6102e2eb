//! The server side of a Model Context Protocol session: initialization,
//! dynamic tool/resource/prompt registries with capability-gated
//! list-changed notifications, logging-level filtering, sampling outbound,
//! and roots consumption.

mod builder;
mod error;
mod handlers;
mod server;
mod sync_server;

pub use builder::ServerBuilder;
pub use error::ServerError;
pub use handlers::PromptHandler;
pub use handlers::ResourceReadHandler;
pub use handlers::RootsChangeConsumer;
pub use handlers::ToolHandler;
pub use server::Server;
pub use sync_server::SyncServer;
