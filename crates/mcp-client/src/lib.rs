//! The client side of a Model Context Protocol session: initialization,
//! capability-gated typed operations, and dispatch of server-initiated
//! requests and notifications.

mod builder;
mod client;
mod error;
mod handlers;
mod sync_client;

pub use builder::ClientBuilder;
pub use client::Client;
pub use error::ClientError;
pub use handlers::LogConsumer;
pub use handlers::PromptsChangeConsumer;
pub use handlers::ResourceUpdateConsumer;
pub use handlers::ResourcesChangeConsumer;
pub use handlers::SamplingHandler;
pub use handlers::ToolsChangeConsumer;
pub use sync_client::SyncClient;
