//! HTTP+Server-Sent-Events transport: client and server halves.

pub mod client;
pub mod server;

pub use client::SseClientTransport;
pub use server::SseServerTransport;

pub(crate) const ENDPOINT_EVENT: &str = "endpoint";
pub(crate) const MESSAGE_EVENT: &str = "message";
