use std::sync::Arc;
use std::time::Duration;

use mcp_session::DEFAULT_REQUEST_TIMEOUT;
use mcp_transport::Transport;
use mcp_types::Implementation;
use mcp_types::ServerCapabilities;

use crate::server::Server;

/// Constructs a [`Server`]. Tools/resources/prompts are registered after
/// construction via `Server::add_tool`/`add_resource`/`add_prompt`, so the
/// registries stay mutable for the server's whole lifetime rather than
/// fixed at build time.
pub struct ServerBuilder {
    transport: Arc<dyn Transport>,
    server_info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    request_timeout: Duration,
}

impl ServerBuilder {
    pub fn new(transport: Arc<dyn Transport>, server_info: Implementation) -> Self {
        Self {
            transport,
            server_info,
            capabilities: ServerCapabilities::default(),
            instructions: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn capabilities(mut self, capabilities: ServerCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Arc<Server> {
        Server::new(
            self.transport,
            self.server_info,
            self.capabilities,
            self.instructions,
            self.request_timeout,
        )
    }
}
