use std::sync::Arc;
use std::time::Duration;

use mcp_session::DEFAULT_REQUEST_TIMEOUT;
use mcp_transport::Transport;
use mcp_types::ClientCapabilities;
use mcp_types::Implementation;

use crate::client::Client;
use crate::error::ClientError;
use crate::handlers::SamplingHandler;

/// Constructs a [`Client`]. Validates at build time that a sampling handler
/// is supplied whenever the sampling capability is advertised, since there
/// would otherwise be no way to answer a `sampling/createMessage` request.
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    client_info: Implementation,
    capabilities: ClientCapabilities,
    sampling_handler: Option<SamplingHandler>,
    request_timeout: Duration,
}

impl ClientBuilder {
    pub fn new(transport: Arc<dyn Transport>, client_info: Implementation) -> Self {
        Self {
            transport,
            client_info,
            capabilities: ClientCapabilities::default(),
            sampling_handler: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn sampling_handler(mut self, handler: SamplingHandler) -> Self {
        self.sampling_handler = Some(handler);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds the client. Fails if the sampling capability is advertised
    /// without a registered handler.
    pub fn build(self) -> Result<Arc<Client>, ClientError> {
        if self.capabilities.sampling.is_some() && self.sampling_handler.is_none() {
            return Err(ClientError::SamplingHandlerRequired);
        }
        Ok(Client::new(
            self.transport,
            self.client_info,
            self.capabilities,
            self.sampling_handler,
            self.request_timeout,
        ))
    }
}
