//! A blocking wrapper around [`Server`] for callers that are not already
//! inside a Tokio runtime.

use std::sync::Arc;

use mcp_types::ClientCapabilities;
use mcp_types::CreateMessageRequestParams;
use mcp_types::CreateMessageResult;
use mcp_types::Implementation;
use mcp_types::LoggingLevel;
use mcp_types::Prompt;
use mcp_types::Resource;
use mcp_types::ResourceTemplate;
use mcp_types::Root;
use mcp_types::Tool;
use serde_json::Value;
use tokio::runtime::Builder;
use tokio::runtime::Runtime;

use crate::error::ServerError;
use crate::handlers::PromptHandler;
use crate::handlers::ResourceReadHandler;
use crate::handlers::RootsChangeConsumer;
use crate::handlers::ToolHandler;
use crate::server::Server;

pub struct SyncServer {
    runtime: Runtime,
    inner: Arc<Server>,
}

impl SyncServer {
    pub fn new(inner: Arc<Server>) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread().enable_all().build()?;
        Ok(Self { runtime, inner })
    }

    pub fn connect(&self) -> Result<(), ServerError> {
        self.runtime.block_on(self.inner.connect())
    }

    pub fn add_tool(&self, tool: Tool, handler: ToolHandler) -> Result<(), ServerError> {
        self.runtime.block_on(self.inner.add_tool(tool, handler))
    }

    pub fn remove_tool(&self, name: &str) -> Result<(), ServerError> {
        self.runtime.block_on(self.inner.remove_tool(name))
    }

    pub fn add_resource(&self, resource: Resource, handler: ResourceReadHandler) -> Result<(), ServerError> {
        self.runtime.block_on(self.inner.add_resource(resource, handler))
    }

    pub fn remove_resource(&self, uri: &str) -> Result<(), ServerError> {
        self.runtime.block_on(self.inner.remove_resource(uri))
    }

    pub fn add_resource_template(&self, template: ResourceTemplate) -> Result<(), ServerError> {
        self.inner.add_resource_template(template)
    }

    pub fn remove_resource_template(&self, uri_template: &str) -> Result<(), ServerError> {
        self.inner.remove_resource_template(uri_template)
    }

    pub fn add_prompt(&self, prompt: Prompt, handler: PromptHandler) -> Result<(), ServerError> {
        self.runtime.block_on(self.inner.add_prompt(prompt, handler))
    }

    pub fn remove_prompt(&self, name: &str) -> Result<(), ServerError> {
        self.runtime.block_on(self.inner.remove_prompt(name))
    }

    pub fn notify_resource_updated(&self, uri: &str) {
        self.runtime.block_on(self.inner.notify_resource_updated(uri))
    }

    pub fn logging_notification(&self, level: LoggingLevel, logger: Option<String>, data: Value) {
        self.runtime.block_on(self.inner.logging_notification(level, logger, data))
    }

    pub fn create_message(
        &self,
        params: CreateMessageRequestParams,
    ) -> Result<CreateMessageResult, ServerError> {
        self.runtime.block_on(self.inner.create_message(params))
    }

    pub fn roots(&self) -> Result<Vec<Root>, ServerError> {
        self.runtime.block_on(self.inner.roots())
    }

    pub fn on_roots_list_changed(&self, consumer: RootsChangeConsumer) {
        self.inner.on_roots_list_changed(consumer)
    }

    pub fn client_capabilities(&self) -> Option<ClientCapabilities> {
        self.inner.client_capabilities()
    }

    pub fn client_info(&self) -> Option<Implementation> {
        self.inner.client_info()
    }

    pub fn close(&self) -> Result<(), ServerError> {
        self.runtime.block_on(self.inner.close())
    }
}
