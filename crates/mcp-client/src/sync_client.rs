//! A blocking wrapper around [`Client`] for callers that are not already
//! inside a Tokio runtime, the way the bundled binary's `main` is not.

use std::sync::Arc;

use mcp_types::CallToolResult;
use mcp_types::GetPromptResult;
use mcp_types::Implementation;
use mcp_types::InitializeResult;
use mcp_types::ListPromptsResult;
use mcp_types::ListResourceTemplatesResult;
use mcp_types::ListResourcesResult;
use mcp_types::LoggingLevel;
use mcp_types::ReadResourceResult;
use mcp_types::Root;
use mcp_types::ServerCapabilities;
use serde_json::Value;
use tokio::runtime::Builder;
use tokio::runtime::Runtime;

use crate::client::Client;
use crate::error::ClientError;
use crate::handlers::ResourceUpdateConsumer;

/// Owns a dedicated multi-thread runtime and blocks on it for every
/// operation, so change-consumer callbacks still run off the session's own
/// dispatch task rather than on the calling thread.
pub struct SyncClient {
    runtime: Runtime,
    inner: Arc<Client>,
}

impl SyncClient {
    pub fn new(inner: Arc<Client>) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread().enable_all().build()?;
        Ok(Self { runtime, inner })
    }

    pub fn connect(&self) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.connect())
    }

    pub fn initialize(&self) -> Result<InitializeResult, ClientError> {
        self.runtime.block_on(self.inner.initialize())
    }

    pub fn list_tools(&self, cursor: Option<String>) -> Result<mcp_types::ListToolsResult, ClientError> {
        self.runtime.block_on(self.inner.list_tools(cursor))
    }

    pub fn call_tool(
        &self,
        name: String,
        arguments: Option<Value>,
    ) -> Result<CallToolResult, ClientError> {
        self.runtime.block_on(self.inner.call_tool(name, arguments))
    }

    pub fn list_resources(&self, cursor: Option<String>) -> Result<ListResourcesResult, ClientError> {
        self.runtime.block_on(self.inner.list_resources(cursor))
    }

    pub fn read_resource(&self, uri: String) -> Result<ReadResourceResult, ClientError> {
        self.runtime.block_on(self.inner.read_resource(uri))
    }

    pub fn list_resource_templates(
        &self,
        cursor: Option<String>,
    ) -> Result<ListResourceTemplatesResult, ClientError> {
        self.runtime.block_on(self.inner.list_resource_templates(cursor))
    }

    pub fn list_prompts(&self, cursor: Option<String>) -> Result<ListPromptsResult, ClientError> {
        self.runtime.block_on(self.inner.list_prompts(cursor))
    }

    pub fn get_prompt(
        &self,
        name: String,
        arguments: Option<Value>,
    ) -> Result<GetPromptResult, ClientError> {
        self.runtime.block_on(self.inner.get_prompt(name, arguments))
    }

    pub fn subscribe_resource(
        &self,
        uri: impl Into<String>,
        consumer: ResourceUpdateConsumer,
    ) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.subscribe_resource(uri, consumer))
    }

    pub fn unsubscribe_resource(&self, uri: impl Into<String>) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.unsubscribe_resource(uri))
    }

    pub fn set_logging_level(&self, level: LoggingLevel) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.set_logging_level(level))
    }

    pub fn ping(&self) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.ping())
    }

    pub fn add_root(&self, root: Root) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.add_root(root))
    }

    pub fn remove_root(&self, uri: &str) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.remove_root(uri))
    }

    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.inner.server_capabilities()
    }

    pub fn server_info(&self) -> Option<Implementation> {
        self.inner.server_info()
    }

    pub fn close(&self) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.close())
    }
}
