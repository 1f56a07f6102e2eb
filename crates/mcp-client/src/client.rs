use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use dashmap::DashMap;
use mcp_session::HandlerFailure;
use mcp_session::Session;
use mcp_transport::Transport;
use mcp_types::CallToolRequest;
use mcp_types::CallToolRequestParams;
use mcp_types::CallToolResult;
use mcp_types::ClientCapabilities;
use mcp_types::CreateMessageRequestParams;
use mcp_types::GetPromptRequest;
use mcp_types::GetPromptRequestParams;
use mcp_types::GetPromptResult;
use mcp_types::Implementation;
use mcp_types::InitializeRequest;
use mcp_types::InitializeRequestParams;
use mcp_types::InitializeResult;
use mcp_types::InitializedNotification;
use mcp_types::ListPromptsRequest;
use mcp_types::ListPromptsRequestParams;
use mcp_types::ListPromptsResult;
use mcp_types::ListResourceTemplatesRequest;
use mcp_types::ListResourceTemplatesRequestParams;
use mcp_types::ListResourceTemplatesResult;
use mcp_types::ListResourcesRequest;
use mcp_types::ListResourcesRequestParams;
use mcp_types::ListResourcesResult;
use mcp_types::ListRootsResult;
use mcp_types::ListToolsRequest;
use mcp_types::ListToolsRequestParams;
use mcp_types::ListToolsResult;
use mcp_types::LoggingMessageNotificationParams;
use mcp_types::PingRequest;
use mcp_types::ReadResourceRequest;
use mcp_types::ReadResourceRequestParams;
use mcp_types::ReadResourceResult;
use mcp_types::ResourceUpdatedNotificationParams;
use mcp_types::Root;
use mcp_types::RootsListChangedNotification;
use mcp_types::ServerCapabilities;
use mcp_types::SetLevelRequest;
use mcp_types::SetLevelRequestParams;
use mcp_types::LoggingLevel;
use mcp_types::SubscribeRequest;
use mcp_types::SubscribeRequestParams;
use mcp_types::SUPPORTED_PROTOCOL_VERSIONS;
use mcp_types::LATEST_PROTOCOL_VERSION;
use mcp_types::UnsubscribeRequest;
use mcp_types::UnsubscribeRequestParams;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::error::ClientError;
use crate::handlers::LogConsumer;
use crate::handlers::PromptsChangeConsumer;
use crate::handlers::ResourceUpdateConsumer;
use crate::handlers::ResourcesChangeConsumer;
use crate::handlers::SamplingHandler;
use crate::handlers::ToolsChangeConsumer;

struct ServerState {
    capabilities: ServerCapabilities,
    info: Implementation,
    negotiated_protocol_version: String,
}

/// The client side of an MCP session: owns a [`Session`], negotiates
/// initialization, and exposes the capability-gated typed operations a host
/// application drives a server through.
pub struct Client {
    session: Arc<Session>,
    client_info: Implementation,
    capabilities: ClientCapabilities,
    server_state: StdMutex<Option<ServerState>>,
    roots: DashMap<String, Root>,
    sampling_handler: Option<SamplingHandler>,
    tools_consumers: StdMutex<Vec<ToolsChangeConsumer>>,
    resources_consumers: StdMutex<Vec<ResourcesChangeConsumer>>,
    prompts_consumers: StdMutex<Vec<PromptsChangeConsumer>>,
    log_consumers: StdMutex<Vec<LogConsumer>>,
    resource_update_consumers: DashMap<String, ResourceUpdateConsumer>,
}

impl Client {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        client_info: Implementation,
        capabilities: ClientCapabilities,
        sampling_handler: Option<SamplingHandler>,
        request_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            session: Session::new(transport, request_timeout),
            client_info,
            capabilities,
            server_state: StdMutex::new(None),
            roots: DashMap::new(),
            sampling_handler,
            tools_consumers: StdMutex::new(Vec::new()),
            resources_consumers: StdMutex::new(Vec::new()),
            prompts_consumers: StdMutex::new(Vec::new()),
            log_consumers: StdMutex::new(Vec::new()),
            resource_update_consumers: DashMap::new(),
        })
    }

    /// Installs the inbound dispatch handlers and connects the transport.
    /// Must be called before [`Self::initialize`].
    pub async fn connect(self: &Arc<Self>) -> Result<(), ClientError> {
        self.register_handlers();
        self.session.start().await?;
        Ok(())
    }

    fn register_handlers(self: &Arc<Self>) {
        if self.capabilities.roots.is_some() {
            let this = self.clone();
            self.session.register_request_handler(
                "roots/list",
                Arc::new(move |_params| {
                    let this = this.clone();
                    Box::pin(async move {
                        let roots: Vec<Root> =
                            this.roots.iter().map(|entry| entry.value().clone()).collect();
                        serde_json::to_value(ListRootsResult { roots })
                            .map_err(|err| HandlerFailure::internal(err.to_string()))
                    })
                }),
            );
        }

        if let Some(handler) = self.sampling_handler.clone() {
            self.session.register_request_handler(
                "sampling/createMessage",
                Arc::new(move |params| {
                    let handler = handler.clone();
                    Box::pin(async move {
                        let params: CreateMessageRequestParams = params
                            .ok_or_else(|| HandlerFailure::internal("missing sampling params"))
                            .and_then(|value| {
                                serde_json::from_value(value)
                                    .map_err(|err| HandlerFailure::internal(err.to_string()))
                            })?;
                        let result = handler(params).await?;
                        serde_json::to_value(result)
                            .map_err(|err| HandlerFailure::internal(err.to_string()))
                    })
                }),
            );
        }

        let this = self.clone();
        self.session.register_notification_handler(
            "notifications/tools/list_changed",
            Arc::new(move |_params| {
                let this = this.clone();
                Box::pin(async move { this.handle_tools_list_changed().await })
            }),
        );

        let this = self.clone();
        self.session.register_notification_handler(
            "notifications/resources/list_changed",
            Arc::new(move |_params| {
                let this = this.clone();
                Box::pin(async move { this.handle_resources_list_changed().await })
            }),
        );

        let this = self.clone();
        self.session.register_notification_handler(
            "notifications/prompts/list_changed",
            Arc::new(move |_params| {
                let this = this.clone();
                Box::pin(async move { this.handle_prompts_list_changed().await })
            }),
        );

        let this = self.clone();
        self.session.register_notification_handler(
            "notifications/resources/updated",
            Arc::new(move |params| {
                let this = this.clone();
                Box::pin(async move { this.handle_resource_updated(params).await })
            }),
        );

        let this = self.clone();
        self.session.register_notification_handler(
            "notifications/message",
            Arc::new(move |params| {
                let this = this.clone();
                Box::pin(async move { this.handle_log_message(params).await })
            }),
        );
    }

    async fn handle_tools_list_changed(self: Arc<Self>) -> anyhow::Result<()> {
        let result = self.session.call::<ListToolsRequest>(None).await?;
        let consumers = self.tools_consumers.lock().unwrap().clone();
        for consumer in consumers {
            if let Err(err) = consumer(result.tools.clone()).await {
                warn!(%err, "tools change consumer failed");
            }
        }
        Ok(())
    }

    async fn handle_resources_list_changed(self: Arc<Self>) -> anyhow::Result<()> {
        let result = self.session.call::<ListResourcesRequest>(None).await?;
        let consumers = self.resources_consumers.lock().unwrap().clone();
        for consumer in consumers {
            if let Err(err) = consumer(result.resources.clone()).await {
                warn!(%err, "resources change consumer failed");
            }
        }
        Ok(())
    }

    async fn handle_prompts_list_changed(self: Arc<Self>) -> anyhow::Result<()> {
        let result = self.session.call::<ListPromptsRequest>(None).await?;
        let consumers = self.prompts_consumers.lock().unwrap().clone();
        for consumer in consumers {
            if let Err(err) = consumer(result.prompts.clone()).await {
                warn!(%err, "prompts change consumer failed");
            }
        }
        Ok(())
    }

    async fn handle_resource_updated(self: Arc<Self>, params: Option<Value>) -> anyhow::Result<()> {
        let params: ResourceUpdatedNotificationParams = params
            .ok_or_else(|| anyhow::anyhow!("resources/updated notification missing params"))
            .and_then(|value| Ok(serde_json::from_value(value)?))?;
        match self.resource_update_consumers.get(&params.uri) {
            Some(consumer) => consumer(params.uri.clone()).await,
            None => {
                debug!(uri = %params.uri, "resource update with no registered subscriber");
                Ok(())
            }
        }
    }

    async fn handle_log_message(self: Arc<Self>, params: Option<Value>) -> anyhow::Result<()> {
        let params: LoggingMessageNotificationParams = params
            .ok_or_else(|| anyhow::anyhow!("notifications/message missing params"))
            .and_then(|value| Ok(serde_json::from_value(value)?))?;
        let consumers = self.log_consumers.lock().unwrap().clone();
        for consumer in consumers {
            if let Err(err) = consumer(params.clone()).await {
                warn!(%err, "log consumer failed");
            }
        }
        Ok(())
    }

    /// Sends `initialize` with this client's newest supported protocol
    /// version, verifies the server's chosen version, records its
    /// capabilities, and sends `notifications/initialized`.
    pub async fn initialize(&self) -> Result<InitializeResult, ClientError> {
        if self.server_state.lock().unwrap().is_some() {
            return Err(ClientError::AlreadyInitialized);
        }

        let params = InitializeRequestParams {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities.clone(),
            client_info: self.client_info.clone(),
        };
        let result = self.session.call::<InitializeRequest>(params).await?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&result.protocol_version.as_str()) {
            return Err(ClientError::UnsupportedProtocolVersion {
                chosen: result.protocol_version.clone(),
            });
        }

        *self.server_state.lock().unwrap() = Some(ServerState {
            capabilities: result.capabilities.clone(),
            info: result.server_info.clone(),
            negotiated_protocol_version: result.protocol_version.clone(),
        });

        self.session.notify::<InitializedNotification>(None).await?;
        Ok(result)
    }

    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.server_state.lock().unwrap().as_ref().map(|s| s.capabilities.clone())
    }

    pub fn server_info(&self) -> Option<Implementation> {
        self.server_state.lock().unwrap().as_ref().map(|s| s.info.clone())
    }

    pub fn negotiated_protocol_version(&self) -> Option<String> {
        self.server_state
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.negotiated_protocol_version.clone())
    }

    fn capability_gate(
        &self,
        name: &'static str,
        predicate: impl FnOnce(&ServerCapabilities) -> bool,
    ) -> Result<(), ClientError> {
        let guard = self.server_state.lock().unwrap();
        let state = guard.as_ref().ok_or(ClientError::NotInitialized(name))?;
        if predicate(&state.capabilities) {
            Ok(())
        } else {
            Err(ClientError::MissingServerCapability(name))
        }
    }

    pub async fn list_tools(&self, cursor: Option<String>) -> Result<ListToolsResult, ClientError> {
        self.capability_gate("tools", |c| c.tools.is_some())?;
        Ok(self
            .session
            .call::<ListToolsRequest>(Some(ListToolsRequestParams { cursor }))
            .await?)
    }

    pub async fn call_tool(
        &self,
        name: String,
        arguments: Option<Value>,
    ) -> Result<CallToolResult, ClientError> {
        self.capability_gate("tools", |c| c.tools.is_some())?;
        Ok(self
            .session
            .call::<CallToolRequest>(CallToolRequestParams { name, arguments })
            .await?)
    }

    pub async fn list_resources(
        &self,
        cursor: Option<String>,
    ) -> Result<ListResourcesResult, ClientError> {
        self.capability_gate("resources", |c| c.resources.is_some())?;
        Ok(self
            .session
            .call::<ListResourcesRequest>(Some(ListResourcesRequestParams { cursor }))
            .await?)
    }

    pub async fn read_resource(&self, uri: String) -> Result<ReadResourceResult, ClientError> {
        self.capability_gate("resources", |c| c.resources.is_some())?;
        Ok(self
            .session
            .call::<ReadResourceRequest>(ReadResourceRequestParams { uri })
            .await?)
    }

    pub async fn list_resource_templates(
        &self,
        cursor: Option<String>,
    ) -> Result<ListResourceTemplatesResult, ClientError> {
        self.capability_gate("resources", |c| c.resources.is_some())?;
        Ok(self
            .session
            .call::<ListResourceTemplatesRequest>(Some(ListResourceTemplatesRequestParams {
                cursor,
            }))
            .await?)
    }

    pub async fn list_prompts(&self, cursor: Option<String>) -> Result<ListPromptsResult, ClientError> {
        self.capability_gate("prompts", |c| c.prompts.is_some())?;
        Ok(self
            .session
            .call::<ListPromptsRequest>(Some(ListPromptsRequestParams { cursor }))
            .await?)
    }

    pub async fn get_prompt(
        &self,
        name: String,
        arguments: Option<Value>,
    ) -> Result<GetPromptResult, ClientError> {
        self.capability_gate("prompts", |c| c.prompts.is_some())?;
        Ok(self
            .session
            .call::<GetPromptRequest>(GetPromptRequestParams { name, arguments })
            .await?)
    }

    pub async fn subscribe_resource(
        &self,
        uri: impl Into<String>,
        consumer: ResourceUpdateConsumer,
    ) -> Result<(), ClientError> {
        self.capability_gate("resources.subscribe", |c| {
            c.resources.as_ref().and_then(|r| r.subscribe).unwrap_or(false)
        })?;
        let uri = uri.into();
        self.session
            .call::<SubscribeRequest>(SubscribeRequestParams { uri: uri.clone() })
            .await?;
        self.resource_update_consumers.insert(uri, consumer);
        Ok(())
    }

    pub async fn unsubscribe_resource(&self, uri: impl Into<String>) -> Result<(), ClientError> {
        self.capability_gate("resources.subscribe", |c| {
            c.resources.as_ref().and_then(|r| r.subscribe).unwrap_or(false)
        })?;
        let uri = uri.into();
        self.session
            .call::<UnsubscribeRequest>(UnsubscribeRequestParams { uri: uri.clone() })
            .await?;
        self.resource_update_consumers.remove(&uri);
        Ok(())
    }

    pub async fn set_logging_level(&self, level: LoggingLevel) -> Result<(), ClientError> {
        self.capability_gate("logging", |c| c.logging.is_some())?;
        self.session
            .call::<SetLevelRequest>(SetLevelRequestParams { level })
            .await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        self.session.call::<PingRequest>(None).await?;
        Ok(())
    }

    pub async fn add_root(&self, root: Root) -> Result<(), ClientError> {
        self.roots.insert(root.uri.clone(), root);
        self.notify_roots_list_changed_if_enabled().await
    }

    pub async fn remove_root(&self, uri: &str) -> Result<(), ClientError> {
        self.roots.remove(uri);
        self.notify_roots_list_changed_if_enabled().await
    }

    async fn notify_roots_list_changed_if_enabled(&self) -> Result<(), ClientError> {
        let should_notify = self
            .capabilities
            .roots
            .as_ref()
            .and_then(|r| r.list_changed)
            .unwrap_or(false);
        if should_notify {
            self.send_roots_list_changed().await?;
        }
        Ok(())
    }

    pub async fn send_roots_list_changed(&self) -> Result<(), ClientError> {
        self.session.notify::<RootsListChangedNotification>(None).await?;
        Ok(())
    }

    pub fn on_tools_list_changed(&self, consumer: ToolsChangeConsumer) {
        self.tools_consumers.lock().unwrap().push(consumer);
    }

    pub fn on_resources_list_changed(&self, consumer: ResourcesChangeConsumer) {
        self.resources_consumers.lock().unwrap().push(consumer);
    }

    pub fn on_prompts_list_changed(&self, consumer: PromptsChangeConsumer) {
        self.prompts_consumers.lock().unwrap().push(consumer);
    }

    pub fn on_log_message(&self, consumer: LogConsumer) {
        self.log_consumers.lock().unwrap().push(consumer);
    }

    pub async fn close(&self) -> Result<(), ClientError> {
        Ok(self.session.close_gracefully().await?)
    }
}
