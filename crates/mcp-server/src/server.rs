use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use dashmap::DashMap;
use mcp_session::HandlerFailure;
use mcp_session::Session;
use mcp_transport::Transport;
use mcp_types::CallToolRequestParams;
use mcp_types::CallToolResult;
use mcp_types::ClientCapabilities;
use mcp_types::CreateMessageRequest;
use mcp_types::CreateMessageRequestParams;
use mcp_types::CreateMessageResult;
use mcp_types::EmptyResult;
use mcp_types::GetPromptRequestParams;
use mcp_types::GetPromptResult;
use mcp_types::Implementation;
use mcp_types::InitializeRequestParams;
use mcp_types::InitializeResult;
use mcp_types::INVALID_PARAMS;
use mcp_types::INVALID_REQUEST;
use mcp_types::ListPromptsResult;
use mcp_types::ListResourceTemplatesResult;
use mcp_types::ListResourcesResult;
use mcp_types::ListRootsRequest;
use mcp_types::ListToolsResult;
use mcp_types::LoggingLevel;
use mcp_types::LoggingMessageNotification;
use mcp_types::LoggingMessageNotificationParams;
use mcp_types::Prompt;
use mcp_types::PromptListChangedNotification;
use mcp_types::ReadResourceRequestParams;
use mcp_types::ReadResourceResult;
use mcp_types::Resource;
use mcp_types::ResourceListChangedNotification;
use mcp_types::ResourceTemplate;
use mcp_types::ResourceUpdatedNotification;
use mcp_types::ResourceUpdatedNotificationParams;
use mcp_types::Root;
use mcp_types::ServerCapabilities;
use mcp_types::SetLevelRequestParams;
use mcp_types::SUPPORTED_PROTOCOL_VERSIONS;
use mcp_types::SubscribeRequestParams;
use mcp_types::Tool;
use mcp_types::ToolListChangedNotification;
use mcp_types::UnsubscribeRequestParams;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::error::ServerError;
use crate::handlers::PromptHandler;
use crate::handlers::ResourceReadHandler;
use crate::handlers::RootsChangeConsumer;
use crate::handlers::ToolHandler;

struct ClientState {
    capabilities: ClientCapabilities,
    info: Implementation,
}

/// The server side of an MCP session: owns a [`Session`], answers
/// `initialize`, and hosts the dynamic tool/resource/prompt registries a
/// host application builds its capabilities out of.
pub struct Server {
    session: Arc<Session>,
    server_info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    client_state: StdMutex<Option<ClientState>>,
    tools: DashMap<String, (Tool, ToolHandler)>,
    resources: DashMap<String, (Resource, ResourceReadHandler)>,
    resource_templates: DashMap<String, ResourceTemplate>,
    prompts: DashMap<String, (Prompt, PromptHandler)>,
    subscribed_uris: DashMap<String, ()>,
    min_logging_level: StdMutex<LoggingLevel>,
    roots_consumers: StdMutex<Vec<RootsChangeConsumer>>,
}

impl Server {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        server_info: Implementation,
        capabilities: ServerCapabilities,
        instructions: Option<String>,
        request_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            session: Session::new(transport, request_timeout),
            server_info,
            capabilities,
            instructions,
            client_state: StdMutex::new(None),
            tools: DashMap::new(),
            resources: DashMap::new(),
            resource_templates: DashMap::new(),
            prompts: DashMap::new(),
            subscribed_uris: DashMap::new(),
            min_logging_level: StdMutex::new(LoggingLevel::Debug),
            roots_consumers: StdMutex::new(Vec::new()),
        })
    }

    /// Installs the inbound dispatch handlers and connects the transport.
    /// Must be called before the peer's `initialize` request arrives.
    pub async fn connect(self: &Arc<Self>) -> Result<(), ServerError> {
        self.register_handlers();
        self.session.start().await?;
        Ok(())
    }

    fn register_handlers(self: &Arc<Self>) {
        let this = self.clone();
        self.session.register_request_handler(
            "initialize",
            Arc::new(move |params| {
                let this = this.clone();
                Box::pin(async move { this.handle_initialize(params).await })
            }),
        );

        self.session.register_request_handler(
            "ping",
            Arc::new(move |_params| {
                Box::pin(async move {
                    serde_json::to_value(EmptyResult::default())
                        .map_err(|err| HandlerFailure::internal(err.to_string()))
                })
            }),
        );

        let this = self.clone();
        self.session.register_request_handler(
            "tools/list",
            Arc::new(move |_params| {
                let this = this.clone();
                Box::pin(async move { this.handle_list_tools().await })
            }),
        );

        let this = self.clone();
        self.session.register_request_handler(
            "tools/call",
            Arc::new(move |params| {
                let this = this.clone();
                Box::pin(async move { this.handle_call_tool(params).await })
            }),
        );

        let this = self.clone();
        self.session.register_request_handler(
            "resources/list",
            Arc::new(move |_params| {
                let this = this.clone();
                Box::pin(async move { this.handle_list_resources().await })
            }),
        );

        let this = self.clone();
        self.session.register_request_handler(
            "resources/templates/list",
            Arc::new(move |_params| {
                let this = this.clone();
                Box::pin(async move { this.handle_list_resource_templates().await })
            }),
        );

        let this = self.clone();
        self.session.register_request_handler(
            "resources/read",
            Arc::new(move |params| {
                let this = this.clone();
                Box::pin(async move { this.handle_read_resource(params).await })
            }),
        );

        let this = self.clone();
        self.session.register_request_handler(
            "resources/subscribe",
            Arc::new(move |params| {
                let this = this.clone();
                Box::pin(async move { this.handle_subscribe(params).await })
            }),
        );

        let this = self.clone();
        self.session.register_request_handler(
            "resources/unsubscribe",
            Arc::new(move |params| {
                let this = this.clone();
                Box::pin(async move { this.handle_unsubscribe(params).await })
            }),
        );

        let this = self.clone();
        self.session.register_request_handler(
            "prompts/list",
            Arc::new(move |_params| {
                let this = this.clone();
                Box::pin(async move { this.handle_list_prompts().await })
            }),
        );

        let this = self.clone();
        self.session.register_request_handler(
            "prompts/get",
            Arc::new(move |params| {
                let this = this.clone();
                Box::pin(async move { this.handle_get_prompt(params).await })
            }),
        );

        let this = self.clone();
        self.session.register_request_handler(
            "logging/setLevel",
            Arc::new(move |params| {
                let this = this.clone();
                Box::pin(async move { this.handle_set_level(params).await })
            }),
        );

        self.session.register_notification_handler(
            "notifications/initialized",
            Arc::new(move |_params| Box::pin(async { Ok(()) })),
        );

        let this = self.clone();
        self.session.register_notification_handler(
            "notifications/roots/list_changed",
            Arc::new(move |_params| {
                let this = this.clone();
                Box::pin(async move { this.handle_roots_list_changed().await })
            }),
        );
    }

    // -- initialize ---------------------------------------------------

    async fn handle_initialize(self: Arc<Self>, params: Option<Value>) -> Result<Value, HandlerFailure> {
        if self.client_state.lock().unwrap().is_some() {
            return Err(HandlerFailure::new(INVALID_REQUEST, "initialize called more than once"));
        }

        let params: InitializeRequestParams = params
            .ok_or_else(|| HandlerFailure::new(INVALID_PARAMS, "missing initialize params"))
            .and_then(|value| {
                serde_json::from_value(value).map_err(|err| HandlerFailure::new(INVALID_PARAMS, err.to_string()))
            })?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            return Err(HandlerFailure::new(
                INVALID_PARAMS,
                format!("unsupported protocol version `{}`", params.protocol_version),
            ));
        }

        let protocol_version = params.protocol_version.clone();
        *self.client_state.lock().unwrap() = Some(ClientState {
            capabilities: params.capabilities,
            info: params.client_info,
        });

        let result = InitializeResult {
            protocol_version,
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        };
        serde_json::to_value(result).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    pub fn client_capabilities(&self) -> Option<ClientCapabilities> {
        self.client_state.lock().unwrap().as_ref().map(|s| s.capabilities.clone())
    }

    pub fn client_info(&self) -> Option<Implementation> {
        self.client_state.lock().unwrap().as_ref().map(|s| s.info.clone())
    }

    fn require_client_capability(
        &self,
        name: &'static str,
        predicate: impl FnOnce(&ClientCapabilities) -> bool,
    ) -> Result<(), ServerError> {
        let guard = self.client_state.lock().unwrap();
        let state = guard.as_ref().ok_or(ServerError::NotInitialized(name))?;
        if predicate(&state.capabilities) {
            Ok(())
        } else {
            Err(ServerError::MissingClientCapability(name))
        }
    }

    // -- tools ----------------------------------------------------------

    pub async fn add_tool(&self, tool: Tool, handler: ToolHandler) -> Result<(), ServerError> {
        let list_changed = self
            .capabilities
            .tools
            .as_ref()
            .ok_or(ServerError::MissingOwnCapability("tools"))?
            .list_changed;
        if self.tools.contains_key(&tool.name) {
            return Err(ServerError::ToolAlreadyRegistered(tool.name));
        }
        self.tools.insert(tool.name.clone(), (tool, handler));
        if list_changed == Some(true) {
            self.notify_tools_list_changed().await;
        }
        Ok(())
    }

    pub async fn remove_tool(&self, name: &str) -> Result<(), ServerError> {
        let list_changed = self.capabilities.tools.as_ref().and_then(|c| c.list_changed);
        if self.tools.remove(name).is_none() {
            return Err(ServerError::ToolNotFound(name.to_string()));
        }
        if list_changed == Some(true) {
            self.notify_tools_list_changed().await;
        }
        Ok(())
    }

    pub async fn notify_tools_list_changed(&self) {
        if let Err(err) = self.session.notify::<ToolListChangedNotification>(None).await {
            warn!(%err, "failed to send tools list-changed notification");
        }
    }

    async fn handle_list_tools(&self) -> Result<Value, HandlerFailure> {
        let tools: Vec<Tool> = self.tools.iter().map(|entry| entry.value().0.clone()).collect();
        let result = ListToolsResult { tools, next_cursor: None };
        serde_json::to_value(result).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, HandlerFailure> {
        let params: CallToolRequestParams = params
            .ok_or_else(|| HandlerFailure::new(INVALID_PARAMS, "missing tools/call params"))
            .and_then(|value| {
                serde_json::from_value(value).map_err(|err| HandlerFailure::new(INVALID_PARAMS, err.to_string()))
            })?;

        let handler = self.tools.get(&params.name).map(|entry| entry.value().1.clone());
        let result = match handler {
            Some(handler) => handler(params.arguments).await,
            None => CallToolResult::error(format!("Unknown tool '{}'", params.name)),
        };
        serde_json::to_value(result).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    // -- resources --------------------------------------------------------

    pub async fn add_resource(&self, resource: Resource, handler: ResourceReadHandler) -> Result<(), ServerError> {
        let list_changed = self
            .capabilities
            .resources
            .as_ref()
            .ok_or(ServerError::MissingOwnCapability("resources"))?
            .list_changed;
        if self.resources.contains_key(&resource.uri) {
            return Err(ServerError::ResourceAlreadyRegistered(resource.uri));
        }
        self.resources.insert(resource.uri.clone(), (resource, handler));
        if list_changed == Some(true) {
            self.notify_resources_list_changed().await;
        }
        Ok(())
    }

    pub async fn remove_resource(&self, uri: &str) -> Result<(), ServerError> {
        let list_changed = self.capabilities.resources.as_ref().and_then(|c| c.list_changed);
        if self.resources.remove(uri).is_none() {
            return Err(ServerError::ResourceNotFound(uri.to_string()));
        }
        self.subscribed_uris.remove(uri);
        if list_changed == Some(true) {
            self.notify_resources_list_changed().await;
        }
        Ok(())
    }

    pub fn add_resource_template(&self, template: ResourceTemplate) -> Result<(), ServerError> {
        self.capabilities
            .resources
            .as_ref()
            .ok_or(ServerError::MissingOwnCapability("resources"))?;
        if self.resource_templates.contains_key(&template.uri_template) {
            return Err(ServerError::ResourceTemplateAlreadyRegistered(template.uri_template));
        }
        self.resource_templates.insert(template.uri_template.clone(), template);
        Ok(())
    }

    pub fn remove_resource_template(&self, uri_template: &str) -> Result<(), ServerError> {
        if self.resource_templates.remove(uri_template).is_none() {
            return Err(ServerError::ResourceTemplateNotFound(uri_template.to_string()));
        }
        Ok(())
    }

    pub async fn notify_resources_list_changed(&self) {
        if let Err(err) = self.session.notify::<ResourceListChangedNotification>(None).await {
            warn!(%err, "failed to send resources list-changed notification");
        }
    }

    pub async fn notify_resource_updated(&self, uri: &str) {
        if !self.subscribed_uris.contains_key(uri) {
            debug!(%uri, "resource update with no subscriber, skipping notification");
            return;
        }
        let params = ResourceUpdatedNotificationParams { uri: uri.to_string() };
        if let Err(err) = self.session.notify::<ResourceUpdatedNotification>(params).await {
            warn!(%err, "failed to send resource-updated notification");
        }
    }

    async fn handle_list_resources(&self) -> Result<Value, HandlerFailure> {
        let resources: Vec<Resource> = self.resources.iter().map(|entry| entry.value().0.clone()).collect();
        let result = ListResourcesResult { resources, next_cursor: None };
        serde_json::to_value(result).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    async fn handle_list_resource_templates(&self) -> Result<Value, HandlerFailure> {
        let resource_templates: Vec<ResourceTemplate> =
            self.resource_templates.iter().map(|entry| entry.value().clone()).collect();
        let result = ListResourceTemplatesResult { resource_templates, next_cursor: None };
        serde_json::to_value(result).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value, HandlerFailure> {
        let params: ReadResourceRequestParams = params
            .ok_or_else(|| HandlerFailure::new(INVALID_PARAMS, "missing resources/read params"))
            .and_then(|value| {
                serde_json::from_value(value).map_err(|err| HandlerFailure::new(INVALID_PARAMS, err.to_string()))
            })?;

        let handler = self
            .resources
            .get(&params.uri)
            .map(|entry| entry.value().1.clone())
            .ok_or_else(|| HandlerFailure::new(INVALID_PARAMS, format!("unknown resource `{}`", params.uri)))?;

        let result: ReadResourceResult = handler().await.map_err(HandlerFailure::internal)?;
        serde_json::to_value(result).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    async fn handle_subscribe(&self, params: Option<Value>) -> Result<Value, HandlerFailure> {
        let supports_subscribe = self
            .capabilities
            .resources
            .as_ref()
            .and_then(|r| r.subscribe)
            .unwrap_or(false);
        if !supports_subscribe {
            return Err(HandlerFailure::new(INVALID_REQUEST, "resources/subscribe is not supported"));
        }
        let params: SubscribeRequestParams = params
            .ok_or_else(|| HandlerFailure::new(INVALID_PARAMS, "missing resources/subscribe params"))
            .and_then(|value| {
                serde_json::from_value(value).map_err(|err| HandlerFailure::new(INVALID_PARAMS, err.to_string()))
            })?;
        self.subscribed_uris.insert(params.uri, ());
        serde_json::to_value(EmptyResult::default()).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    async fn handle_unsubscribe(&self, params: Option<Value>) -> Result<Value, HandlerFailure> {
        let params: UnsubscribeRequestParams = params
            .ok_or_else(|| HandlerFailure::new(INVALID_PARAMS, "missing resources/unsubscribe params"))
            .and_then(|value| {
                serde_json::from_value(value).map_err(|err| HandlerFailure::new(INVALID_PARAMS, err.to_string()))
            })?;
        if self.subscribed_uris.remove(&params.uri).is_none() {
            return Err(HandlerFailure::new(INVALID_PARAMS, format!("uri `{}` is not subscribed", params.uri)));
        }
        serde_json::to_value(EmptyResult::default()).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    // -- prompts ----------------------------------------------------------

    pub async fn add_prompt(&self, prompt: Prompt, handler: PromptHandler) -> Result<(), ServerError> {
        let list_changed = self
            .capabilities
            .prompts
            .as_ref()
            .ok_or(ServerError::MissingOwnCapability("prompts"))?
            .list_changed;
        if self.prompts.contains_key(&prompt.name) {
            return Err(ServerError::PromptAlreadyRegistered(prompt.name));
        }
        self.prompts.insert(prompt.name.clone(), (prompt, handler));
        if list_changed == Some(true) {
            self.notify_prompts_list_changed().await;
        }
        Ok(())
    }

    pub async fn remove_prompt(&self, name: &str) -> Result<(), ServerError> {
        let list_changed = self.capabilities.prompts.as_ref().and_then(|c| c.list_changed);
        if self.prompts.remove(name).is_none() {
            return Err(ServerError::PromptNotFound(name.to_string()));
        }
        if list_changed == Some(true) {
            self.notify_prompts_list_changed().await;
        }
        Ok(())
    }

    pub async fn notify_prompts_list_changed(&self) {
        if let Err(err) = self.session.notify::<PromptListChangedNotification>(None).await {
            warn!(%err, "failed to send prompts list-changed notification");
        }
    }

    async fn handle_list_prompts(&self) -> Result<Value, HandlerFailure> {
        let prompts: Vec<Prompt> = self.prompts.iter().map(|entry| entry.value().0.clone()).collect();
        let result = ListPromptsResult { prompts, next_cursor: None };
        serde_json::to_value(result).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    async fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value, HandlerFailure> {
        let params: GetPromptRequestParams = params
            .ok_or_else(|| HandlerFailure::new(INVALID_PARAMS, "missing prompts/get params"))
            .and_then(|value| {
                serde_json::from_value(value).map_err(|err| HandlerFailure::new(INVALID_PARAMS, err.to_string()))
            })?;

        let handler = self
            .prompts
            .get(&params.name)
            .map(|entry| entry.value().1.clone())
            .ok_or_else(|| HandlerFailure::new(INVALID_PARAMS, format!("unknown prompt `{}`", params.name)))?;

        let result: GetPromptResult = handler(params.arguments).await.map_err(HandlerFailure::internal)?;
        serde_json::to_value(result).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    // -- logging ----------------------------------------------------------

    async fn handle_set_level(&self, params: Option<Value>) -> Result<Value, HandlerFailure> {
        self.capabilities
            .logging
            .as_ref()
            .ok_or_else(|| HandlerFailure::new(INVALID_REQUEST, "logging is not supported"))?;
        let params: SetLevelRequestParams = params
            .ok_or_else(|| HandlerFailure::new(INVALID_PARAMS, "missing logging/setLevel params"))
            .and_then(|value| {
                serde_json::from_value(value).map_err(|err| HandlerFailure::new(INVALID_PARAMS, err.to_string()))
            })?;
        *self.min_logging_level.lock().unwrap() = params.level;
        serde_json::to_value(EmptyResult::default()).map_err(|err| HandlerFailure::internal(err.to_string()))
    }

    /// Emits a log message to the peer, filtered against the minimum level
    /// the peer last set via `logging/setLevel`. A no-op below that level.
    pub async fn logging_notification(&self, level: LoggingLevel, logger: Option<String>, data: Value) {
        if level < *self.min_logging_level.lock().unwrap() {
            return;
        }
        let params = LoggingMessageNotificationParams { level, logger, data };
        if let Err(err) = self.session.notify::<LoggingMessageNotification>(params).await {
            warn!(%err, "failed to send logging notification");
        }
    }

    // -- sampling (outbound) ----------------------------------------------

    pub async fn create_message(&self, params: CreateMessageRequestParams) -> Result<CreateMessageResult, ServerError> {
        self.require_client_capability("sampling", |caps| caps.sampling.is_some())?;
        Ok(self.session.call::<CreateMessageRequest>(params).await?)
    }

    // -- roots --------------------------------------------------------------

    pub fn on_roots_list_changed(&self, consumer: RootsChangeConsumer) {
        self.roots_consumers.lock().unwrap().push(consumer);
    }

    async fn handle_roots_list_changed(self: Arc<Self>) -> anyhow::Result<()> {
        let result = self.session.call::<ListRootsRequest>(None).await?;
        let consumers = self.roots_consumers.lock().unwrap().clone();
        for consumer in consumers {
            if let Err(err) = consumer(result.roots.clone()).await {
                warn!(%err, "roots consumer failed");
            }
        }
        Ok(())
    }

    pub async fn roots(&self) -> Result<Vec<Root>, ServerError> {
        self.require_client_capability("roots", |caps| caps.roots.is_some())?;
        Ok(self.session.call::<ListRootsRequest>(None).await?.roots)
    }

    pub async fn close(&self) -> Result<(), ServerError> {
        Ok(self.session.close_gracefully().await?)
    }
}
