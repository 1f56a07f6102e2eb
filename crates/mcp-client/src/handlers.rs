//! Callback shapes the client role dispatches server-initiated traffic to.

use std::sync::Arc;

use futures::future::BoxFuture;
use mcp_session::HandlerFailure;
use mcp_types::CreateMessageRequestParams;
use mcp_types::CreateMessageResult;
use mcp_types::LoggingMessageNotificationParams;
use mcp_types::Prompt;
use mcp_types::Resource;
use mcp_types::Tool;

/// Answers `sampling/createMessage` on behalf of the host application.
/// Required at construction time whenever the client advertises the
/// sampling capability.
pub type SamplingHandler = Arc<
    dyn Fn(CreateMessageRequestParams) -> BoxFuture<'static, Result<CreateMessageResult, HandlerFailure>>
        + Send
        + Sync,
>;

/// Invoked with the freshly fetched list whenever the corresponding
/// `*/list_changed` notification arrives. A failure is logged and does not
/// stop other registered consumers from running.
pub type ToolsChangeConsumer = Arc<dyn Fn(Vec<Tool>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
pub type ResourcesChangeConsumer =
    Arc<dyn Fn(Vec<Resource>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
pub type PromptsChangeConsumer = Arc<dyn Fn(Vec<Prompt>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Invoked for every `notifications/message` the server sends, regardless
/// of the minimum level the client has asked the server to apply.
pub type LogConsumer =
    Arc<dyn Fn(LoggingMessageNotificationParams) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Invoked when a `notifications/resources/updated` arrives for a URI this
/// client has subscribed to.
pub type ResourceUpdateConsumer = Arc<dyn Fn(String) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
