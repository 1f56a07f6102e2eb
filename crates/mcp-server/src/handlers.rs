//! Callback shapes the server role dispatches into for registered
//! capabilities and consumes server-initiated fan-out on behalf of.

use std::sync::Arc;

use futures::future::BoxFuture;
use mcp_types::CallToolResult;
use mcp_types::GetPromptResult;
use mcp_types::ReadResourceResult;
use mcp_types::Root;
use serde_json::Value;

/// Executes a registered tool. Tool-level failures are reported inside the
/// returned [`CallToolResult`] (`is_error: Some(true)`), not as an `Err`:
/// an unrecognized argument or a failing side effect is still a successful
/// JSON-RPC round trip from the protocol's point of view.
pub type ToolHandler = Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, CallToolResult> + Send + Sync>;

/// Produces the contents of a registered resource. A failure here (e.g. the
/// backing file disappeared after registration) becomes a JSON-RPC error.
pub type ResourceReadHandler =
    Arc<dyn Fn() -> BoxFuture<'static, Result<ReadResourceResult, String>> + Send + Sync>;

/// Renders a registered prompt with the caller-supplied arguments.
pub type PromptHandler =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, Result<GetPromptResult, String>> + Send + Sync>;

/// Invoked with the client's current roots whenever
/// `notifications/roots/list_changed` arrives and a follow-up `roots/list`
/// completes. A failure is logged and does not stop other consumers.
pub type RootsChangeConsumer = Arc<dyn Fn(Vec<Root>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
