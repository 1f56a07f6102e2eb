//! Bundled MCP server binary: speaks line-delimited JSON over its own
//! stdin/stdout and exposes one demonstration tool, `echo`.

use std::sync::Arc;

use mcp_server::ServerBuilder;
use mcp_transport::stdio::StdioServerTransport;
use mcp_types::CallToolResult;
use mcp_types::ContentBlock;
use mcp_types::Implementation;
use mcp_types::ServerCapabilities;
use mcp_types::Tool;
use mcp_types::ToolsCapability;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let default_level = "info";
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let transport = Arc::new(StdioServerTransport::new());

    let server = ServerBuilder::new(
        transport.clone(),
        Implementation {
            name: "mcp-server".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            title: None,
        },
    )
    .capabilities(ServerCapabilities {
        tools: Some(ToolsCapability { list_changed: Some(true) }),
        ..Default::default()
    })
    .build();

    server
        .add_tool(
            Tool {
                name: "echo".to_owned(),
                description: Some("Echoes the `text` argument back as tool output".to_owned()),
                input_schema: json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"],
                }),
            },
            Arc::new(|arguments| {
                Box::pin(async move {
                    let text = arguments
                        .as_ref()
                        .and_then(|value| value.get("text"))
                        .and_then(|value| value.as_str())
                        .map(str::to_owned);
                    match text {
                        Some(text) => CallToolResult {
                            content: vec![ContentBlock::text(text)],
                            is_error: None,
                            structured_content: None,
                        },
                        None => CallToolResult::error("missing required argument `text`"),
                    }
                })
            }),
        )
        .await?;

    server.connect().await?;
    transport.wait_until_closed().await;
    server.close().await?;
    Ok(())
}
