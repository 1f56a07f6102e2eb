//! Command-line utility to exercise [`mcp_client::Client`] against a
//! stdio-spoken MCP server.
//!
//! ```bash
//! mcp-client -- some-mcp-server --its-own-flag
//! ```
//!
//! Connects, negotiates `initialize`, issues `tools/list`, and prints the
//! result as pretty JSON.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mcp_client::ClientBuilder;
use mcp_transport::stdio::StdioChildTransport;
use mcp_types::ClientCapabilities;
use mcp_types::Implementation;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Connect to an MCP server over stdio and list its tools")]
struct Args {
    /// The program to spawn as the MCP server.
    program: String,

    /// Arguments forwarded to the spawned program.
    server_args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let default_level = "info";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let args = Args::parse();

    let transport = StdioChildTransport::spawn(
        args.program.clone().into(),
        args.server_args.iter().cloned().map(Into::into).collect(),
        None,
    )
    .await
    .with_context(|| format!("failed to spawn `{}`", args.program))?;

    let client = ClientBuilder::new(
        Arc::new(transport),
        Implementation {
            name: "mcp-client".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            title: None,
        },
    )
    .capabilities(ClientCapabilities::default())
    .request_timeout(Duration::from_secs(10))
    .build()?;

    client.connect().await?;
    let init = client.initialize().await.context("initialize failed")?;
    eprintln!("server: {:?}", init.server_info);

    let tools = client
        .list_tools(None)
        .await
        .context("tools/list request failed")?;
    println!("{}", serde_json::to_string_pretty(&tools)?);

    client.close().await?;
    Ok(())
}
