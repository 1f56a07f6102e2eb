use std::process::Stdio;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use anyhow::Context;
use assert_cmd::prelude::*;
use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::ModelContextProtocolNotification;
use mcp_types::ModelContextProtocolRequest;
use mcp_types::RequestId;
use tempfile::TempDir;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;

/// Drives the compiled `mcp-server` binary as a real subprocess, talking to
/// it over its own stdin/stdout the way a host process would.
pub struct McpTestProcess {
    next_request_id: AtomicI64,
    #[allow(dead_code)]
    scratch_dir: TempDir,
    #[allow(dead_code)]
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl McpTestProcess {
    pub async fn spawn() -> anyhow::Result<Self> {
        let scratch_dir = tempfile::tempdir().context("failed to create scratch dir")?;

        let std_cmd = std::process::Command::cargo_bin("mcp-server")
            .context("should find the compiled mcp-server binary")?;
        let mut cmd = Command::new(std_cmd.get_program());
        cmd.current_dir(scratch_dir.path())
            .env("RUST_LOG", "debug")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut process = cmd.spawn().context("mcp-server process should start")?;
        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| anyhow::format_err!("child should have a stdin handle"))?;
        let stdout = BufReader::new(
            process
                .stdout
                .take()
                .ok_or_else(|| anyhow::format_err!("child should have a stdout handle"))?,
        );

        if let Some(stderr) = process.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            tokio::spawn(async move {
                while let Ok(Some(line)) = lines.next_line().await {
                    eprintln!("[mcp-server stderr] {line}");
                }
            });
        }

        Ok(Self { next_request_id: AtomicI64::new(0), scratch_dir, process, stdin, stdout })
    }

    pub async fn send_request<R: ModelContextProtocolRequest>(
        &mut self,
        params: R::Params,
    ) -> anyhow::Result<RequestId> {
        let id = RequestId::Integer(self.next_request_id.fetch_add(1, Ordering::Relaxed));
        self.send_message(JSONRPCMessage::Request(JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.into(),
            id: id.clone(),
            method: R::METHOD.into(),
            params: Some(serde_json::to_value(params)?),
        }))
        .await?;
        Ok(id)
    }

    pub async fn send_notification<N: ModelContextProtocolNotification>(
        &mut self,
        params: Option<N::Params>,
    ) -> anyhow::Result<()> {
        self.send_message(JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.into(),
            method: N::METHOD.into(),
            params: params.map(serde_json::to_value).transpose()?,
        }))
        .await
    }

    async fn send_message(&mut self, message: JSONRPCMessage) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&message)?;
        self.stdin.write_all(payload.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    pub async fn read_message(&mut self) -> anyhow::Result<JSONRPCMessage> {
        let mut line = String::new();
        let bytes_read = self.stdout.read_line(&mut line).await?;
        anyhow::ensure!(bytes_read > 0, "mcp-server closed stdout before replying");
        Ok(serde_json::from_str(&line)?)
    }

    pub async fn read_response_for(&mut self, id: &RequestId) -> anyhow::Result<JSONRPCResponse> {
        loop {
            match self.read_message().await? {
                JSONRPCMessage::Response(response) if &response.id == id => return Ok(response),
                JSONRPCMessage::Notification(n) => eprintln!("ignoring notification: {n:?}"),
                other => eprintln!("ignoring unrelated message: {other:?}"),
            }
        }
    }
}
