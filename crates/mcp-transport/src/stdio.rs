//! Line-delimited JSON transport over a spawned child process's stdio.
//!
//! One dedicated task per direction (plus a third draining stderr into the
//! structured log) so a slow or stalled child can never block the other
//! two. See [`crate::framing`] for the line-escaping contract.

use std::collections::HashMap;
use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::ChildStderr;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use crate::InboundHandler;
use crate::Transport;
use crate::TransportError;
use crate::framing;
use crate::queue::OutboundQueue;

#[cfg(unix)]
const INHERITED_ENV_VARS: &[&str] = &["HOME", "LOGNAME", "PATH", "SHELL", "TERM", "USER"];

#[cfg(windows)]
const INHERITED_ENV_VARS: &[&str] = &[
    "APPDATA",
    "HOMEDRIVE",
    "HOMEPATH",
    "LOCALAPPDATA",
    "PATH",
    "PROCESSOR_ARCHITECTURE",
    "SYSTEMDRIVE",
    "SYSTEMROOT",
    "TEMP",
    "USERNAME",
    "USERPROFILE",
];

/// Build the environment a spawned MCP server child inherits: the
/// platform's safe subset of the parent's environment plus `extra_env`.
/// Values beginning with `()` are dropped — a guard against function
/// definitions smuggled into an inherited environment variable.
pub fn build_child_env(extra_env: Option<HashMap<String, String>>) -> HashMap<String, String> {
    INHERITED_ENV_VARS
        .iter()
        .filter_map(|name| {
            std::env::var(name)
                .ok()
                .map(|value| (name.to_string(), value))
        })
        .chain(extra_env.unwrap_or_default())
        .filter(|(_, value)| !value.starts_with("()"))
        .collect()
}

/// A transport that owns a spawned MCP server child process and speaks
/// line-delimited JSON over its stdin/stdout.
pub struct StdioChildTransport {
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    stdout: Mutex<Option<ChildStdout>>,
    stderr: Mutex<Option<ChildStderr>>,
    outbound: Mutex<Option<OutboundQueue>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    command_label: String,
}

impl StdioChildTransport {
    /// Spawn `program` with `args`, ready to be handed to [`Transport::connect`].
    pub async fn spawn(
        program: OsString,
        args: Vec<OsString>,
        extra_env: Option<HashMap<String, String>>,
    ) -> Result<Self, TransportError> {
        let command_label = program.to_string_lossy().into_owned();
        let mut child = Command::new(&program)
            .args(args)
            .env_clear()
            .envs(build_child_env(extra_env))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(TransportError::Spawn)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Io(std::io::Error::other("failed to capture child stdin")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Io(std::io::Error::other("failed to capture child stdout")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransportError::Io(std::io::Error::other("failed to capture child stderr")))?;

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(Some(stdin)),
            stdout: Mutex::new(Some(stdout)),
            stderr: Mutex::new(Some(stderr)),
            outbound: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            command_label,
        })
    }
}

#[async_trait::async_trait]
impl Transport for StdioChildTransport {
    async fn connect(&self, handler: InboundHandler) -> Result<(), TransportError> {
        let stdin = self
            .stdin
            .lock()
            .await
            .take()
            .ok_or(TransportError::NotConnected)?;
        let stdout = self
            .stdout
            .lock()
            .await
            .take()
            .ok_or(TransportError::NotConnected)?;
        let stderr = self
            .stderr
            .lock()
            .await
            .take()
            .ok_or(TransportError::NotConnected)?;

        let stdin = Arc::new(Mutex::new(stdin));
        let (outbound, writer_handle) = OutboundQueue::spawn(move |message| {
            let stdin = stdin.clone();
            Box::pin(async move {
                let line = framing::frame_line(&message)?;
                debug!(%line, "writing line to child stdin");
                let mut guard = stdin.lock().await;
                guard
                    .write_all(line.as_bytes())
                    .await
                    .map_err(TransportError::Io)
            })
        });

        let reader_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match framing::parse_line(&line) {
                        Ok(message) => {
                            let _ = handler(message).await;
                        }
                        Err(err) => warn!(%err, %line, "failed to parse inbound line"),
                    },
                    Ok(None) => break,
                    Err(err) => {
                        warn!(%err, "error reading child stdout, stopping reader");
                        break;
                    }
                }
            }
        });

        let command_label = self.command_label.clone();
        let stderr_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(command = %command_label, "{line}");
            }
        });

        *self.outbound.lock().await = Some(outbound);
        *self.tasks.lock().await = vec![writer_handle, reader_handle, stderr_handle];
        Ok(())
    }

    async fn send_message(&self, message: mcp_types::JSONRPCMessage) -> Result<(), TransportError> {
        let guard = self.outbound.lock().await;
        let outbound = guard.as_ref().ok_or(TransportError::NotConnected)?;
        outbound.try_enqueue(message)
    }

    async fn close_gracefully(&self) -> Result<(), TransportError> {
        // Dropping the sender half lets the writer task drain and exit on
        // its own; we still terminate the child explicitly since a
        // well-behaved peer may otherwise keep running indefinitely.
        *self.outbound.lock().await = None;
        let mut child = self.child.lock().await;
        let _ = child.start_kill();
        match child.wait().await {
            Ok(status) if !status.success() => {
                debug!(?status, "child exited with non-zero status");
            }
            Err(err) => warn!(%err, "failed to wait on child process"),
            _ => {}
        }
        drop(child);
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        Ok(())
    }
}

/// A transport that speaks line-delimited JSON over the current process's
/// own stdin/stdout, for a binary that *is* the MCP server rather than one
/// that spawns a child to act as one.
pub struct StdioServerTransport {
    outbound: Mutex<Option<OutboundQueue>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: Arc<tokio::sync::Notify>,
}

impl Default for StdioServerTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioServerTransport {
    pub fn new() -> Self {
        Self {
            outbound: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            closed: Arc::new(tokio::sync::Notify::new()),
        }
    }

    /// Resolves once the stdin reader has hit EOF or hit a fatal read
    /// error, i.e. once the peer driving this server over stdio is gone.
    pub async fn wait_until_closed(&self) {
        self.closed.notified().await;
    }
}

#[async_trait::async_trait]
impl Transport for StdioServerTransport {
    async fn connect(&self, handler: InboundHandler) -> Result<(), TransportError> {
        let stdout = Arc::new(Mutex::new(tokio::io::stdout()));
        let (outbound, writer_handle) = OutboundQueue::spawn(move |message| {
            let stdout = stdout.clone();
            Box::pin(async move {
                let line = framing::frame_line(&message)?;
                debug!(%line, "writing line to stdout");
                let mut guard = stdout.lock().await;
                guard
                    .write_all(line.as_bytes())
                    .await
                    .map_err(TransportError::Io)
            })
        });

        let closed = self.closed.clone();
        let reader_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match framing::parse_line(&line) {
                        Ok(message) => {
                            let _ = handler(message).await;
                        }
                        Err(err) => warn!(%err, %line, "failed to parse inbound line"),
                    },
                    Ok(None) => break,
                    Err(err) => {
                        warn!(%err, "error reading stdin, stopping reader");
                        break;
                    }
                }
            }
            debug!("stdin reader finished (EOF)");
            closed.notify_waiters();
        });

        *self.outbound.lock().await = Some(outbound);
        *self.tasks.lock().await = vec![writer_handle, reader_handle];
        Ok(())
    }

    async fn send_message(&self, message: mcp_types::JSONRPCMessage) -> Result<(), TransportError> {
        let guard = self.outbound.lock().await;
        let outbound = guard.as_ref().ok_or(TransportError::NotConnected)?;
        outbound.try_enqueue(message)
    }

    async fn close_gracefully(&self) -> Result<(), TransportError> {
        *self.outbound.lock().await = None;
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        Ok(())
    }
}
