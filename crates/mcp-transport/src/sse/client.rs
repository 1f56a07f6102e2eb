//! Client side of the HTTP+SSE transport: connects to a server's `/sse`
//! stream, learns the per-session POST endpoint from the first `endpoint`
//! event, and posts outbound envelopes to it.

use std::sync::Arc;
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use mcp_types::JSONRPCMessage;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::sync::OnceCell;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use super::ENDPOINT_EVENT;
use super::MESSAGE_EVENT;
use crate::InboundHandler;
use crate::Transport;
use crate::TransportError;
use crate::queue::OutboundQueue;

const DEFAULT_ENDPOINT_WAIT: Duration = Duration::from_secs(10);

pub struct SseClientTransport {
    base_url: String,
    http: Client,
    endpoint_wait: Duration,
    endpoint: Arc<OnceCell<String>>,
    outbound: Mutex<Option<OutboundQueue>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SseClientTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_endpoint_wait(base_url, DEFAULT_ENDPOINT_WAIT)
    }

    pub fn with_endpoint_wait(base_url: impl Into<String>, endpoint_wait: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
            endpoint_wait,
            endpoint: Arc::new(OnceCell::new()),
            outbound: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    fn resolve(base_url: &str, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", base_url.trim_end_matches('/'), path)
        }
    }
}

#[async_trait::async_trait]
impl Transport for SseClientTransport {
    async fn connect(&self, handler: InboundHandler) -> Result<(), TransportError> {
        let sse_url = format!("{}/sse", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&sse_url)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(TransportError::Http)?;
        if !response.status().is_success() {
            return Err(TransportError::HttpStatus(response.status()));
        }

        let (endpoint_ready_tx, endpoint_ready_rx) = oneshot::channel::<()>();
        let endpoint = self.endpoint.clone();
        let mut endpoint_ready_tx = Some(endpoint_ready_tx);
        let mut stream = response.bytes_stream().eventsource();

        let reader_handle = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                match event {
                    Ok(event) if event.event == ENDPOINT_EVENT => {
                        if endpoint.set(event.data).is_err() {
                            warn!("received duplicate sse endpoint event, ignoring");
                        }
                        if let Some(tx) = endpoint_ready_tx.take() {
                            let _ = tx.send(());
                        }
                    }
                    Ok(event) if event.event == MESSAGE_EVENT => {
                        match serde_json::from_str::<serde_json::Value>(&event.data)
                            .map_err(TransportError::Decode)
                            .and_then(|value| JSONRPCMessage::parse(value).map_err(TransportError::from))
                        {
                            Ok(message) => {
                                let _ = handler(message).await;
                            }
                            Err(err) => warn!(%err, "failed to parse sse message event"),
                        }
                    }
                    Ok(event) => debug!(event = %event.event, "ignoring unrecognized sse event type"),
                    Err(err) => {
                        warn!(%err, "sse stream error, stopping reader");
                        break;
                    }
                }
            }
        });

        if tokio::time::timeout(self.endpoint_wait, endpoint_ready_rx)
            .await
            .is_err()
        {
            reader_handle.abort();
            return Err(TransportError::EndpointDiscoveryTimeout);
        }

        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let endpoint = self.endpoint.clone();
        let (outbound, writer_handle) = OutboundQueue::spawn(move |message| {
            let http = http.clone();
            let base_url = base_url.clone();
            let endpoint = endpoint.clone();
            Box::pin(async move {
                let path = endpoint.get().ok_or(TransportError::NotConnected)?;
                let url = Self::resolve(&base_url, path);
                let response = http
                    .post(url)
                    .header("Content-Type", "application/json")
                    .json(&message)
                    .send()
                    .await
                    .map_err(TransportError::Http)?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(TransportError::HttpStatus(response.status()))
                }
            })
        });

        *self.outbound.lock().await = Some(outbound);
        *self.tasks.lock().await = vec![reader_handle, writer_handle];
        Ok(())
    }

    async fn send_message(&self, message: JSONRPCMessage) -> Result<(), TransportError> {
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
