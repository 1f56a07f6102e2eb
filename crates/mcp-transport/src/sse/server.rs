//! Server side of the HTTP+SSE transport: a long-lived `/sse` stream per
//! connected client, broadcasting outbound envelopes, and a `/message/:id`
//! POST endpoint for that client's inbound traffic.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::response::sse::Sse;
use axum::routing::get;
use axum::routing::post;
use dashmap::DashMap;
use futures::Stream;
use mcp_types::JSONRPCMessage;
use tokio::sync::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use crate::InboundHandler;
use crate::Transport;
use crate::TransportError;

struct ServerState {
    sessions: DashMap<String, ()>,
    broadcast: broadcast::Sender<JSONRPCMessage>,
    handler: Mutex<Option<InboundHandler>>,
}

/// An HTTP+SSE server transport bound to a single address, publishing to
/// every currently connected client over its own `/sse` stream.
pub struct SseServerTransport {
    addr: SocketAddr,
    state: Arc<ServerState>,
    server_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl SseServerTransport {
    pub fn new(addr: SocketAddr) -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            addr,
            state: Arc::new(ServerState {
                sessions: DashMap::new(),
                broadcast: tx,
                handler: Mutex::new(None),
            }),
            server_task: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// The address actually bound by `connect`, useful when `new` was given
    /// port `0` and the OS picked one. `None` before `connect` completes.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }
}

fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/sse", get(handle_sse))
        .route("/message/:session_id", post(handle_message))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn handle_sse(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().to_string();
    state.sessions.insert(session_id.clone(), ());
    let endpoint_path = format!("/message/{session_id}");

    let rx = state.broadcast.subscribe();
    let endpoint_event = futures::stream::once(async move {
        Ok(Event::default().event("endpoint").data(endpoint_path))
    });
    let message_events = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    let Ok(json) = serde_json::to_string(&message) else {
                        continue;
                    };
                    return Some((
                        Ok::<Event, Infallible>(Event::default().event("message").data(json)),
                        rx,
                    ));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "sse client fell behind, dropped broadcast messages");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(endpoint_event.chain(message_events)).keep_alive(KeepAlive::default())
}

async fn handle_message(
    State(state): State<Arc<ServerState>>,
    Path(session_id): Path<String>,
    Json(value): Json<serde_json::Value>,
) -> impl IntoResponse {
    if !state.sessions.contains_key(&session_id) {
        return StatusCode::NOT_FOUND;
    }
    match JSONRPCMessage::parse(value) {
        Ok(message) => {
            let handler = state.handler.lock().await.clone();
            if let Some(handler) = handler {
                let _ = handler(message).await;
            }
            StatusCode::ACCEPTED
        }
        Err(err) => {
            warn!(%err, "rejecting malformed posted envelope");
            StatusCode::BAD_REQUEST
        }
    }
}

#[async_trait::async_trait]
impl Transport for SseServerTransport {
    async fn connect(&self, handler: InboundHandler) -> Result<(), TransportError> {
        *self.state.handler.lock().await = Some(handler);
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(TransportError::Io)?;
        *self.local_addr.lock().await = Some(listener.local_addr().map_err(TransportError::Io)?);
        let router = build_router(self.state.clone());
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                warn!(%err, "sse server task exited with an error");
            }
        });
        *self.server_task.lock().await = Some(task);
        Ok(())
    }

    async fn send_message(&self, message: JSONRPCMessage) -> Result<(), TransportError> {
        // A broadcast channel has no "full" state to report back to the
        // caller; a lagging subscriber simply misses older messages. The
        // only failure mode worth surfacing here is "no one is listening".
        self.state
            .broadcast
            .send(message)
            .map(|_| ())
            .map_err(|_| TransportError::Closed)
    }

    async fn close_gracefully(&self) -> Result<(), TransportError> {
        if let Some(task) = self.server_task.lock().await.take() {
            task.abort();
        }
        Ok(())
    }
}
