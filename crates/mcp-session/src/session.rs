use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::time::Duration;

use dashmap::DashMap;
use mcp_transport::InboundHandler;
use mcp_transport::Transport;
use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCError;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::ModelContextProtocolNotification;
use mcp_types::ModelContextProtocolRequest;
use mcp_types::RequestId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::warn;
use uuid::Uuid;

use crate::SessionError;
use crate::handler::HandlerFailure;
use crate::handler::NotificationHandler;
use crate::handler::RequestHandler;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Created = 0,
    Running = 1,
    Closing = 2,
    Closed = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Created,
            1 => SessionState::Running,
            2 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }
}

enum PendingOutcome {
    Success(Value),
    ProtocolError(JSONRPCErrorError),
    SessionClosed,
}

/// A transport-agnostic JSON-RPC peer: assigns request ids, correlates
/// responses, enforces per-request timeouts, and routes inbound
/// requests/notifications to registered handlers.
///
/// Handlers must be registered (via [`Session::register_request_handler`]
/// / [`Session::register_notification_handler`]) before [`Session::start`]
/// is called — no inbound message can be observed before the routing
/// tables are populated.
pub struct Session {
    transport: Arc<dyn Transport>,
    state: AtomicU8,
    pending: DashMap<RequestId, oneshot::Sender<PendingOutcome>>,
    request_handlers: DashMap<String, RequestHandler>,
    notification_handlers: DashMap<String, NotificationHandler>,
    next_id: AtomicI64,
    id_prefix: String,
    request_timeout: Duration,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, request_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            transport,
            state: AtomicU8::new(SessionState::Created as u8),
            pending: DashMap::new(),
            request_handlers: DashMap::new(),
            notification_handlers: DashMap::new(),
            next_id: AtomicI64::new(0),
            id_prefix: Uuid::new_v4().simple().to_string()[..8].to_string(),
            request_timeout,
        })
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub fn register_request_handler(&self, method: impl Into<String>, handler: RequestHandler) {
        self.request_handlers.insert(method.into(), handler);
    }

    pub fn register_notification_handler(
        &self,
        method: impl Into<String>,
        handler: NotificationHandler,
    ) {
        self.notification_handlers.insert(method.into(), handler);
    }

    /// Install the dispatcher as the transport's inbound handler and
    /// connect. Transitions CREATED -> RUNNING on success.
    pub async fn start(self: &Arc<Self>) -> Result<(), SessionError> {
        if self.state() != SessionState::Created {
            return Err(SessionError::NotRunning);
        }
        let weak: Weak<Session> = Arc::downgrade(self);
        let handler: InboundHandler = Arc::new(move |message| {
            let weak = weak.clone();
            Box::pin(async move {
                match weak.upgrade() {
                    Some(session) => session.dispatch_inbound(message).await,
                    None => debug!("session dropped, discarding inbound message"),
                }
                None
            })
        });
        self.transport.connect(handler).await?;
        self.set_state(SessionState::Running);
        Ok(())
    }

    pub async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, SessionError> {
        self.send_request_with_timeout(method, params, self.request_timeout)
            .await
    }

    pub async fn send_request_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, SessionError> {
        if self.state() != SessionState::Running {
            return Err(SessionError::NotRunning);
        }

        let id = RequestId::String(format!(
            "{}-{}",
            self.id_prefix,
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        let request = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.clone(),
            method: method.to_string(),
            params,
        };
        if let Err(err) = self
            .transport
            .send_message(JSONRPCMessage::Request(request))
            .await
        {
            self.pending.remove(&id);
            return Err(SessionError::Transport(err));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(PendingOutcome::Success(value))) => Ok(value),
            Ok(Ok(PendingOutcome::ProtocolError(error))) => Err(error.into()),
            Ok(Ok(PendingOutcome::SessionClosed)) => Err(SessionError::Closed),
            Ok(Err(_)) => Err(SessionError::Closed),
            Err(_elapsed) => {
                self.pending.remove(&id);
                Err(SessionError::Timeout)
            }
        }
    }

    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), SessionError> {
        if self.state() != SessionState::Running {
            return Err(SessionError::NotRunning);
        }
        let notification = JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
        };
        self.transport
            .send_message(JSONRPCMessage::Notification(notification))
            .await
            .map_err(SessionError::from)
    }

    /// Typed wrapper around [`Self::send_request`] for a method bound via
    /// [`ModelContextProtocolRequest`]. `Params`/`Result` are serialized and
    /// parsed on the way in and out so callers never touch raw `Value`s.
    pub async fn call<R>(&self, params: R::Params) -> Result<R::Result, SessionError>
    where
        R: ModelContextProtocolRequest,
        R::Params: Serialize,
        R::Result: DeserializeOwned,
    {
        let params = json_or_absent(&params)?;
        let result = self.send_request(R::METHOD, params).await?;
        Ok(serde_json::from_value(result).map_err(mcp_transport::TransportError::Decode)?)
    }

    /// Typed wrapper around [`Self::send_notification`].
    pub async fn notify<N>(&self, params: N::Params) -> Result<(), SessionError>
    where
        N: ModelContextProtocolNotification,
        N::Params: Serialize,
    {
        let params = json_or_absent(&params)?;
        self.send_notification(N::METHOD, params).await
    }

    async fn dispatch_inbound(self: Arc<Self>, message: JSONRPCMessage) {
        if self.state() != SessionState::Running {
            debug!(?message, "dropping inbound message, session is not running");
            return;
        }
        match message {
            JSONRPCMessage::Response(JSONRPCResponse { id, result, .. }) => {
                self.complete_pending(id, PendingOutcome::Success(result));
            }
            JSONRPCMessage::Error(JSONRPCError { id, error, .. }) => {
                self.complete_pending(id, PendingOutcome::ProtocolError(error));
            }
            JSONRPCMessage::Request(request) => {
                let session = self.clone();
                tokio::spawn(async move {
                    session.handle_request(request).await;
                });
            }
            JSONRPCMessage::Notification(notification) => {
                let session = self.clone();
                tokio::spawn(async move {
                    session.handle_notification(notification).await;
                });
            }
        }
    }

    fn complete_pending(&self, id: RequestId, outcome: PendingOutcome) {
        match self.pending.remove(&id) {
            Some((_, tx)) => {
                let _ = tx.send(outcome);
            }
            None => debug!(%id, "no pending request for this response, dropping"),
        }
    }

    async fn handle_request(&self, request: JSONRPCRequest) {
        let handler = self
            .request_handlers
            .get(&request.method)
            .map(|entry| entry.value().clone());

        let response = match handler {
            None => {
                JSONRPCMessage::Error(JSONRPCError::method_not_found(
                    request.id.clone(),
                    &request.method,
                ))
            }
            Some(handler) => match handler(request.params.clone()).await {
                Ok(result) => JSONRPCMessage::Response(JSONRPCResponse {
                    jsonrpc: JSONRPC_VERSION.to_string(),
                    id: request.id.clone(),
                    result,
                }),
                Err(HandlerFailure { code, message }) => {
                    JSONRPCMessage::Error(JSONRPCError::new(request.id.clone(), code, message))
                }
            },
        };

        if let Err(err) = self.transport.send_message(response).await {
            warn!(%err, method = %request.method, "failed to send response, peer may be gone");
        }
    }

    async fn handle_notification(&self, notification: JSONRPCNotification) {
        let handler = self
            .notification_handlers
            .get(&notification.method)
            .map(|entry| entry.value().clone());

        match handler {
            None => debug!(method = %notification.method, "no notification handler registered"),
            Some(handler) => {
                if let Err(err) = handler(notification.params.clone()).await {
                    warn!(%err, method = %notification.method, "notification handler failed");
                }
            }
        }
    }

    /// Flush outbound, stop inbound, and fail every pending request with a
    /// session-closed error.
    pub async fn close_gracefully(&self) -> Result<(), SessionError> {
        self.set_state(SessionState::Closing);
        let result = self.transport.close_gracefully().await;
        self.fail_all_pending();
        self.set_state(SessionState::Closed);
        result.map_err(SessionError::from)
    }

    /// Forced close: same end state as [`Self::close_gracefully`] but does
    /// not propagate a transport-level close failure.
    pub async fn close(&self) {
        self.set_state(SessionState::Closing);
        self.fail_all_pending();
        let _ = self.transport.close_gracefully().await;
        self.set_state(SessionState::Closed);
    }

    fn fail_all_pending(&self) {
        let ids: Vec<RequestId> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(PendingOutcome::SessionClosed);
            }
        }
    }

    pub fn pending_request_count(&self) -> usize {
        self.pending.len()
    }
}

/// `Params` is frequently `Option<T>`; `None` must be encoded as an absent
/// `params` field rather than a JSON `null`.
fn json_or_absent<T: Serialize>(params: &T) -> Result<Option<Value>, SessionError> {
    let value = serde_json::to_value(params).map_err(mcp_transport::TransportError::Decode)?;
    Ok(if value.is_null() { None } else { Some(value) })
}
