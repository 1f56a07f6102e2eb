//! An in-memory duplex [`Transport`] used by integration tests so that
//! Session/Client/Server behavior can be exercised without spawning a real
//! process or binding a real socket.

use mcp_transport::InboundHandler;
use mcp_transport::Transport;
use mcp_transport::TransportError;
use mcp_types::JSONRPCMessage;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 256;

/// One end of an in-memory duplex pipe. Whatever is sent on one end is
/// delivered, unmodified, to the other end's connected handler.
pub struct DuplexTransport {
    outbound_tx: mpsc::Sender<JSONRPCMessage>,
    inbound_rx: Mutex<Option<mpsc::Receiver<JSONRPCMessage>>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

/// Construct a connected pair: messages sent on `a` arrive at `b`'s
/// handler and vice versa.
pub fn duplex_pair() -> (DuplexTransport, DuplexTransport) {
    let (a_tx, b_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (b_tx, a_rx) = mpsc::channel(CHANNEL_CAPACITY);
    (
        DuplexTransport {
            outbound_tx: a_tx,
            inbound_rx: Mutex::new(Some(a_rx)),
            reader_task: Mutex::new(None),
        },
        DuplexTransport {
            outbound_tx: b_tx,
            inbound_rx: Mutex::new(Some(b_rx)),
            reader_task: Mutex::new(None),
        },
    )
}

#[async_trait::async_trait]
impl Transport for DuplexTransport {
    async fn connect(&self, handler: InboundHandler) -> Result<(), TransportError> {
        let mut rx = self
            .inbound_rx
            .lock()
            .await
            .take()
            .ok_or(TransportError::NotConnected)?;
        let task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let _ = handler(message).await;
            }
        });
        *self.reader_task.lock().await = Some(task);
        Ok(())
    }

    async fn send_message(&self, message: JSONRPCMessage) -> Result<(), TransportError> {
        self.outbound_tx
            .try_send(message)
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => TransportError::EnqueueFailed,
                mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
            })
    }

    async fn close_gracefully(&self) -> Result<(), TransportError> {
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        Ok(())
    }
}
