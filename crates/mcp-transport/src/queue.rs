//! A bounded single-writer outbound queue shared by every transport variant.
//!
//! Each transport owns one of these per direction; a dedicated task drains
//! it and performs the actual write (stdin, HTTP POST, ...) so that framed
//! envelopes are never interleaved mid-record. `try_enqueue` never blocks:
//! a full queue fails fast with [`TransportError::EnqueueFailed`] rather
//! than letting a slow peer stall the caller indefinitely.

use std::sync::Arc;

use futures::future::BoxFuture;
use mcp_types::JSONRPCMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::TransportError;

const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub struct OutboundQueue {
    tx: mpsc::Sender<JSONRPCMessage>,
}

impl OutboundQueue {
    /// Spawn the writer task. `write_one` performs the actual transmission
    /// of a single envelope and is called sequentially, in enqueue order.
    pub fn spawn<F>(write_one: F) -> (Self, JoinHandle<()>)
    where
        F: Fn(JSONRPCMessage) -> BoxFuture<'static, Result<(), TransportError>>
            + Send
            + Sync
            + 'static,
    {
        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let write_one = Arc::new(write_one);
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(err) = write_one(message).await {
                    tracing::warn!(error = %err, "outbound writer stopping after a failed write");
                    break;
                }
            }
        });
        (Self { tx }, handle)
    }

    pub fn try_enqueue(&self, message: JSONRPCMessage) -> Result<(), TransportError> {
        self.tx.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => TransportError::EnqueueFailed,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}
