//! Exercises the stdio transport end to end against `cat`, which simply
//! echoes whatever it reads on stdin back out on stdout — enough to prove
//! the framing, spawn, and worker-task wiring without needing a real MCP
//! server binary.

use std::ffi::OsString;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use mcp_transport::Transport;
use mcp_transport::stdio::StdioChildTransport;
use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use tokio::sync::Notify;

#[tokio::test]
async fn echoes_a_notification_back_through_cat() {
    let transport = StdioChildTransport::spawn(OsString::from("cat"), Vec::new(), None)
        .await
        .expect("failed to spawn cat");

    let received = Arc::new(Notify::new());
    let got_it = Arc::new(AtomicBool::new(false));
    let received_for_handler = received.clone();
    let got_it_for_handler = got_it.clone();

    transport
        .connect(Arc::new(move |message: JSONRPCMessage| {
            let received = received_for_handler.clone();
            let got_it = got_it_for_handler.clone();
            Box::pin(async move {
                if let JSONRPCMessage::Notification(n) = &message {
                    if n.method == "notifications/initialized" {
                        got_it.store(true, Ordering::SeqCst);
                        received.notify_one();
                    }
                }
                None
            })
        }))
        .await
        .expect("connect failed");

    let notification = JSONRPCNotification {
        jsonrpc: JSONRPC_VERSION.into(),
        method: "notifications/initialized".into(),
        params: None,
    };
    transport
        .send_message(JSONRPCMessage::Notification(notification))
        .await
        .expect("send_message failed");

    tokio::time::timeout(Duration::from_secs(5), received.notified())
        .await
        .expect("timed out waiting for cat to echo the line back");
    assert!(got_it.load(Ordering::SeqCst));

    transport.close_gracefully().await.expect("close failed");
}
