//! End-to-end round trip between the SSE server and client transports
//! bound to an ephemeral local port.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use mcp_transport::Transport;
use mcp_transport::sse::SseClientTransport;
use mcp_transport::sse::SseServerTransport;
use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use tokio::sync::Notify;

#[tokio::test]
async fn client_request_reaches_server_handler() {
    let server = SseServerTransport::new("127.0.0.1:0".parse().unwrap());

    let server_saw_it = Arc::new(AtomicBool::new(false));
    let server_notify = Arc::new(Notify::new());
    let saw_it = server_saw_it.clone();
    let notify = server_notify.clone();
    server
        .connect(Arc::new(move |message: JSONRPCMessage| {
            let saw_it = saw_it.clone();
            let notify = notify.clone();
            Box::pin(async move {
                if let JSONRPCMessage::Notification(n) = &message {
                    if n.method == "notifications/initialized" {
                        saw_it.store(true, Ordering::SeqCst);
                        notify.notify_one();
                    }
                }
                None
            })
        }))
        .await
        .expect("server connect failed");

    let addr = server.local_addr().await.expect("server did not bind");
    let client = SseClientTransport::new(format!("http://{addr}"));
    client
        .connect(Arc::new(|_message: JSONRPCMessage| Box::pin(async { None })))
        .await
        .expect("client connect failed");

    let notification = JSONRPCNotification {
        jsonrpc: JSONRPC_VERSION.into(),
        method: "notifications/initialized".into(),
        params: None,
    };
    client
        .send_message(JSONRPCMessage::Notification(notification))
        .await
        .expect("client send_message failed");

    tokio::time::timeout(Duration::from_secs(5), server_notify.notified())
        .await
        .expect("server never observed the posted notification");
    assert!(server_saw_it.load(Ordering::SeqCst));

    client.close_gracefully().await.unwrap();
    server.close_gracefully().await.unwrap();
}
