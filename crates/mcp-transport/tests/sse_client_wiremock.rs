//! Exercises `SseClientTransport` against an HTTP double rather than a real
//! `SseServerTransport`, so the client side's endpoint-discovery and
//! message-posting logic is covered in isolation.

use std::time::Duration;

use mcp_transport::Transport;
use mcp_transport::sse::SseClientTransport;
use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use pretty_assertions::assert_eq;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::path_regex;

const SSE_BODY: &str = "event: endpoint\ndata: /message/test-session\n\n";

#[tokio::test]
async fn discovers_the_endpoint_and_posts_outbound_messages_to_it() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(SSE_BODY, "text/event-stream"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex("^/message/.+$"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let client = SseClientTransport::new(server.uri());
    client
        .connect(std::sync::Arc::new(|_message: JSONRPCMessage| {
            Box::pin(async { None })
        }))
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

    // Give the outbound queue's writer task a chance to post the envelope.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let requests = server.received_requests().await.expect("mock server should record requests");
    let posted = requests
        .iter()
        .find(|req| req.method.as_str() == "POST")
        .expect("client never posted to the discovered endpoint");
    assert_eq!(posted.url.path(), "/message/test-session");
    let body: JSONRPCMessage = serde_json::from_slice(&posted.body).unwrap();
    match body {
        JSONRPCMessage::Notification(n) => assert_eq!(n.method, "notifications/initialized"),
        other => panic!("expected a notification, got {other:?}"),
    }

    client.close_gracefully().await.unwrap();
}

#[tokio::test]
async fn surfaces_a_timeout_when_the_endpoint_event_never_arrives() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw("", "text/event-stream"),
        )
        .mount(&server)
        .await;

    let client = SseClientTransport::with_endpoint_wait(server.uri(), Duration::from_millis(100));
    let err = client
        .connect(std::sync::Arc::new(|_message: JSONRPCMessage| {
            Box::pin(async { None })
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, mcp_transport::TransportError::EndpointDiscoveryTimeout));
}
