use std::sync::Arc;
use std::time::Duration;

use mcp_session::HandlerFailure;
use mcp_session::Session;
use mcp_session::SessionError;
use mcp_session::SessionState;
use mcp_test_support::duplex_pair;
use mcp_types::METHOD_NOT_FOUND;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn request_reaches_handler_and_response_completes_the_caller() {
    let (client_transport, server_transport) = duplex_pair();
    let client = Session::new(Arc::new(client_transport), Duration::from_secs(5));
    let server = Session::new(Arc::new(server_transport), Duration::from_secs(5));

    server.register_request_handler(
        "ping",
        Arc::new(|_params| Box::pin(async { Ok(json!({"ok": true})) })),
    );

    client.start().await.unwrap();
    server.start().await.unwrap();

    let result = client.send_request("ping", None).await.unwrap();
    assert_eq!(result, json!({"ok": true}));
}

#[tokio::test]
async fn unregistered_method_yields_method_not_found() {
    let (client_transport, server_transport) = duplex_pair();
    let client = Session::new(Arc::new(client_transport), Duration::from_secs(5));
    let server = Session::new(Arc::new(server_transport), Duration::from_secs(5));

    client.start().await.unwrap();
    server.start().await.unwrap();

    let err = client
        .send_request("unknown.method", None)
        .await
        .unwrap_err();
    match err {
        SessionError::Protocol { code, .. } => assert_eq!(code, METHOD_NOT_FOUND),
        other => panic!("expected a protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn a_handler_failure_becomes_a_protocol_error_for_the_caller() {
    let (client_transport, server_transport) = duplex_pair();
    let client = Session::new(Arc::new(client_transport), Duration::from_secs(5));
    let server = Session::new(Arc::new(server_transport), Duration::from_secs(5));

    server.register_request_handler(
        "always_fails",
        Arc::new(|_params| {
            Box::pin(async { Err(HandlerFailure::internal("boom")) })
        }),
    );

    client.start().await.unwrap();
    server.start().await.unwrap();

    let err = client.send_request("always_fails", None).await.unwrap_err();
    match err {
        SessionError::Protocol { message, .. } => assert_eq!(message, "boom"),
        other => panic!("expected a protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn a_request_with_no_reply_times_out_and_is_removed_from_pending() {
    let (client_transport, server_transport) = duplex_pair();
    let client = Session::new(Arc::new(client_transport), Duration::from_secs(5));
    // The server session never registers a handler for "slow" and never
    // replies at all (its notification handler for "slow" just drops it),
    // simulating a peer that never answers.
    let server = Session::new(Arc::new(server_transport), Duration::from_secs(5));
    server.register_notification_handler(
        "slow",
        Arc::new(|_params| Box::pin(async { Ok(()) })),
    );

    client.start().await.unwrap();
    server.start().await.unwrap();

    assert_eq!(client.pending_request_count(), 0);
    let err = client
        .send_request_with_timeout("slow", None, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Timeout));
    assert_eq!(client.pending_request_count(), 0);
}

#[tokio::test]
async fn closing_the_session_fails_all_pending_requests() {
    let (client_transport, server_transport) = duplex_pair();
    let client = Session::new(Arc::new(client_transport), Duration::from_secs(5));
    let server = Session::new(Arc::new(server_transport), Duration::from_secs(5));

    // No handler is registered server-side, so this request never gets a
    // reply and stays pending until we close the client session out from
    // under it.
    client.start().await.unwrap();
    server.start().await.unwrap();

    let client_for_request = client.clone();
    let pending_call = tokio::spawn(async move {
        client_for_request
            .send_request_with_timeout("never_answered", None, Duration::from_secs(30))
            .await
    });

    // Give the request a moment to register in `pending` before closing.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.pending_request_count(), 1);

    client.close_gracefully().await.unwrap();
    assert_eq!(client.state(), SessionState::Closed);

    let result = pending_call.await.unwrap();
    assert!(matches!(result, Err(SessionError::Closed)));
    assert_eq!(client.pending_request_count(), 0);
}
