use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use mcp_server::ServerBuilder;
use mcp_server::ServerError;
use mcp_session::Session;
use mcp_test_support::duplex_pair;
use mcp_types::CallToolResult;
use mcp_types::ClientCapabilities;
use mcp_types::ContentBlock;
use mcp_types::Implementation;
use mcp_types::InitializeRequest;
use mcp_types::InitializeRequestParams;
use mcp_types::LoggingLevel;
use mcp_types::SetLevelRequest;
use mcp_types::SetLevelRequestParams;
use mcp_types::ServerCapabilities;
use mcp_types::Tool;
use mcp_types::ToolsCapability;
use mcp_types::INVALID_REQUEST;
use mcp_types::LATEST_PROTOCOL_VERSION;
use mcp_types::METHOD_NOT_FOUND;
use pretty_assertions::assert_eq;
use serde_json::json;

fn client_info() -> Implementation {
    Implementation {
        name: "test-client".to_owned(),
        version: "0.0.0".to_owned(),
        title: None,
    }
}

fn server_info() -> Implementation {
    Implementation {
        name: "fake-server".to_owned(),
        version: "0.0.0".to_owned(),
        title: None,
    }
}

/// Wires a `mcp_server::Server` against a bare `Session` standing in for a
/// client, leaving `initialize` to be driven explicitly by each test.
async fn connected_server(capabilities: ServerCapabilities) -> (Arc<mcp_server::Server>, Arc<Session>) {
    let (server_transport, client_transport) = duplex_pair();
    let client = Session::new(Arc::new(client_transport), Duration::from_secs(5));
    client.start().await.unwrap();

    let server = ServerBuilder::new(Arc::new(server_transport), server_info())
        .capabilities(capabilities)
        .build();
    server.connect().await.unwrap();

    (server, client)
}

async fn initialize(client: &Session) -> mcp_types::InitializeResult {
    client
        .call::<InitializeRequest>(InitializeRequestParams {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: client_info(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn initialize_records_client_capabilities_and_replies_with_own() {
    let capabilities = ServerCapabilities {
        tools: Some(ToolsCapability { list_changed: Some(true) }),
        ..Default::default()
    };
    let (server, client) = connected_server(capabilities.clone()).await;

    let result = initialize(&client).await;
    assert_eq!(result.server_info, server_info());
    assert_eq!(result.capabilities, capabilities);
    assert_eq!(server.client_info(), Some(client_info()));
}

#[tokio::test]
async fn a_second_initialize_is_rejected_as_invalid_request() {
    let (_server, client) = connected_server(ServerCapabilities::default()).await;
    initialize(&client).await;

    let err = client
        .call::<InitializeRequest>(InitializeRequestParams {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: client_info(),
        })
        .await
        .unwrap_err();

    match err {
        mcp_session::SessionError::Protocol { code, .. } => assert_eq!(code, INVALID_REQUEST),
        other => panic!("expected a protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn tools_call_happy_path_and_unknown_tool() {
    let capabilities = ServerCapabilities {
        tools: Some(ToolsCapability { list_changed: Some(true) }),
        ..Default::default()
    };
    let (server, client) = connected_server(capabilities).await;
    initialize(&client).await;

    server
        .add_tool(
            Tool {
                name: "echo".to_owned(),
                description: None,
                input_schema: json!({"type": "object"}),
            },
            Arc::new(|arguments| {
                Box::pin(async move {
                    let text = arguments
                        .and_then(|v| v.get("text").and_then(|v| v.as_str()).map(str::to_owned))
                        .unwrap_or_default();
                    CallToolResult {
                        content: vec![ContentBlock::text(text)],
                        is_error: None,
                        structured_content: None,
                    }
                })
            }),
        )
        .await
        .unwrap();

    let result = client
        .call::<mcp_types::CallToolRequest>(mcp_types::CallToolRequestParams {
            name: "echo".to_owned(),
            arguments: Some(json!({"text": "hi"})),
        })
        .await
        .unwrap();
    assert_eq!(result.is_error, None);
    assert_eq!(result.content, vec![ContentBlock::text("hi")]);

    let unknown = client
        .call::<mcp_types::CallToolRequest>(mcp_types::CallToolRequestParams {
            name: "does-not-exist".to_owned(),
            arguments: None,
        })
        .await
        .unwrap();
    assert_eq!(unknown.is_error, Some(true));
}

#[tokio::test]
async fn an_unregistered_method_is_method_not_found() {
    let (_server, client) = connected_server(ServerCapabilities::default()).await;
    initialize(&client).await;

    let err = client
        .send_request("not/a/real/method", None)
        .await
        .unwrap_err();
    match err {
        mcp_session::SessionError::Protocol { code, .. } => assert_eq!(code, METHOD_NOT_FOUND),
        other => panic!("expected a protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn a_request_with_no_reply_times_out() {
    let (server_transport, client_transport) = duplex_pair();
    let client = Session::new(Arc::new(client_transport), Duration::from_millis(50));
    client.start().await.unwrap();
    // A server session that never registers any handlers: the peer sees a
    // request land but nothing ever answers it.
    let silent_server = Session::new(Arc::new(server_transport), Duration::from_secs(5));
    silent_server.start().await.unwrap();

    let err = client.send_request("tools/list", None).await.unwrap_err();
    assert!(matches!(err, mcp_session::SessionError::Timeout));
}

#[tokio::test]
async fn adding_a_tool_without_declaring_the_capability_fails_locally() {
    let (server, _client) = connected_server(ServerCapabilities::default()).await;

    let err = server
        .add_tool(
            Tool {
                name: "echo".to_owned(),
                description: None,
                input_schema: json!({"type": "object"}),
            },
            Arc::new(|_| Box::pin(async { CallToolResult::error("unreachable") })),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::MissingOwnCapability("tools")));
}

#[tokio::test]
async fn a_tools_list_changed_notification_fans_out_to_the_peer() {
    let capabilities = ServerCapabilities {
        tools: Some(ToolsCapability { list_changed: Some(true) }),
        ..Default::default()
    };
    let (server, client) = connected_server(capabilities).await;
    initialize(&client).await;

    let seen: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
    let seen_for_handler = seen.clone();
    client.register_notification_handler(
        "notifications/tools/list_changed",
        Arc::new(move |_params| {
            let seen = seen_for_handler.clone();
            Box::pin(async move {
                *seen.lock().unwrap() += 1;
                Ok(())
            })
        }),
    );

    server
        .add_tool(
            Tool {
                name: "calculator".to_owned(),
                description: None,
                input_schema: json!({"type": "object"}),
            },
            Arc::new(|_| Box::pin(async { CallToolResult::error("unused") })),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*seen.lock().unwrap(), 1);
}

#[tokio::test]
async fn logging_notification_is_filtered_by_the_minimum_level() {
    let capabilities = ServerCapabilities {
        logging: Some(mcp_types::LoggingCapability {}),
        ..Default::default()
    };
    let (server, client) = connected_server(capabilities).await;
    initialize(&client).await;

    let seen: Arc<Mutex<Vec<LoggingLevel>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_for_handler = seen.clone();
    client.register_notification_handler(
        "notifications/message",
        Arc::new(move |params| {
            let seen = seen_for_handler.clone();
            Box::pin(async move {
                let params: mcp_types::LoggingMessageNotificationParams =
                    serde_json::from_value(params.unwrap())?;
                seen.lock().unwrap().push(params.level);
                Ok(())
            })
        }),
    );

    client
        .call::<SetLevelRequest>(SetLevelRequestParams { level: LoggingLevel::Warning })
        .await
        .unwrap();

    server
        .logging_notification(LoggingLevel::Debug, None, json!("too quiet"))
        .await;
    server
        .logging_notification(LoggingLevel::Error, None, json!("loud enough"))
        .await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), [LoggingLevel::Error]);
}

#[tokio::test]
async fn resource_updates_are_a_no_op_for_an_unsubscribed_uri() {
    let capabilities = ServerCapabilities {
        resources: Some(mcp_types::ResourcesCapability { list_changed: None, subscribe: Some(true) }),
        ..Default::default()
    };
    let (server, client) = connected_server(capabilities).await;
    initialize(&client).await;

    let seen = Arc::new(Mutex::new(0));
    let seen_for_handler = seen.clone();
    client.register_notification_handler(
        "notifications/resources/updated",
        Arc::new(move |_params| {
            let seen = seen_for_handler.clone();
            Box::pin(async move {
                *seen.lock().unwrap() += 1;
                Ok(())
            })
        }),
    );

    // Not subscribed: this must not reach the peer.
    server.notify_resource_updated("file:///never-subscribed").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*seen.lock().unwrap(), 0);

    client
        .call::<mcp_types::SubscribeRequest>(mcp_types::SubscribeRequestParams {
            uri: "file:///workspace/a.txt".to_owned(),
        })
        .await
        .unwrap();
    server.notify_resource_updated("file:///workspace/a.txt").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*seen.lock().unwrap(), 1);
}
