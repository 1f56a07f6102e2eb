use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPC_VERSION;
use mcp_types::ModelContextProtocolNotification;
use mcp_types::ToolListChangedNotification;

#[test]
fn notification_round_trips_with_no_params() {
    let notification = JSONRPCNotification {
        jsonrpc: JSONRPC_VERSION.into(),
        method: ToolListChangedNotification::METHOD.into(),
        params: None,
    };
    let msg = JSONRPCMessage::Notification(notification.clone());
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"jsonrpc":"2.0","method":"notifications/tools/list_changed"})
    );
    let parsed = JSONRPCMessage::parse(value).unwrap();
    assert_eq!(parsed, JSONRPCMessage::Notification(notification));
}
