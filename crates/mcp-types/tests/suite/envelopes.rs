use mcp_types::JSONRPCError;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPC_VERSION;
use mcp_types::METHOD_NOT_FOUND;
use mcp_types::RequestId;
use serde_json::json;

#[test]
fn method_not_found_error_matches_wire_example() {
    let err = JSONRPCError::method_not_found(RequestId::String("x-7".into()), "unknown.method");
    let value = serde_json::to_value(&JSONRPCMessage::Error(err)).unwrap();
    assert_eq!(
        value,
        json!({
            "jsonrpc": "2.0",
            "id": "x-7",
            "error": { "code": -32601, "message": "Method not found: unknown.method" }
        })
    );
}

#[test]
fn distinguishes_notification_from_request_by_id_presence() {
    let request = json!({"jsonrpc":"2.0","id":1,"method":"ping"});
    let notification = json!({"jsonrpc":"2.0","method":"notifications/initialized"});
    assert!(matches!(
        JSONRPCMessage::parse(request).unwrap(),
        JSONRPCMessage::Request(_)
    ));
    assert!(matches!(
        JSONRPCMessage::parse(notification).unwrap(),
        JSONRPCMessage::Notification(_)
    ));
}

#[test]
fn error_and_result_are_mutually_exclusive_by_construction() {
    let error = JSONRPCErrorError {
        code: METHOD_NOT_FOUND,
        message: "nope".into(),
        data: None,
    };
    let msg = JSONRPCMessage::Error(JSONRPCError {
        jsonrpc: JSONRPC_VERSION.into(),
        id: RequestId::Integer(9),
        error: error.clone(),
    });
    let value = serde_json::to_value(&msg).unwrap();
    assert!(value.get("error").is_some());
    assert!(value.get("result").is_none());
}
