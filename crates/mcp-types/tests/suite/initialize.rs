use mcp_types::ClientCapabilities;
use mcp_types::Implementation;
use mcp_types::InitializeRequestParams;
use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCRequest;
use mcp_types::RequestId;
use serde_json::json;

#[test]
fn deserialize_initialize_request() {
    let raw = r#"{
        "jsonrpc": "2.0",
        "id": "c-0",
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": { "roots": { "listChanged": false } },
            "clientInfo": { "name": "test-client", "version": "1.0.0" }
        }
    }"#;

    let msg: JSONRPCMessage =
        serde_json::from_str(raw).expect("failed to deserialize JSONRPCMessage");

    let JSONRPCMessage::Request(json_req) = msg else {
        unreachable!("expected Request variant")
    };

    let params: InitializeRequestParams =
        serde_json::from_value(json_req.params.clone().unwrap()).unwrap();
    assert_eq!(params.protocol_version, "2024-11-05");
    assert_eq!(
        params.capabilities,
        ClientCapabilities {
            roots: Some(mcp_types::RootsCapability {
                list_changed: Some(false)
            }),
            sampling: None,
            experimental: None,
        }
    );
    assert_eq!(
        params.client_info,
        Implementation {
            name: "test-client".into(),
            version: "1.0.0".into(),
            title: None,
        }
    );

    let expected_req = JSONRPCRequest {
        jsonrpc: JSONRPC_VERSION.into(),
        id: RequestId::String("c-0".into()),
        method: "initialize".into(),
        params: json_req.params.clone(),
    };
    assert_eq!(json_req, expected_req);
}

#[test]
fn serialize_initialize_result_omits_absent_instructions() {
    let result = mcp_types::InitializeResult {
        protocol_version: "2024-11-05".into(),
        capabilities: mcp_types::ServerCapabilities {
            tools: Some(mcp_types::ToolsCapability {
                list_changed: Some(true),
            }),
            ..Default::default()
        },
        server_info: Implementation {
            name: "test-server".into(),
            version: "1.0.0".into(),
            title: None,
        },
        instructions: None,
    };
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(
        value,
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": { "listChanged": true } },
            "serverInfo": { "name": "test-server", "version": "1.0.0" },
        })
    );
}
