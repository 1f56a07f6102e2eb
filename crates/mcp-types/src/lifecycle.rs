use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

use crate::capabilities::ClientCapabilities;
use crate::capabilities::ServerCapabilities;
use crate::method::ModelContextProtocolNotification;
use crate::method::ModelContextProtocolRequest;

/// The version of the protocol this crate implements. Offered first in the
/// `initialize` request's `protocolVersion` list.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Every version this crate can speak to a peer, newest first. A client
/// walks this list when proposing `protocolVersion`; a server checks an
/// incoming proposal against it.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2024-11-05"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequestParams {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: Implementation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

pub struct InitializeRequest;
impl ModelContextProtocolRequest for InitializeRequest {
    const METHOD: &'static str = "initialize";
    type Params = InitializeRequestParams;
    type Result = InitializeResult;
}

pub struct InitializedNotification;
impl ModelContextProtocolNotification for InitializedNotification {
    const METHOD: &'static str = "notifications/initialized";
    type Params = Option<serde_json::Value>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct EmptyResult {}

pub struct PingRequest;
impl ModelContextProtocolRequest for PingRequest {
    const METHOD: &'static str = "ping";
    type Params = Option<serde_json::Value>;
    type Result = EmptyResult;
}
