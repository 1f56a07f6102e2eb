use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

use crate::method::ModelContextProtocolNotification;
use crate::method::ModelContextProtocolRequest;

/// Ordered debug(0) < ... < emergency(7), per the syslog severity scale the
/// MCP logging capability borrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct SetLevelRequestParams {
    pub level: LoggingLevel,
}

pub struct SetLevelRequest;
impl ModelContextProtocolRequest for SetLevelRequest {
    const METHOD: &'static str = "logging/setLevel";
    type Params = SetLevelRequestParams;
    type Result = crate::lifecycle::EmptyResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct LoggingMessageNotificationParams {
    pub level: LoggingLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    pub data: serde_json::Value,
}

pub struct LoggingMessageNotification;
impl ModelContextProtocolNotification for LoggingMessageNotification {
    const METHOD: &'static str = "notifications/message";
    type Params = LoggingMessageNotificationParams;
}
