use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

use crate::method::ModelContextProtocolNotification;
use crate::method::ModelContextProtocolRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Root {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ListRootsResult {
    pub roots: Vec<Root>,
}

pub struct ListRootsRequest;
impl ModelContextProtocolRequest for ListRootsRequest {
    const METHOD: &'static str = "roots/list";
    type Params = Option<serde_json::Value>;
    type Result = ListRootsResult;
}

pub struct RootsListChangedNotification;
impl ModelContextProtocolNotification for RootsListChangedNotification {
    const METHOD: &'static str = "notifications/roots/list_changed";
    type Params = Option<serde_json::Value>;
}
