//! Traits binding a method name to its typed params/result, so the session
//! and role layers can issue `send_request::<ListToolsRequest>(params)`
//! instead of stringly-typed dispatch.

use serde::Serialize;
use serde::de::DeserializeOwned;

pub trait ModelContextProtocolRequest {
    const METHOD: &'static str;
    type Params: Serialize + DeserializeOwned;
    type Result: Serialize + DeserializeOwned;
}

pub trait ModelContextProtocolNotification {
    const METHOD: &'static str;
    type Params: Serialize + DeserializeOwned;
}
