use serde::{Deserialize, Serialize};

/// Session descriptor returned by `POST /v1/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    /// CDP endpoint for the session's browser.
    pub websocket_url: String,
}
