use serde::Serialize;
use uuid::Uuid;

/// Message the OAuth popup page posts to the window that opened it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum PopupMessage {
    #[serde(rename = "mcp-oauth-complete", rename_all = "camelCase")]
    Complete {
        tool_id: Uuid,
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        return_url: Option<String>,
    },
    #[serde(rename = "mcp-oauth-error")]
    Error { error: String },
}

impl PopupMessage {
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }
}
