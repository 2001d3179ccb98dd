use crate::users::UserId;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Authorization that has been started, but not completed yet. It's kept in the browser session
/// between the start and callback requests and can be consumed only once.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingAuthorization {
    pub user_id: UserId,
    pub tool_id: Uuid,
    pub state: String,
    pub code_verifier: String,
    #[serde(with = "time::serde::timestamp")]
    pub issued_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
}

impl PendingAuthorization {
    /// Name of the session entry that holds the pending authorization.
    pub const SESSION_KEY: &'static str = "mcp_oauth";
}
