use serde::Serialize;
use uuid::Uuid;

/// Why the user should (re-)authorize the MCP tool.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    /// User has never authorized the tool, or the authorization expired and cannot be refreshed.
    Missing,
    /// Stored tokens cannot be decrypted or parsed.
    Unreadable,
}

/// Request for the user to authorize the MCP tool before it can be used.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename = "mcp-oauth", rename_all = "camelCase")]
pub struct AuthorizationRequest {
    pub tool_id: Uuid,
    pub tool_name: String,
    /// Start endpoint of the authorization flow for the tool.
    pub authorization_url: String,
    /// Whether the UI should navigate to the authorization page instead of opening a popup.
    pub top_level_navigation: bool,
    pub status: AuthorizationStatus,
}
