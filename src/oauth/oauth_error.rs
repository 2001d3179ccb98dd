/// Failures of the MCP OAuth authorization flow.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// State is missing, forged, expired or doesn't match the pending authorization.
    #[error("Invalid OAuth state: {0}")]
    InvalidState(String),
    /// Authorization server refused to issue tokens.
    #[error("{0}")]
    ExchangeFailed(String),
    /// Authorization server endpoints cannot be resolved.
    #[error("{0}")]
    Discovery(String),
    /// The tool or the service isn't configured for OAuth.
    #[error("{0}")]
    Configuration(String),
}
