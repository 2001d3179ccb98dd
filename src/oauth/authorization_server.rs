use serde::Deserialize;
use url::Url;

/// Metadata published by the MCP server as an OAuth protected resource (RFC 9728).
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedResourceMetadata {
    pub resource: Option<String>,
    #[serde(default)]
    pub authorization_servers: Vec<String>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
}

/// Subset of the OAuth authorization server metadata (RFC 8414) or OpenID provider metadata.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationServerMetadata {
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
}

/// Endpoints and parameters of the authorization server that protects an MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationServer {
    pub authorization_url: Url,
    pub token_url: Url,
    /// Resource indicator (RFC 8707) to include into authorization and token requests.
    pub resource: Option<String>,
    pub scopes: Vec<String>,
}

/// Builds the well-known URL for the specified metadata suffix, the path of the original URL is
/// appended after the suffix, query and fragment are dropped.
pub fn well_known_url(url: &Url, suffix: &str) -> Url {
    let mut well_known_url = url.clone();
    let path = url.path().trim_end_matches('/');
    well_known_url.set_path(&format!("/.well-known/{suffix}{path}"));
    well_known_url.set_query(None);
    well_known_url.set_fragment(None);
    well_known_url
}
