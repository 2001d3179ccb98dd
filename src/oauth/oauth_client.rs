use crate::{config::OAuthConfig, oauth::OAuthError};
use url::Url;

/// Hosts that use the dedicated GitHub OAuth application when the tool doesn't define a client.
const GITHUB_HOST_SUFFIXES: [&str; 2] = ["github.com", "githubcopilot.com"];

/// OAuth client registered with the authorization server.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl OAuthClient {
    /// Picks the OAuth client for the MCP server: the client configured for the tool wins, then
    /// the GitHub client for GitHub hosts, and then the default client.
    pub fn resolve(
        tool_client: Option<OAuthClient>,
        server_url: &Url,
        config: &OAuthConfig,
    ) -> Result<Self, OAuthError> {
        if let Some(client) = tool_client.filter(|client| !client.client_id.is_empty()) {
            return Ok(client);
        }

        let is_github_host = server_url.host_str().is_some_and(|host| {
            GITHUB_HOST_SUFFIXES
                .iter()
                .any(|suffix| host.ends_with(suffix))
        });
        if let (true, Some(client_id)) = (is_github_host, &config.github_client_id) {
            return Ok(Self {
                client_id: client_id.clone(),
                client_secret: config.github_client_secret.clone(),
            });
        }

        if let Some(ref client_id) = config.default_client_id {
            return Ok(Self {
                client_id: client_id.clone(),
                client_secret: config.default_client_secret.clone(),
            });
        }

        Err(OAuthError::Configuration(
            "Missing OAuth clientId. Configure it in the MCP tool or set `oauth.default_client_id`."
                .to_string(),
        ))
    }
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
