mod database_config;
mod http_config;
mod oauth_config;
mod raw_config;
mod security_config;

use url::Url;

pub use self::{
    database_config::DatabaseConfig,
    http_config::{HttpClientConfig, HttpConfig},
    oauth_config::OAuthConfig,
    raw_config::RawConfig,
    security_config::SecurityConfig,
};

/// Main server config.
#[derive(Clone, Debug)]
pub struct Config {
    /// Version of the Toolvault binary.
    pub version: String,
    /// External/public URL through which service is being accessed. Used to construct OAuth
    /// redirect URIs and to validate same-origin return URLs.
    pub public_url: Url,
    /// Database configuration.
    pub db: DatabaseConfig,
    /// Security configuration (JWT, secrets encryption, sessions).
    pub security: SecurityConfig,
    /// Configuration for the outbound HTTP functionality.
    pub http: HttpConfig,
    /// Configuration for the MCP OAuth flow.
    pub oauth: OAuthConfig,
}

impl Config {
    /// Returns the redirect URI registered with OAuth authorization servers.
    pub fn oauth_redirect_uri(&self) -> String {
        format!(
            "{}/api/mcp/oauth/callback",
            self.public_url.as_str().trim_end_matches('/')
        )
    }
}

impl AsRef<Config> for Config {
    fn as_ref(&self) -> &Config {
        self
    }
}

impl From<RawConfig> for Config {
    fn from(raw_config: RawConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            public_url: raw_config.public_url,
            db: raw_config.db,
            security: raw_config.security,
            http: raw_config.http,
            oauth: raw_config.oauth,
        }
    }
}
