use serde_derive::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use std::time::Duration;

/// Configuration for the MCP OAuth authorization flow.
#[serde_as]
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OAuthConfig {
    /// OAuth client ID used for MCP servers whose tool configuration doesn't define one.
    pub default_client_id: Option<String>,
    /// OAuth client secret paired with `default_client_id`.
    pub default_client_secret: Option<String>,
    /// OAuth client ID used for GitHub-hosted MCP servers (`github.com`, `githubcopilot.com`).
    pub github_client_id: Option<String>,
    /// OAuth client secret paired with `github_client_id`.
    pub github_client_secret: Option<String>,
    /// Maximum age of a pending authorization (state and PKCE verifier). Default is 10 minutes.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_state_ttl")]
    pub state_ttl: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            default_client_id: None,
            default_client_secret: None,
            github_client_id: None,
            github_client_secret: None,
            state_ttl: default_state_ttl(),
        }
    }
}

const fn default_state_ttl() -> Duration {
    Duration::from_secs(600)
}

#[cfg(test)]
mod tests {
    use crate::config::OAuthConfig;
    use insta::assert_toml_snapshot;
    use std::time::Duration;

    #[test]
    fn serialization_and_default() {
        assert_toml_snapshot!(OAuthConfig::default(), @"state_ttl = 600000");

        let config = OAuthConfig {
            github_client_id: Some("gh-client".to_string()),
            state_ttl: Duration::from_secs(60),
            ..Default::default()
        };
        assert_toml_snapshot!(config, @r###"
        github_client_id = 'gh-client'
        state_ttl = 60000
        "###);
    }

    #[test]
    fn deserialization() {
        let config: OAuthConfig = toml::from_str(
            r#"
        default_client_id = 'client'
        default_client_secret = 'secret'
    "#,
        )
        .unwrap();
        assert_eq!(
            config,
            OAuthConfig {
                default_client_id: Some("client".to_string()),
                default_client_secret: Some("secret".to_string()),
                ..Default::default()
            }
        );
    }
}
