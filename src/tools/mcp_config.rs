use crate::tools::ConfigSchema;
use serde::{Deserialize, Serialize};

/// Configuration of the `mcp` tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct McpToolConfig {
    /// URL of the MCP server.
    pub url: String,
    #[serde(default)]
    pub authentication: McpAuthentication,
}

/// How the MCP server authenticates requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpAuthentication {
    #[default]
    None,
    Bearer {
        #[serde(rename = "bearerToken")]
        bearer_token: String,
    },
    OAuth(McpOAuthConfig),
}

/// OAuth settings of the MCP server, endpoints are discovered unless set explicitly.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct McpOAuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Whether the UI should navigate to the authorization page instead of opening a popup.
    #[serde(default)]
    pub prefer_top_level_navigation: bool,
    #[serde(default)]
    pub activation_mode: McpOAuthActivationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
}

/// When the user is asked to authorize the tool.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum McpOAuthActivationMode {
    /// Before the tool is offered to the model.
    #[default]
    Preflight,
    /// When the model decides to use the tool.
    Lazy,
}

impl McpToolConfig {
    pub fn schema() -> ConfigSchema {
        ConfigSchema::object([
            ("url", ConfigSchema::string()),
            (
                "authentication",
                ConfigSchema::discriminated_union(
                    "type",
                    [
                        ConfigSchema::object([("type", ConfigSchema::literal("none"))]),
                        ConfigSchema::object([
                            ("type", ConfigSchema::literal("bearer")),
                            ("bearerToken", ConfigSchema::string().secret()),
                        ]),
                        ConfigSchema::object([
                            ("type", ConfigSchema::literal("oauth")),
                            ("clientId", ConfigSchema::string().optional()),
                            ("clientSecret", ConfigSchema::string().secret().optional()),
                            (
                                "preferTopLevelNavigation",
                                ConfigSchema::boolean().with_default(false),
                            ),
                            (
                                "activationMode",
                                ConfigSchema::union([
                                    ConfigSchema::literal("preflight"),
                                    ConfigSchema::literal("lazy"),
                                ])
                                .with_default("preflight"),
                            ),
                            ("authorizationUrl", ConfigSchema::string().optional()),
                            ("tokenUrl", ConfigSchema::string().optional()),
                        ]),
                    ],
                )
                .with_default(serde_json::json!({ "type": "none" })),
            ),
        ])
    }

    /// Returns OAuth settings if the server uses OAuth.
    pub fn oauth(&self) -> Option<&McpOAuthConfig> {
        match &self.authentication {
            McpAuthentication::OAuth(oauth) => Some(oauth),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{McpAuthentication, McpOAuthActivationMode, McpOAuthConfig, McpToolConfig};
    use crate::tools::config_secrets::extract_secrets_from_config;
    use insta::assert_json_snapshot;
    use serde_json::json;

    #[test]
    fn deserialization() -> anyhow::Result<()> {
        assert_eq!(
            serde_json::from_value::<McpToolConfig>(json!({ "url": "https://mcp.example.com" }))?,
            McpToolConfig {
                url: "https://mcp.example.com".to_string(),
                authentication: McpAuthentication::None
            }
        );

        assert_eq!(
            serde_json::from_value::<McpToolConfig>(json!({
                "url": "https://mcp.example.com",
                "authentication": { "type": "bearer", "bearerToken": "token" }
            }))?
            .authentication,
            McpAuthentication::Bearer {
                bearer_token: "token".to_string()
            }
        );

        let config = serde_json::from_value::<McpToolConfig>(json!({
            "url": "https://api.githubcopilot.com/mcp/",
            "authentication": {
                "type": "oauth",
                "clientSecret": "${secret.clientSecret}",
                "activationMode": "lazy",
                "tokenUrl": "https://github.com/login/oauth/access_token"
            }
        }))?;
        assert_eq!(
            config.oauth(),
            Some(&McpOAuthConfig {
                client_id: None,
                client_secret: Some("${secret.clientSecret}".to_string()),
                prefer_top_level_navigation: false,
                activation_mode: McpOAuthActivationMode::Lazy,
                authorization_url: None,
                token_url: Some("https://github.com/login/oauth/access_token".to_string()),
            })
        );

        assert!(
            serde_json::from_value::<McpToolConfig>(json!({
                "url": "https://mcp.example.com",
                "authentication": { "type": "basic" }
            }))
            .is_err()
        );

        Ok(())
    }

    #[test]
    fn serialization() {
        assert_json_snapshot!(McpToolConfig {
            url: "https://mcp.example.com".to_string(),
            authentication: McpAuthentication::OAuth(McpOAuthConfig {
                client_id: Some("client-id".to_string()),
                ..Default::default()
            })
        }, @r###"
        {
          "url": "https://mcp.example.com",
          "authentication": {
            "type": "oauth",
            "clientId": "client-id",
            "preferTopLevelNavigation": false,
            "activationMode": "preflight"
          }
        }
        "###);
    }

    #[test]
    fn extracts_oauth_client_secret() -> anyhow::Result<()> {
        let config = json!({
            "url": "https://example.com",
            "authentication": {
                "type": "oauth",
                "clientId": "client-id",
                "clientSecret": "super-secret",
                "preferTopLevelNavigation": false,
                "activationMode": "preflight"
            }
        });

        let extracted = extract_secrets_from_config(&McpToolConfig::schema(), &config);
        assert_eq!(extracted.secrets.len(), 1);
        assert_eq!(extracted.secrets[0].key, "clientSecret");
        assert_eq!(extracted.secrets[0].value, "super-secret");
        assert_eq!(
            extracted.sanitized_config["authentication"]["clientSecret"],
            "${secret.clientSecret}"
        );
        assert_eq!(extracted.sanitized_config["authentication"]["type"], "oauth");

        // Sanitized configuration is still a valid configuration.
        let sanitized = serde_json::from_value::<McpToolConfig>(extracted.sanitized_config)?;
        assert_eq!(
            sanitized.oauth().and_then(|oauth| oauth.client_secret.as_deref()),
            Some("${secret.clientSecret}")
        );

        Ok(())
    }

    #[test]
    fn ignores_configs_without_oauth() {
        let config = json!({
            "url": "https://example.com",
            "authentication": { "type": "none" }
        });

        let extracted = extract_secrets_from_config(&McpToolConfig::schema(), &config);
        assert!(extracted.secrets.is_empty());
        assert_eq!(extracted.sanitized_config, config);
    }
}
