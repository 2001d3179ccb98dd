use crate::{
    api::Api,
    error::Error as ToolvaultError,
    oauth::{
        AuthorizationRequest, AuthorizationServer, AuthorizationStatus, McpOAuthTokenSet,
        OAuthClient, OAuthError, OAuthStateSigner, PendingAuthorization, PkcePair, PopupMessage,
        authorization_server::{
            AuthorizationServerMetadata, ProtectedResourceMetadata, well_known_url,
        },
        pkce::CODE_CHALLENGE_METHOD,
    },
    secrets::{UserSecretParams, UserSecretResolution, UserSecretType},
    tools::{McpOAuthActivationMode, McpOAuthConfig, McpToolConfig, Tool, ToolType},
    users::UserId,
};
use anyhow::{Context, anyhow, bail};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use url::{Url, form_urlencoded};
use uuid::Uuid;

/// Metadata suffixes of the authorization server, in the order they are tried.
const AUTHORIZATION_SERVER_METADATA_SUFFIXES: [&str; 2] =
    ["oauth-authorization-server", "openid-configuration"];

/// Authorization server page the user should be sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeUrl {
    pub url: Url,
    /// Redirect URI included into the authorization request, token request must use the same.
    pub redirect_uri: String,
}

/// Started authorization: where to send the user and what to keep until the callback.
#[derive(Debug, Clone)]
pub struct AuthorizationStart {
    pub authorize_url: AuthorizeUrl,
    pub pending: PendingAuthorization,
}

/// Result of looking up the OAuth access token of the user for an MCP tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessTokenResolution {
    Ok(String),
    /// User hasn't authorized the tool yet, or the authorization has expired.
    Missing,
    /// Stored token set cannot be decrypted or parsed, user should authorize the tool again.
    Unreadable,
}

/// OAuth settings of the MCP tool.
struct McpOAuthSettings {
    server_url: Url,
    auth: McpOAuthConfig,
}

pub struct OAuthApiExt<'a> {
    api: &'a Api,
}

impl<'a> OAuthApiExt<'a> {
    /// Creates OAuth API.
    pub fn new(api: &'a Api) -> Self {
        Self { api }
    }

    /// Starts authorization of the user for the MCP tool: generates PKCE pair and signed state,
    /// and builds the URL of the authorization server page. Returned pending authorization must
    /// be kept until the callback.
    pub async fn start_authorization(
        &self,
        user_id: UserId,
        tool_id: Uuid,
        return_url: Option<&str>,
    ) -> anyhow::Result<AuthorizationStart> {
        let tool = self.get_mcp_tool(tool_id).await?;

        let pkce = PkcePair::generate()?;
        let issued_at = OffsetDateTime::now_utc();
        let state = self.state_signer()?.issue(user_id, tool.id, issued_at)?;
        let authorize_url = self
            .build_authorize_url(&tool, &state, &pkce.code_challenge)
            .await?;

        debug!(user.id = %user_id, tool.id = %tool.id, "Started MCP OAuth authorization.");

        Ok(AuthorizationStart {
            authorize_url,
            pending: PendingAuthorization {
                user_id,
                tool_id: tool.id,
                state,
                code_verifier: pkce.code_verifier,
                issued_at,
                return_url: self.safe_return_url(return_url),
            },
        })
    }

    /// Completes authorization started with [`OAuthApiExt::start_authorization`]: verifies the
    /// state, exchanges the code for tokens and stores them in the user secrets. Returns the
    /// authorized tool.
    pub async fn complete_authorization(
        &self,
        pending: &PendingAuthorization,
        state: &str,
        code: &str,
    ) -> anyhow::Result<Tool> {
        if pending.state != state {
            bail!(OAuthError::InvalidState(
                "state doesn't match the pending authorization".to_string()
            ));
        }

        let payload = self.state_signer()?.verify(
            state,
            OffsetDateTime::now_utc(),
            self.api.config.oauth.state_ttl,
        )?;
        if payload.user_id != pending.user_id || payload.tool_id != pending.tool_id {
            bail!(OAuthError::InvalidState(
                "state is issued for another user or tool".to_string()
            ));
        }

        if pending.code_verifier.is_empty() {
            bail!(ToolvaultError::client("Missing PKCE code verifier"));
        }

        let tool = self.get_mcp_tool(pending.tool_id).await?;
        let token_set = self
            .exchange_code(&tool, code, &pending.code_verifier)
            .await?;
        self.store_token_set(pending.user_id, &tool, &token_set)
            .await?;

        info!(user.id = %pending.user_id, tool.id = %tool.id, "Completed MCP OAuth authorization.");

        Ok(tool)
    }

    /// Builds the authorization request URL for the MCP tool. Endpoints are taken from the tool
    /// configuration or discovered from the MCP server metadata.
    pub async fn build_authorize_url(
        &self,
        tool: &Tool,
        state: &str,
        code_challenge: &str,
    ) -> anyhow::Result<AuthorizeUrl> {
        let settings = self.mcp_oauth_settings(tool).await?;
        let server = self
            .resolve_authorization_server(&settings.server_url, &settings.auth)
            .await?;
        let client = self.resolve_client(tool, &settings).await?;

        let redirect_uri = self.api.config.oauth_redirect_uri();
        let mut url = server.authorization_url;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &client.client_id)
                .append_pair("redirect_uri", &redirect_uri)
                .append_pair("state", state)
                .append_pair("code_challenge", code_challenge)
                .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);
            if !server.scopes.is_empty() {
                query.append_pair("scope", &server.scopes.join(" "));
            }
            if let Some(ref resource) = server.resource {
                query.append_pair("resource", resource);
            }
        }

        Ok(AuthorizeUrl { url, redirect_uri })
    }

    /// Resolves endpoints of the authorization server that protects the MCP server. Statically
    /// configured endpoints bypass discovery.
    pub async fn resolve_authorization_server(
        &self,
        server_url: &Url,
        auth: &McpOAuthConfig,
    ) -> anyhow::Result<AuthorizationServer> {
        if let (Some(authorization_url), Some(token_url)) =
            (&auth.authorization_url, &auth.token_url)
        {
            let parse = |url: &str| {
                Url::parse(url).map_err(|err| {
                    OAuthError::Configuration(format!("Invalid OAuth endpoint ({url}): {err}"))
                })
            };
            return Ok(AuthorizationServer {
                authorization_url: parse(authorization_url)?,
                token_url: parse(token_url)?,
                resource: None,
                scopes: vec![],
            });
        }

        let resource_metadata = self
            .fetch_json::<ProtectedResourceMetadata>(&well_known_url(
                server_url,
                "oauth-protected-resource",
            ))
            .await
            .map_err(|err| {
                OAuthError::Discovery(format!(
                    "Cannot retrieve OAuth metadata of the MCP server: {err}"
                ))
            })?;

        for issuer in &resource_metadata.authorization_servers {
            let issuer_url = match Url::parse(issuer) {
                Ok(issuer_url) => issuer_url,
                Err(err) => {
                    warn!("Ignoring invalid authorization server URL ({issuer}): {err}");
                    continue;
                }
            };

            for suffix in AUTHORIZATION_SERVER_METADATA_SUFFIXES {
                let metadata_url = well_known_url(&issuer_url, suffix);
                let metadata = match self
                    .fetch_json::<AuthorizationServerMetadata>(&metadata_url)
                    .await
                {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        debug!("Cannot retrieve authorization server metadata: {err:?}");
                        continue;
                    }
                };

                let endpoints = match metadata {
                    AuthorizationServerMetadata {
                        authorization_endpoint: Some(authorization_endpoint),
                        token_endpoint: Some(token_endpoint),
                    } => Url::parse(&authorization_endpoint)
                        .ok()
                        .zip(Url::parse(&token_endpoint).ok()),
                    _ => None,
                };
                if let Some((authorization_url, token_url)) = endpoints {
                    return Ok(AuthorizationServer {
                        authorization_url,
                        token_url,
                        resource: resource_metadata.resource.clone(),
                        scopes: resource_metadata.scopes_supported.clone(),
                    });
                }

                debug!("Authorization server metadata ({metadata_url}) doesn't define endpoints.");
            }
        }

        bail!(OAuthError::Discovery(
            "Unable to resolve OAuth authorization/token endpoints".to_string()
        ))
    }

    /// Exchanges the authorization code for the token set.
    pub async fn exchange_code(
        &self,
        tool: &Tool,
        code: &str,
        code_verifier: &str,
    ) -> anyhow::Result<McpOAuthTokenSet> {
        let redirect_uri = self.api.config.oauth_redirect_uri();
        self.token_request(
            tool,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &redirect_uri),
                ("code_verifier", code_verifier),
            ],
        )
        .await
    }

    /// Requests a new token set using the refresh token.
    pub async fn refresh_token(
        &self,
        tool: &Tool,
        refresh_token: &str,
    ) -> anyhow::Result<McpOAuthTokenSet> {
        let mut token_set = self
            .token_request(
                tool,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ],
            )
            .await?;

        // Servers that don't rotate refresh tokens omit them from the refresh response.
        if token_set.refresh_token.is_none() {
            token_set.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token_set)
    }

    /// Returns the access token the user acquired for the MCP tool, refreshing it if it has
    /// expired.
    pub async fn resolve_access_token(
        &self,
        user_id: UserId,
        tool: &Tool,
    ) -> anyhow::Result<AccessTokenResolution> {
        let value = match self
            .api
            .secrets()
            .get_user_secret_value(user_id, &tool.id.to_string(), UserSecretType::McpOauth)
            .await?
        {
            UserSecretResolution::Ok(value) => value,
            UserSecretResolution::Missing => return Ok(AccessTokenResolution::Missing),
            UserSecretResolution::Unreadable => return Ok(AccessTokenResolution::Unreadable),
        };

        let token_set = match serde_json::from_str::<McpOAuthTokenSet>(&value) {
            Ok(token_set) => token_set,
            Err(err) => {
                warn!(user.id = %user_id, tool.id = %tool.id, "Cannot parse MCP OAuth token set: {err}");
                return Ok(AccessTokenResolution::Unreadable);
            }
        };

        if token_set.access_token.is_empty() {
            return Ok(AccessTokenResolution::Missing);
        }

        if !token_set.is_expired(OffsetDateTime::now_utc()) {
            return Ok(AccessTokenResolution::Ok(token_set.access_token));
        }

        let Some(refresh_token) = token_set.refresh_token else {
            return Ok(AccessTokenResolution::Missing);
        };

        let refreshed_token_set = match self.refresh_token(tool, &refresh_token).await {
            Ok(token_set) => token_set,
            Err(err) => {
                warn!(user.id = %user_id, tool.id = %tool.id, "Cannot refresh MCP OAuth token: {err:?}");
                return Ok(AccessTokenResolution::Missing);
            }
        };
        self.store_token_set(user_id, tool, &refreshed_token_set)
            .await?;

        debug!(user.id = %user_id, tool.id = %tool.id, "Refreshed MCP OAuth token.");

        Ok(AccessTokenResolution::Ok(refreshed_token_set.access_token))
    }

    /// Checks whether the user should authorize the MCP tool before it's offered to the model.
    /// Returns `None` if the tool doesn't need authorization up front or the user already has a
    /// usable access token.
    pub async fn authorization_request(
        &self,
        user_id: UserId,
        tool_id: Uuid,
    ) -> anyhow::Result<Option<AuthorizationRequest>> {
        let tool = self.get_mcp_tool(tool_id).await?;
        let auth = match serde_json::from_value::<McpToolConfig>(tool.configuration.clone()) {
            Ok(config) => match config.oauth() {
                Some(auth) if auth.activation_mode == McpOAuthActivationMode::Preflight => {
                    auth.clone()
                }
                _ => return Ok(None),
            },
            Err(err) => {
                warn!(tool.id = %tool.id, "Cannot parse MCP tool configuration: {err}");
                return Ok(None);
            }
        };

        let status = match self.resolve_access_token(user_id, &tool).await {
            Ok(AccessTokenResolution::Ok(_)) => return Ok(None),
            Ok(AccessTokenResolution::Unreadable) => AuthorizationStatus::Unreadable,
            Ok(AccessTokenResolution::Missing) => AuthorizationStatus::Missing,
            Err(err) => {
                warn!(user.id = %user_id, tool.id = %tool.id, "Cannot resolve MCP OAuth token: {err:?}");
                AuthorizationStatus::Missing
            }
        };

        Ok(Some(AuthorizationRequest {
            tool_id: tool.id,
            authorization_url: format!(
                "{}/api/mcp/oauth/start?toolId={}",
                self.api.config.public_url.as_str().trim_end_matches('/'),
                tool.id
            ),
            tool_name: tool.name,
            top_level_navigation: auth.prefer_top_level_navigation,
            status,
        }))
    }

    /// Returns the return URL only if it points to the same origin as the service itself.
    pub fn safe_return_url(&self, return_url: Option<&str>) -> Option<String> {
        let return_url = Url::parse(return_url?).ok()?;
        if return_url.origin() == self.api.config.public_url.origin() {
            Some(return_url.to_string())
        } else {
            warn!("Ignoring cross-origin OAuth return URL ({return_url}).");
            None
        }
    }

    /// Renders the page that reports the authorization result to the window that opened it.
    pub fn render_popup_page(&self, message: &PopupMessage) -> anyhow::Result<String> {
        // Message is embedded into the inline script, it must not close the script element.
        let data = serde_json::to_string(message)?.replace('<', "\\u003c");
        let target_origin =
            serde_json::to_string(&self.api.config.public_url.origin().ascii_serialization())?;

        Ok(self.api.templates.render(
            "mcp_oauth_popup",
            &json!({ "data": data, "target_origin": target_origin }),
        )?)
    }

    async fn get_mcp_tool(&self, tool_id: Uuid) -> anyhow::Result<Tool> {
        match self.api.tools().get_tool(tool_id).await? {
            Some(tool) if tool.tool_type == ToolType::Mcp => Ok(tool),
            _ => Err(ToolvaultError::not_found("Tool not found").into()),
        }
    }

    async fn mcp_oauth_settings(&self, tool: &Tool) -> anyhow::Result<McpOAuthSettings> {
        let config = serde_json::from_value::<McpToolConfig>(tool.configuration.clone())
            .map_err(|err| {
                ToolvaultError::client_with_root_cause(
                    anyhow!(err).context("Invalid tool configuration"),
                )
            })?;
        let Some(auth) = config.oauth() else {
            bail!(ToolvaultError::client(
                "Tool does not use OAuth authentication"
            ));
        };

        let server_url = self
            .api
            .tools()
            .expand_tool_parameter(tool.context(), &config.url)
            .await?;
        let server_url = Url::parse(&server_url).map_err(|err| {
            ToolvaultError::client_with_root_cause(
                anyhow!(err).context("Invalid tool configuration"),
            )
        })?;

        Ok(McpOAuthSettings {
            server_url,
            auth: auth.clone(),
        })
    }

    async fn resolve_client(
        &self,
        tool: &Tool,
        settings: &McpOAuthSettings,
    ) -> anyhow::Result<OAuthClient> {
        let tools = self.api.tools();
        let tool_client = match settings.auth.client_id {
            Some(ref client_id) => Some(OAuthClient {
                client_id: tools
                    .expand_tool_parameter(tool.context(), client_id)
                    .await?,
                client_secret: match settings.auth.client_secret {
                    Some(ref client_secret) => Some(
                        tools
                            .expand_tool_parameter(tool.context(), client_secret)
                            .await?,
                    ),
                    None => None,
                },
            }),
            None => None,
        };

        Ok(OAuthClient::resolve(
            tool_client,
            &settings.server_url,
            &self.api.config.oauth,
        )?)
    }

    async fn token_request(
        &self,
        tool: &Tool,
        params: &[(&str, &str)],
    ) -> anyhow::Result<McpOAuthTokenSet> {
        let settings = self.mcp_oauth_settings(tool).await?;
        let server = self
            .resolve_authorization_server(&settings.server_url, &settings.auth)
            .await?;
        let client = self.resolve_client(tool, &settings).await?;

        let mut form = form_urlencoded::Serializer::new(String::new());
        form.extend_pairs(params);
        if let Some(ref client_secret) = client.client_secret {
            form.append_pair("client_secret", client_secret);
        }
        form.append_pair("client_id", &client.client_id);
        if let Some(ref resource) = server.resource {
            form.append_pair("resource", resource);
        }

        let response = self
            .api
            .network
            .token_client
            .post(server.token_url.as_str())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(form.finish())
            .send()
            .await
            .map_err(|err| {
                OAuthError::ExchangeFailed(format!("OAuth token request failed: {err}"))
            })?;

        let status = response.status();
        let body = response
            .json::<JsonValue>()
            .await
            .unwrap_or_else(|_| json!({}));
        if !status.is_success() {
            let message = ["error_description", "error"]
                .iter()
                .find_map(|name| body.get(name).and_then(JsonValue::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| format!("OAuth token request failed ({})", status.as_u16()));
            bail!(OAuthError::ExchangeFailed(message));
        }

        let token_set = McpOAuthTokenSet::from_token_response(&body, OffsetDateTime::now_utc());
        if token_set.access_token.is_empty() {
            bail!(OAuthError::ExchangeFailed(
                "OAuth token response missing access_token".to_string()
            ));
        }

        Ok(token_set)
    }

    async fn store_token_set(
        &self,
        user_id: UserId,
        tool: &Tool,
        token_set: &McpOAuthTokenSet,
    ) -> anyhow::Result<()> {
        self.api
            .secrets()
            .upsert_user_secret(
                user_id,
                UserSecretParams {
                    context: &tool.id.to_string(),
                    secret_type: UserSecretType::McpOauth,
                    label: &format!("MCP OAuth ({})", tool.name),
                    value: &serde_json::to_string(token_set)?,
                },
            )
            .await
            .with_context(|| format!("Cannot store MCP OAuth token set for tool ({}).", tool.id))?;

        Ok(())
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> anyhow::Result<T> {
        let response = self
            .api
            .network
            .http_client
            .get(url.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("Cannot fetch {url}."))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Failed fetching {url} ({})", status.as_u16());
        }

        response
            .json()
            .await
            .with_context(|| format!("Cannot deserialize {url}."))
    }

    fn state_signer(&self) -> Result<OAuthStateSigner, OAuthError> {
        OAuthStateSigner::new(self.api.config.security.secrets_passphrase.as_deref())
    }
}

impl Api {
    /// Returns an API to work with the MCP OAuth authorization flow.
    pub fn oauth(&self) -> OAuthApiExt<'_> {
        OAuthApiExt::new(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        api::Api,
        error::{Error as ToolvaultError, ErrorKind},
        oauth::{
            AccessTokenResolution, AuthorizationStatus, McpOAuthTokenSet, OAuthError,
            PendingAuthorization, PopupMessage, pkce::code_challenge,
        },
        secrets::{UserSecretParams, UserSecretStatus, UserSecretType},
        tests::{mock_api, mock_user},
        tools::{Tool, ToolCreateParams, ToolType},
        users::User,
    };
    use httpmock::MockServer;
    use serde_json::{Value as JsonValue, json};
    use std::{collections::HashMap, time::Duration};
    use time::OffsetDateTime;
    use uuid::uuid;

    async fn create_mcp_tool(api: &Api, authentication: JsonValue, url: String) -> anyhow::Result<Tool> {
        api.tools()
            .create_tool(ToolCreateParams {
                name: "GitHub".to_string(),
                tool_type: ToolType::Mcp,
                configuration: json!({ "url": url, "authentication": authentication }),
                provisioned: false,
            })
            .await
    }

    async fn create_oauth_tool(api: &Api, server: &MockServer) -> anyhow::Result<Tool> {
        create_mcp_tool(
            api,
            json!({ "type": "oauth", "clientId": "tool-client", "clientSecret": "tool-secret" }),
            server.url("/mcp"),
        )
        .await
    }

    fn mock_discovery(server: &MockServer) {
        server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/.well-known/oauth-protected-resource/mcp");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "resource": server.url("/mcp"),
                    "authorization_servers": [server.url("/auth")],
                    "scopes_supported": ["repo", "read:org"]
                }));
        });
        server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/.well-known/oauth-authorization-server/auth");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/.well-known/openid-configuration/auth");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "issuer": server.url("/auth"),
                    "authorization_endpoint": server.url("/auth/authorize"),
                    "token_endpoint": server.url("/auth/token")
                }));
        });
    }

    async fn mock_user_in_db(api: &Api) -> anyhow::Result<User> {
        let user = mock_user()?;
        api.db.upsert_user(&user).await?;
        Ok(user)
    }

    async fn store_token_set(
        api: &Api,
        user: &User,
        tool: &Tool,
        value: &str,
    ) -> anyhow::Result<()> {
        api.secrets()
            .upsert_user_secret(
                user.id,
                UserSecretParams {
                    context: &tool.id.to_string(),
                    secret_type: UserSecretType::McpOauth,
                    label: "MCP OAuth (GitHub)",
                    value,
                },
            )
            .await?;
        Ok(())
    }

    fn query_pairs(url: &url::Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[tokio::test]
    async fn builds_authorize_url_with_discovered_endpoints() -> anyhow::Result<()> {
        let server = MockServer::start();
        mock_discovery(&server);

        let api = mock_api().await?;
        let tool = create_oauth_tool(&api, &server).await?;

        let authorize_url = api
            .oauth()
            .build_authorize_url(&tool, "state-1", "challenge-1")
            .await?;
        assert_eq!(
            authorize_url.redirect_uri,
            "https://toolvault.dev/api/mcp/oauth/callback"
        );
        assert_eq!(
            authorize_url.url.as_str().split('?').next(),
            Some(server.url("/auth/authorize").as_str())
        );
        assert_eq!(
            query_pairs(&authorize_url.url),
            HashMap::from_iter(
                [
                    ("response_type", "code".to_string()),
                    ("client_id", "tool-client".to_string()),
                    (
                        "redirect_uri",
                        "https://toolvault.dev/api/mcp/oauth/callback".to_string()
                    ),
                    ("state", "state-1".to_string()),
                    ("code_challenge", "challenge-1".to_string()),
                    ("code_challenge_method", "S256".to_string()),
                    ("scope", "repo read:org".to_string()),
                    ("resource", server.url("/mcp")),
                ]
                .map(|(name, value)| (name.to_string(), value))
            )
        );

        Ok(())
    }

    #[tokio::test]
    async fn static_endpoints_bypass_discovery() -> anyhow::Result<()> {
        let server = MockServer::start();
        let discovery_mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path_includes("/.well-known/");
            then.status(500);
        });

        let api = mock_api().await?;
        let tool = create_mcp_tool(
            &api,
            json!({
                "type": "oauth",
                "clientId": "tool-client",
                "authorizationUrl": "https://github.com/login/oauth/authorize?prompt=consent",
                "tokenUrl": "https://github.com/login/oauth/access_token"
            }),
            server.url("/mcp"),
        )
        .await?;

        let authorize_url = api
            .oauth()
            .build_authorize_url(&tool, "state-1", "challenge-1")
            .await?;
        assert!(
            authorize_url
                .url
                .as_str()
                .starts_with("https://github.com/login/oauth/authorize?prompt=consent&response_type=code&")
        );
        let query = query_pairs(&authorize_url.url);
        assert_eq!(query.get("client_id").map(String::as_str), Some("tool-client"));
        assert!(!query.contains_key("scope"));
        assert!(!query.contains_key("resource"));
        discovery_mock.assert_hits(0);

        Ok(())
    }

    #[tokio::test]
    async fn fails_when_endpoints_cannot_be_discovered() -> anyhow::Result<()> {
        let server = MockServer::start();
        let api = mock_api().await?;
        let tool = create_oauth_tool(&api, &server).await?;

        // MCP server doesn't publish metadata.
        let err = api
            .oauth()
            .build_authorize_url(&tool, "state-1", "challenge-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OAuthError>(),
            Some(OAuthError::Discovery(_))
        ));

        // Authorization servers don't define endpoints.
        server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/.well-known/oauth-protected-resource/mcp");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({ "authorization_servers": ["not a url", server.url("/auth")] }));
        });
        server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/.well-known/oauth-authorization-server/auth");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({ "authorization_endpoint": server.url("/auth/authorize") }));
        });

        let err = api
            .oauth()
            .build_authorize_url(&tool, "state-1", "challenge-1")
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<OAuthError>(),
            Some(&OAuthError::Discovery(
                "Unable to resolve OAuth authorization/token endpoints".to_string()
            ))
        );

        Ok(())
    }

    #[tokio::test]
    async fn can_start_authorization() -> anyhow::Result<()> {
        let server = MockServer::start();
        mock_discovery(&server);

        let api = mock_api().await?;
        let user = mock_user()?;
        let tool = create_oauth_tool(&api, &server).await?;

        let start = api
            .oauth()
            .start_authorization(user.id, tool.id, Some("https://toolvault.dev/chat?id=1"))
            .await?;
        let pending = start.pending;
        assert_eq!(pending.user_id, user.id);
        assert_eq!(pending.tool_id, tool.id);
        assert_eq!(pending.code_verifier.len(), 43);
        assert_eq!(
            pending.return_url.as_deref(),
            Some("https://toolvault.dev/chat?id=1")
        );

        let query = query_pairs(&start.authorize_url.url);
        assert_eq!(query.get("state"), Some(&pending.state));
        assert_eq!(
            query.get("code_challenge"),
            Some(&code_challenge(&pending.code_verifier))
        );

        // Cross-origin return URLs are dropped.
        let start = api
            .oauth()
            .start_authorization(user.id, tool.id, Some("https://evil.dev/chat"))
            .await?;
        assert_eq!(start.pending.return_url, None);
        assert_ne!(start.pending.state, pending.state);
        assert_ne!(start.pending.code_verifier, pending.code_verifier);

        Ok(())
    }

    #[tokio::test]
    async fn start_authorization_validates_tool() -> anyhow::Result<()> {
        let api = mock_api().await?;
        let user = mock_user()?;

        let err = api
            .oauth()
            .start_authorization(user.id, uuid!("00000000-0000-0000-0000-000000000099"), None)
            .await
            .unwrap_err()
            .downcast::<ToolvaultError>()?;
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let websearch_tool = api
            .tools()
            .create_tool(ToolCreateParams {
                name: "Search".to_string(),
                tool_type: ToolType::WebSearch,
                configuration: json!({ "apiKey": "key" }),
                provisioned: false,
            })
            .await?;
        let err = api
            .oauth()
            .start_authorization(user.id, websearch_tool.id, None)
            .await
            .unwrap_err()
            .downcast::<ToolvaultError>()?;
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let bearer_tool = create_mcp_tool(
            &api,
            json!({ "type": "bearer", "bearerToken": "token" }),
            "https://mcp.toolvault.dev/mcp".to_string(),
        )
        .await?;
        let err = api
            .oauth()
            .start_authorization(user.id, bearer_tool.id, None)
            .await
            .unwrap_err()
            .downcast::<ToolvaultError>()?;
        assert_eq!(err.kind(), ErrorKind::ClientError);
        assert_eq!(err.public_message(), "Tool does not use OAuth authentication");

        Ok(())
    }

    #[tokio::test]
    async fn can_complete_authorization() -> anyhow::Result<()> {
        let server = MockServer::start();
        mock_discovery(&server);

        let api = mock_api().await?;
        let user = mock_user_in_db(&api).await?;
        let tool = create_oauth_tool(&api, &server).await?;

        let start = api
            .oauth()
            .start_authorization(user.id, tool.id, None)
            .await?;
        let token_mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/auth/token")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body_includes("grant_type=authorization_code")
                .body_includes("code=code-1")
                .body_includes(format!("code_verifier={}", start.pending.code_verifier))
                .body_includes("redirect_uri=https%3A%2F%2Ftoolvault.dev%2Fapi%2Fmcp%2Foauth%2Fcallback")
                .body_includes("client_id=tool-client")
                .body_includes("client_secret=tool-secret");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "access_token": "access-1",
                    "token_type": "bearer",
                    "refresh_token": "refresh-1",
                    "expires_in": 3600
                }));
        });

        let authorized_tool = api
            .oauth()
            .complete_authorization(&start.pending, &start.pending.state, "code-1")
            .await?;
        assert_eq!(authorized_tool.id, tool.id);
        token_mock.assert();

        assert_eq!(
            api.secrets()
                .list_user_secret_statuses(user.id, Some(UserSecretType::McpOauth))
                .await?
                .into_iter()
                .map(|status| (status.context, status.label, status.readable))
                .collect::<Vec<_>>(),
            vec![(tool.id.to_string(), "MCP OAuth (GitHub)".to_string(), true)]
        );
        assert_eq!(
            api.oauth().resolve_access_token(user.id, &tool).await?,
            AccessTokenResolution::Ok("access-1".to_string())
        );

        Ok(())
    }

    #[tokio::test]
    async fn complete_authorization_rejects_invalid_state() -> anyhow::Result<()> {
        let server = MockServer::start();
        mock_discovery(&server);
        let token_mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/auth/token");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({ "access_token": "access-1" }));
        });

        let api = mock_api().await?;
        let user = mock_user_in_db(&api).await?;
        let tool = create_oauth_tool(&api, &server).await?;
        let pending = api
            .oauth()
            .start_authorization(user.id, tool.id, None)
            .await?
            .pending;

        let other_pending = api
            .oauth()
            .start_authorization(user.id, tool.id, None)
            .await?
            .pending;
        let forged_pending = PendingAuthorization {
            state: "forged.state".to_string(),
            ..pending.clone()
        };
        let another_user_pending = PendingAuthorization {
            user_id: uuid!("00000000-0000-0000-0000-000000000002").into(),
            ..pending.clone()
        };
        for (pending, state) in [
            (&pending, other_pending.state.as_str()),
            (&forged_pending, "forged.state"),
            (&another_user_pending, pending.state.as_str()),
        ] {
            let err = api
                .oauth()
                .complete_authorization(pending, state, "code-1")
                .await
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<OAuthError>(),
                Some(OAuthError::InvalidState(_))
            ));
        }
        token_mock.assert_hits(0);

        Ok(())
    }

    #[tokio::test]
    async fn reports_token_exchange_failures() -> anyhow::Result<()> {
        for (status, body, expected_message) in [
            (
                400,
                json!({ "error": "invalid_grant", "error_description": "Bad verification code." }),
                "Bad verification code.",
            ),
            (400, json!({ "error": "invalid_grant" }), "invalid_grant"),
            (502, json!("Bad Gateway"), "OAuth token request failed (502)"),
            (
                200,
                json!({ "token_type": "bearer" }),
                "OAuth token response missing access_token",
            ),
        ] {
            let server = MockServer::start();
            mock_discovery(&server);
            server.mock(|when, then| {
                when.method(httpmock::Method::POST).path("/auth/token");
                then.status(status)
                    .header("Content-Type", "application/json")
                    .json_body(body.clone());
            });

            let api = mock_api().await?;
            let tool = create_oauth_tool(&api, &server).await?;
            let err = api
                .oauth()
                .exchange_code(&tool, "code-1", "verifier")
                .await
                .unwrap_err();
            assert_eq!(
                err.downcast_ref::<OAuthError>(),
                Some(&OAuthError::ExchangeFailed(expected_message.to_string()))
            );
        }

        Ok(())
    }

    #[tokio::test]
    async fn resolves_access_token() -> anyhow::Result<()> {
        let api = mock_api().await?;
        let user = mock_user_in_db(&api).await?;
        let tool = create_mcp_tool(
            &api,
            json!({ "type": "oauth", "clientId": "tool-client" }),
            "https://mcp.toolvault.dev/mcp".to_string(),
        )
        .await?;

        assert_eq!(
            api.oauth().resolve_access_token(user.id, &tool).await?,
            AccessTokenResolution::Missing
        );

        store_token_set(&api, &user, &tool, "not a json").await?;
        assert_eq!(
            api.oauth().resolve_access_token(user.id, &tool).await?,
            AccessTokenResolution::Unreadable
        );

        store_token_set(&api, &user, &tool, r#"{"token_type":"bearer"}"#).await?;
        assert_eq!(
            api.oauth().resolve_access_token(user.id, &tool).await?,
            AccessTokenResolution::Missing
        );

        store_token_set(&api, &user, &tool, r#"{"access_token":"access-1"}"#).await?;
        assert_eq!(
            api.oauth().resolve_access_token(user.id, &tool).await?,
            AccessTokenResolution::Ok("access-1".to_string())
        );

        // Expired token without refresh token.
        let expired_token_set = McpOAuthTokenSet::from_token_response(
            &json!({ "access_token": "access-1", "expires_in": 30 }),
            OffsetDateTime::now_utc(),
        );
        store_token_set(&api, &user, &tool, &serde_json::to_string(&expired_token_set)?).await?;
        assert_eq!(
            api.oauth().resolve_access_token(user.id, &tool).await?,
            AccessTokenResolution::Missing
        );

        Ok(())
    }

    #[tokio::test]
    async fn refreshes_expired_access_token() -> anyhow::Result<()> {
        let server = MockServer::start();
        mock_discovery(&server);
        let refresh_mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/auth/token")
                .body_includes("grant_type=refresh_token")
                .body_includes("refresh_token=refresh-1")
                .body_includes("client_id=tool-client");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({ "access_token": "access-2", "expires_in": 3600 }));
        });

        let api = mock_api().await?;
        let user = mock_user_in_db(&api).await?;
        let tool = create_oauth_tool(&api, &server).await?;

        let expired_token_set = McpOAuthTokenSet::from_token_response(
            &json!({ "access_token": "access-1", "refresh_token": "refresh-1", "expires_in": 10 }),
            OffsetDateTime::now_utc() - Duration::from_secs(600),
        );
        store_token_set(&api, &user, &tool, &serde_json::to_string(&expired_token_set)?).await?;

        assert_eq!(
            api.oauth().resolve_access_token(user.id, &tool).await?,
            AccessTokenResolution::Ok("access-2".to_string())
        );
        refresh_mock.assert();

        // Refreshed token set is stored and keeps the refresh token.
        let statuses = api
            .secrets()
            .list_user_secret_statuses(user.id, Some(UserSecretType::McpOauth))
            .await?;
        assert_eq!(
            statuses
                .iter()
                .map(|status: &UserSecretStatus| status.label.as_str())
                .collect::<Vec<_>>(),
            vec!["MCP OAuth (GitHub)"]
        );
        let crate::secrets::UserSecretResolution::Ok(value) = api
            .secrets()
            .get_user_secret_value(user.id, &tool.id.to_string(), UserSecretType::McpOauth)
            .await?
        else {
            panic!("Token set should be readable.");
        };
        let token_set = serde_json::from_str::<McpOAuthTokenSet>(&value)?;
        assert_eq!(token_set.access_token, "access-2");
        assert_eq!(token_set.refresh_token.as_deref(), Some("refresh-1"));
        assert!(!token_set.is_expired(OffsetDateTime::now_utc()));

        // Fresh token is used without refresh.
        assert_eq!(
            api.oauth().resolve_access_token(user.id, &tool).await?,
            AccessTokenResolution::Ok("access-2".to_string())
        );
        refresh_mock.assert_hits(1);

        Ok(())
    }

    #[tokio::test]
    async fn failed_refresh_results_in_missing_token() -> anyhow::Result<()> {
        let server = MockServer::start();
        mock_discovery(&server);
        server.mock(|when, then| {
            when.method(httpmock::Method::POST).path("/auth/token");
            then.status(400)
                .header("Content-Type", "application/json")
                .json_body(json!({ "error": "invalid_grant" }));
        });

        let api = mock_api().await?;
        let user = mock_user_in_db(&api).await?;
        let tool = create_oauth_tool(&api, &server).await?;

        let expired_token_set = McpOAuthTokenSet::from_token_response(
            &json!({ "access_token": "access-1", "refresh_token": "refresh-1", "expires_in": 10 }),
            OffsetDateTime::now_utc() - Duration::from_secs(600),
        );
        store_token_set(&api, &user, &tool, &serde_json::to_string(&expired_token_set)?).await?;

        assert_eq!(
            api.oauth().resolve_access_token(user.id, &tool).await?,
            AccessTokenResolution::Missing
        );

        Ok(())
    }

    #[tokio::test]
    async fn reports_authorization_requests() -> anyhow::Result<()> {
        let api = mock_api().await?;
        let user = mock_user_in_db(&api).await?;
        let tool = create_mcp_tool(
            &api,
            json!({ "type": "oauth", "clientId": "tool-client", "preferTopLevelNavigation": true }),
            "https://mcp.toolvault.dev/mcp".to_string(),
        )
        .await?;

        let request = api
            .oauth()
            .authorization_request(user.id, tool.id)
            .await?
            .expect("Authorization should be requested");
        assert_eq!(request.tool_id, tool.id);
        assert_eq!(request.tool_name, "GitHub");
        assert_eq!(
            request.authorization_url,
            format!("https://toolvault.dev/api/mcp/oauth/start?toolId={}", tool.id)
        );
        assert!(request.top_level_navigation);
        assert_eq!(request.status, AuthorizationStatus::Missing);

        store_token_set(&api, &user, &tool, "not a json").await?;
        let request = api.oauth().authorization_request(user.id, tool.id).await?;
        assert_eq!(
            request.map(|request| request.status),
            Some(AuthorizationStatus::Unreadable)
        );

        store_token_set(&api, &user, &tool, r#"{"access_token":"access-1"}"#).await?;
        assert!(
            api.oauth()
                .authorization_request(user.id, tool.id)
                .await?
                .is_none()
        );

        // Lazily activated tools and tools without OAuth are never authorized up front.
        for authentication in [
            json!({ "type": "oauth", "clientId": "tool-client", "activationMode": "lazy" }),
            json!({ "type": "bearer", "bearerToken": "token" }),
        ] {
            let tool = create_mcp_tool(
                &api,
                authentication,
                "https://mcp.toolvault.dev/mcp".to_string(),
            )
            .await?;
            assert!(
                api.oauth()
                    .authorization_request(user.id, tool.id)
                    .await?
                    .is_none()
            );
        }

        Ok(())
    }

    #[tokio::test]
    async fn filters_return_urls() -> anyhow::Result<()> {
        let api = mock_api().await?;
        let oauth = api.oauth();
        for (return_url, expected) in [
            (None, None),
            (Some("not a url"), None),
            (Some("/relative"), None),
            (Some("http://toolvault.dev/chat"), None),
            (Some("https://toolvault.dev.evil.dev/chat"), None),
            (Some("https://toolvault.dev:8443/chat"), None),
            (Some("https://toolvault.dev"), Some("https://toolvault.dev/")),
            (
                Some("https://toolvault.dev/chat?id=1#bottom"),
                Some("https://toolvault.dev/chat?id=1#bottom"),
            ),
        ] {
            assert_eq!(
                oauth.safe_return_url(return_url).as_deref(),
                expected,
                "{return_url:?}"
            );
        }

        Ok(())
    }

    #[tokio::test]
    async fn renders_popup_page() -> anyhow::Result<()> {
        let api = mock_api().await?;

        let page = api.oauth().render_popup_page(&PopupMessage::Complete {
            tool_id: uuid!("00000000-0000-0000-0000-000000000020"),
            tool_name: "GitHub".to_string(),
            return_url: Some("https://toolvault.dev/chat".to_string()),
        })?;
        assert!(page.contains(
            r#"var data = {"type":"mcp-oauth-complete","toolId":"00000000-0000-0000-0000-000000000020","toolName":"GitHub","returnUrl":"https://toolvault.dev/chat"};"#
        ));
        assert!(page.contains(r#"window.opener.postMessage(data, "https://toolvault.dev");"#));

        let page = api
            .oauth()
            .render_popup_page(&PopupMessage::error("</script><script>alert(1)</script>"))?;
        assert!(!page.contains("</script><script>alert(1)"));
        assert!(page.contains(
            r#"var data = {"type":"mcp-oauth-error","error":"\u003c/script>\u003cscript>alert(1)\u003c/script>"};"#
        ));

        Ok(())
    }
}
