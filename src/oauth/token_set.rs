use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Tokens are refreshed slightly before they actually expire.
const EXPIRATION_MARGIN: Duration = Duration::from_secs(60);

/// OAuth token set acquired for an MCP tool, stored as JSON in the user secrets.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct McpOAuthTokenSet {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<OffsetDateTime>,
}

impl McpOAuthTokenSet {
    /// Normalizes a raw token endpoint response. Servers don't agree on value types, so numbers
    /// and strings are accepted interchangeably, and `expires_at` is derived from `expires_in`
    /// when it's missing.
    pub fn from_token_response(raw: &JsonValue, now: OffsetDateTime) -> Self {
        let string = |name: &str| match raw.get(name) {
            Some(JsonValue::String(value)) if !value.is_empty() => Some(value.clone()),
            Some(JsonValue::Number(value)) => Some(value.to_string()),
            _ => None,
        };

        let expires_in = match raw.get("expires_in") {
            Some(JsonValue::Number(value)) => value.as_i64().or_else(|| {
                value
                    .as_f64()
                    .filter(|value| value.is_finite() && value.abs() < i64::MAX as f64)
                    .map(|value| value as i64)
            }),
            Some(JsonValue::String(value)) => value.trim().parse::<i64>().ok(),
            _ => None,
        };
        // Lifetimes beyond the representable date range are treated as no expiration.
        let expires_at = string("expires_at")
            .and_then(|value| OffsetDateTime::parse(&value, &Rfc3339).ok())
            .or_else(|| {
                expires_in.and_then(|expires_in| {
                    now.checked_add(time::Duration::seconds(expires_in))
                })
            });

        Self {
            access_token: string("access_token").unwrap_or_default(),
            token_type: string("token_type"),
            refresh_token: string("refresh_token"),
            scope: string("scope"),
            expires_in,
            expires_at,
        }
    }

    /// Token without an expiration time never expires.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + EXPIRATION_MARGIN >= expires_at)
    }
}
