use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Describes what a user secret holds.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum UserSecretType {
    /// User-provided API key for a model backend, `context` is the backend ID.
    BackendCredentials,
    /// OAuth token set acquired for an MCP tool, `context` is the tool ID. Reserved for the
    /// OAuth flow and never created directly by users.
    McpOauth,
}

impl UserSecretType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackendCredentials => "backend-credentials",
            Self::McpOauth => "mcp-oauth",
        }
    }

    /// Indicates whether secrets of this type can only be written by the system.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::McpOauth)
    }
}

impl FromStr for UserSecretType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "backend-credentials" => Ok(Self::BackendCredentials),
            "mcp-oauth" => Ok(Self::McpOauth),
            _ => bail!("Unknown user secret type: {value}"),
        }
    }
}

impl Display for UserSecretType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
