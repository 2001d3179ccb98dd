use crate::tools::{ConfigSchema, McpToolConfig, WebSearchToolConfig};
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Kind of the tool, defines the shape of its configuration.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    /// Remote Model Context Protocol server.
    Mcp,
    WebSearch,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mcp => "mcp",
            Self::WebSearch => "websearch",
        }
    }

    /// Returns the schema of the configuration of tools of this type.
    pub fn config_schema(&self) -> ConfigSchema {
        match self {
            Self::Mcp => McpToolConfig::schema(),
            Self::WebSearch => WebSearchToolConfig::schema(),
        }
    }

    /// Checks whether the configuration has the shape expected for tools of this type.
    pub fn validate_config(&self, config: &serde_json::Value) -> anyhow::Result<()> {
        match self {
            Self::Mcp => McpToolConfig::deserialize(config).map(|_| ())?,
            Self::WebSearch => WebSearchToolConfig::deserialize(config).map(|_| ())?,
        };
        Ok(())
    }
}

impl FromStr for ToolType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "mcp" => Ok(Self::Mcp),
            "websearch" => Ok(Self::WebSearch),
            _ => bail!("Unknown tool type: {value}"),
        }
    }
}

impl Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
