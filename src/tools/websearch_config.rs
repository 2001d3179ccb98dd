use crate::tools::ConfigSchema;
use serde::{Deserialize, Serialize};

/// Configuration of the `websearch` tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchToolConfig {
    pub api_key: String,
    /// Custom search API endpoint, the default one is used if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl WebSearchToolConfig {
    pub fn schema() -> ConfigSchema {
        ConfigSchema::object([
            ("apiKey", ConfigSchema::string().secret()),
            ("apiUrl", ConfigSchema::string().nullable().optional()),
        ])
    }
}
