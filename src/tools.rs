mod api_ext;
pub mod config_schema;
pub mod config_secrets;
mod database_ext;
mod mcp_config;
pub mod parameter_expansion;
mod tool;
mod tool_type;
mod websearch_config;

pub use self::{
    api_ext::{ToolCreateParams, ToolUpdateParams, ToolsApiExt},
    config_schema::ConfigSchema,
    mcp_config::{McpAuthentication, McpOAuthActivationMode, McpOAuthConfig, McpToolConfig},
    tool::{Tool, ToolContext},
    tool_type::ToolType,
    websearch_config::WebSearchToolConfig,
};
