use crate::tools::{ToolType, config_secrets::mask_secrets_in_config};
use serde::Serialize;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use uuid::Uuid;

/// Tool registered in the platform. Configuration never holds plaintext secrets, they are kept
/// in the tool secrets store and referenced as `${secret.<key>}`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    /// Provisioned tools are managed by the deployment and can reference environment variables.
    pub provisioned: bool,
    pub configuration: JsonValue,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}

/// Subset of the tool properties needed to expand tool parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub id: Uuid,
    pub provisioned: bool,
}

impl Tool {
    pub fn context(&self) -> ToolContext {
        ToolContext {
            id: self.id,
            provisioned: self.provisioned,
        }
    }

    /// Returns a copy of the tool safe to display: secret values in the configuration are masked.
    pub fn masked(&self) -> Tool {
        Tool {
            configuration: mask_secrets_in_config(
                &self.tool_type.config_schema(),
                &self.configuration,
            ),
            ..self.clone()
        }
    }
}
