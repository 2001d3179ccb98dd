use crate::{
    api::Api,
    error::Error as ToolvaultError,
    secrets::ToolSecretResolution,
    tools::{
        Tool, ToolContext, ToolType,
        config_secrets::{
            ExtractedSecret, extract_secrets_from_config, parse_secret_reference,
            unmask_secrets_in_config,
        },
        parameter_expansion::{expand_env, process_env},
    },
};
use anyhow::bail;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use uuid::Uuid;

/// Maximum length of the tool name.
const MAX_TOOL_NAME_LENGTH: usize = 100;

/// Parameters required to create a tool.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCreateParams {
    pub name: String,
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub configuration: JsonValue,
    #[serde(default)]
    pub provisioned: bool,
}

/// Parameters required to update a tool.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolUpdateParams {
    pub name: Option<String>,
    pub configuration: JsonValue,
}

pub struct ToolsApiExt<'a> {
    api: &'a Api,
}

impl<'a> ToolsApiExt<'a> {
    /// Creates Tools API.
    pub fn new(api: &'a Api) -> Self {
        Self { api }
    }

    /// Retrieves tool with the specified ID.
    pub async fn get_tool(&self, id: Uuid) -> anyhow::Result<Option<Tool>> {
        self.api.db.get_tool(id).await
    }

    /// Creates a new tool. Secret values are moved from the configuration to the tool secrets
    /// store, only the sanitized configuration is persisted.
    pub async fn create_tool(&self, params: ToolCreateParams) -> anyhow::Result<Tool> {
        Self::validate_name(&params.name)?;

        let (configuration, secrets) =
            Self::sanitize_configuration(params.tool_type, params.provisioned, &params.configuration)?;
        let now = Self::now()?;
        let tool = Tool {
            id: Uuid::now_v7(),
            name: params.name,
            tool_type: params.tool_type,
            provisioned: params.provisioned,
            configuration,
            created_at: now,
            updated_at: now,
        };

        self.api.db.insert_tool(&tool, &secrets).await?;

        Ok(tool)
    }

    /// Updates name and configuration of the tool. Masked secrets in the configuration keep
    /// their stored values, new secret values replace them.
    pub async fn update_tool(&self, id: Uuid, params: ToolUpdateParams) -> anyhow::Result<Tool> {
        let Some(existing_tool) = self.api.db.get_tool(id).await? else {
            bail!(ToolvaultError::not_found(format!(
                "Tool ('{id}') is not found."
            )));
        };

        if existing_tool.provisioned {
            bail!(ToolvaultError::client(format!(
                "Tool ('{}') is provisioned and cannot be updated.",
                existing_tool.name
            )));
        }

        if let Some(ref name) = params.name {
            Self::validate_name(name)?;
        }

        let configuration = unmask_secrets_in_config(
            &existing_tool.tool_type.config_schema(),
            &params.configuration,
        );
        let (configuration, secrets) =
            Self::sanitize_configuration(existing_tool.tool_type, false, &configuration)?;
        let tool = Tool {
            name: params.name.unwrap_or(existing_tool.name),
            configuration,
            updated_at: Self::now()?,
            ..existing_tool
        };

        if !self.api.db.update_tool(&tool, &secrets).await? {
            bail!(ToolvaultError::not_found(format!(
                "Tool ('{id}') is not found."
            )));
        }

        Ok(tool)
    }

    /// Removes tool with the specified ID together with its secrets.
    pub async fn remove_tool(&self, id: Uuid) -> anyhow::Result<Option<Tool>> {
        self.api.db.remove_tool(id).await
    }

    /// Resolves the value of the tool parameter right before it's used. Provisioned tools expand
    /// environment variable references, other tools resolve references to their own secrets.
    /// Values that cannot be resolved are returned unchanged.
    pub async fn expand_tool_parameter(
        &self,
        tool: ToolContext,
        value: &str,
    ) -> anyhow::Result<String> {
        if value.is_empty() {
            return Ok(value.to_string());
        }

        if tool.provisioned {
            Ok(expand_env(value, process_env))
        } else {
            self.resolve_tool_secret_reference(tool.id, value).await
        }
    }

    /// Resolves `${secret.<key>}` reference using the secrets store of the specified tool.
    pub async fn resolve_tool_secret_reference(
        &self,
        tool_id: Uuid,
        value: &str,
    ) -> anyhow::Result<String> {
        let Some(key) = parse_secret_reference(value) else {
            return Ok(value.to_string());
        };

        Ok(
            match self.api.secrets().get_tool_secret_value(tool_id, key).await? {
                ToolSecretResolution::Ok(secret) => secret,
                ToolSecretResolution::Missing => value.to_string(),
            },
        )
    }

    /// Current time truncated to the second precision the timestamps are stored with.
    fn now() -> anyhow::Result<OffsetDateTime> {
        Ok(OffsetDateTime::from_unix_timestamp(
            OffsetDateTime::now_utc().unix_timestamp(),
        )?)
    }

    fn sanitize_configuration(
        tool_type: ToolType,
        provisioned: bool,
        configuration: &JsonValue,
    ) -> anyhow::Result<(JsonValue, Vec<ExtractedSecret>)> {
        if let Err(err) = tool_type.validate_config(configuration) {
            bail!(ToolvaultError::client_with_root_cause(
                err.context(format!("Invalid {tool_type} tool configuration."))
            ));
        }

        // Provisioned tools reference environment variables instead of stored secrets.
        if provisioned {
            return Ok((configuration.clone(), vec![]));
        }

        let extracted = extract_secrets_from_config(&tool_type.config_schema(), configuration);
        Ok((extracted.sanitized_config, extracted.secrets))
    }

    fn validate_name(name: &str) -> anyhow::Result<()> {
        if name.trim().is_empty() {
            bail!(ToolvaultError::client("Tool name cannot be empty."));
        }

        if name.len() > MAX_TOOL_NAME_LENGTH {
            bail!(ToolvaultError::client(format!(
                "Tool name cannot be longer than {MAX_TOOL_NAME_LENGTH} characters."
            )));
        }

        Ok(())
    }
}

impl Api {
    /// Returns an API to work with tools.
    pub fn tools(&self) -> ToolsApiExt<'_> {
        ToolsApiExt::new(self)
    }
}
