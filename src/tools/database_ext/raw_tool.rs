use crate::tools::Tool;
use time::OffsetDateTime;

#[derive(Debug, Eq, PartialEq, Clone, sqlx::FromRow)]
pub(super) struct RawTool {
    pub id: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub tool_type: String,
    pub provisioned: bool,
    pub configuration: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<RawTool> for Tool {
    type Error = anyhow::Error;

    fn try_from(raw: RawTool) -> Result<Self, Self::Error> {
        Ok(Tool {
            id: raw.id.parse()?,
            name: raw.name,
            tool_type: raw.tool_type.parse()?,
            provisioned: raw.provisioned,
            configuration: serde_json::from_str(&raw.configuration)?,
            created_at: OffsetDateTime::from_unix_timestamp(raw.created_at)?,
            updated_at: OffsetDateTime::from_unix_timestamp(raw.updated_at)?,
        })
    }
}

impl TryFrom<&Tool> for RawTool {
    type Error = anyhow::Error;

    fn try_from(tool: &Tool) -> Result<Self, Self::Error> {
        Ok(Self {
            id: tool.id.to_string(),
            name: tool.name.clone(),
            tool_type: tool.tool_type.to_string(),
            provisioned: tool.provisioned,
            configuration: serde_json::to_string(&tool.configuration)?,
            created_at: tool.created_at.unix_timestamp(),
            updated_at: tool.updated_at.unix_timestamp(),
        })
    }
}
