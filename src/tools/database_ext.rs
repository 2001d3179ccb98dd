mod raw_tool;

use self::raw_tool::RawTool;
use crate::{
    database::Database,
    secrets::upsert_tool_secret,
    tools::{Tool, config_secrets::ExtractedSecret},
};
use sqlx::{query, query_as};
use uuid::Uuid;

/// Extends primary database with the tools management methods.
impl Database {
    /// Retrieves tool from the `tools` table using tool ID.
    pub async fn get_tool(&self, id: Uuid) -> anyhow::Result<Option<Tool>> {
        query_as::<_, RawTool>(
            r#"
SELECT id, name, type, provisioned, configuration, created_at, updated_at
FROM tools
WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(Tool::try_from)
        .transpose()
    }

    /// Inserts tool into the `tools` table together with the secrets extracted from its
    /// configuration. Either everything is written or nothing is.
    pub async fn insert_tool(&self, tool: &Tool, secrets: &[ExtractedSecret]) -> anyhow::Result<()> {
        let raw_tool = RawTool::try_from(tool)?;

        let mut tx = self.pool.begin().await?;

        // Insert tool.
        query(
            r#"
INSERT INTO tools (id, name, type, provisioned, configuration, created_at, updated_at)
VALUES ( ?1, ?2, ?3, ?4, ?5, ?6, ?7 )
            "#,
        )
        .bind(raw_tool.id)
        .bind(raw_tool.name)
        .bind(raw_tool.tool_type)
        .bind(raw_tool.provisioned)
        .bind(raw_tool.configuration)
        .bind(raw_tool.created_at)
        .bind(raw_tool.updated_at)
        .execute(&mut *tx)
        .await?;

        // Insert tool secrets.
        for secret in secrets {
            upsert_tool_secret(&mut *tx, tool.id, &secret.key, &secret.value).await?;
        }

        Ok(tx.commit().await?)
    }

    /// Updates name and configuration of the tool and upserts the secrets extracted from the
    /// configuration in a single transaction. Returns `false` if the tool doesn't exist.
    pub async fn update_tool(
        &self,
        tool: &Tool,
        secrets: &[ExtractedSecret],
    ) -> anyhow::Result<bool> {
        let raw_tool = RawTool::try_from(tool)?;

        let mut tx = self.pool.begin().await?;

        // Update tool.
        let result = query(
            r#"
UPDATE tools
SET name = ?2, configuration = ?3, updated_at = ?4
WHERE id = ?1
            "#,
        )
        .bind(raw_tool.id)
        .bind(raw_tool.name)
        .bind(raw_tool.configuration)
        .bind(raw_tool.updated_at)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        // Update tool secrets.
        for secret in secrets {
            upsert_tool_secret(&mut *tx, tool.id, &secret.key, &secret.value).await?;
        }

        tx.commit().await?;

        Ok(true)
    }

    /// Removes tool with the specified ID from the `tools` table together with its secrets.
    pub async fn remove_tool(&self, id: Uuid) -> anyhow::Result<Option<Tool>> {
        query_as::<_, RawTool>(
            r#"
DELETE FROM tools
WHERE id = ?1
RETURNING id, name, type, provisioned, configuration, created_at, updated_at
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(Tool::try_from)
        .transpose()
    }
}
