mod raw_user_secret;

use self::raw_user_secret::RawUserSecret;
use crate::{
    database::Database,
    secrets::{UserSecret, UserSecretType},
    users::UserId,
};
use sqlx::{SqliteExecutor, query, query_as, query_scalar};
use time::OffsetDateTime;
use uuid::Uuid;

/// Extends primary database with the user and tool secrets management methods.
impl Database {
    /// Retrieves user secret identified by the owner, context and type.
    pub async fn get_user_secret(
        &self,
        user_id: UserId,
        context: &str,
        secret_type: UserSecretType,
    ) -> anyhow::Result<Option<UserSecret>> {
        query_as::<_, RawUserSecret>(
            r#"
SELECT id, user_id, context, type, label, value, created_at, updated_at
FROM user_secrets
WHERE user_id = ?1 AND context = ?2 AND type = ?3
            "#,
        )
        .bind(user_id.to_string())
        .bind(context)
        .bind(secret_type.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(UserSecret::try_from)
        .transpose()
    }

    /// Retrieves all secrets of the specified user, optionally filtered by type.
    pub async fn get_user_secrets(
        &self,
        user_id: UserId,
        secret_type: Option<UserSecretType>,
    ) -> anyhow::Result<Vec<UserSecret>> {
        query_as::<_, RawUserSecret>(
            r#"
SELECT id, user_id, context, type, label, value, created_at, updated_at
FROM user_secrets
WHERE user_id = ?1 AND (?2 IS NULL OR type = ?2)
ORDER BY created_at, id
            "#,
        )
        .bind(user_id.to_string())
        .bind(secret_type.map(|secret_type| secret_type.as_str()))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(UserSecret::try_from)
        .collect()
    }

    /// Inserts user secret. Fails with the unique constraint violation if a secret for the same
    /// owner, context and type already exists.
    pub async fn insert_user_secret(&self, secret: &UserSecret) -> Result<(), sqlx::Error> {
        let raw_secret = RawUserSecret::from(secret);
        query(
            r#"
INSERT INTO user_secrets (id, user_id, context, type, label, value, created_at, updated_at)
VALUES ( ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8 )
            "#,
        )
        .bind(raw_secret.id)
        .bind(raw_secret.user_id)
        .bind(raw_secret.context)
        .bind(raw_secret.secret_type)
        .bind(raw_secret.label)
        .bind(raw_secret.value)
        .bind(raw_secret.created_at)
        .bind(raw_secret.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts user secret or replaces label and value of the existing secret with the same owner,
    /// context and type. Returns the stored secret.
    pub async fn upsert_user_secret(&self, secret: &UserSecret) -> anyhow::Result<UserSecret> {
        let raw_secret = RawUserSecret::from(secret);
        query_as::<_, RawUserSecret>(
            r#"
INSERT INTO user_secrets (id, user_id, context, type, label, value, created_at, updated_at)
VALUES ( ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8 )
ON CONFLICT(user_id, context, type) DO UPDATE SET
    label=excluded.label, value=excluded.value, updated_at=excluded.updated_at
RETURNING id, user_id, context, type, label, value, created_at, updated_at
            "#,
        )
        .bind(raw_secret.id)
        .bind(raw_secret.user_id)
        .bind(raw_secret.context)
        .bind(raw_secret.secret_type)
        .bind(raw_secret.label)
        .bind(raw_secret.value)
        .bind(raw_secret.created_at)
        .bind(raw_secret.updated_at)
        .fetch_one(&self.pool)
        .await?
        .try_into()
    }

    /// Removes user secret with the specified ID if it belongs to the specified user. Returns the
    /// number of removed secrets.
    pub async fn remove_user_secret(&self, user_id: UserId, id: Uuid) -> anyhow::Result<u64> {
        Ok(query(
            r#"
DELETE FROM user_secrets
WHERE user_id = ?1 AND id = ?2
            "#,
        )
        .bind(user_id.to_string())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected())
    }

    /// Retrieves plaintext value of the tool secret with the specified key.
    pub async fn get_tool_secret(&self, tool_id: Uuid, key: &str) -> anyhow::Result<Option<String>> {
        Ok(query_scalar::<_, String>(
            r#"
SELECT value
FROM tool_secrets
WHERE tool_id = ?1 AND key = ?2
            "#,
        )
        .bind(tool_id.to_string())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Inserts or replaces the value of the tool secret with the specified key.
    pub async fn upsert_tool_secret(
        &self,
        tool_id: Uuid,
        key: &str,
        value: &str,
    ) -> anyhow::Result<()> {
        upsert_tool_secret(&self.pool, tool_id, key, value).await
    }
}

/// Inserts or replaces the tool secret using the specified executor, so that the write can be a
/// part of a larger transaction.
pub(crate) async fn upsert_tool_secret<'c, E: SqliteExecutor<'c>>(
    executor: E,
    tool_id: Uuid,
    key: &str,
    value: &str,
) -> anyhow::Result<()> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    query(
        r#"
INSERT INTO tool_secrets (id, tool_id, key, value, created_at, updated_at)
VALUES ( ?1, ?2, ?3, ?4, ?5, ?5 )
ON CONFLICT(tool_id, key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at
        "#,
    )
    .bind(Uuid::now_v7().to_string())
    .bind(tool_id.to_string())
    .bind(key)
    .bind(value)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}
