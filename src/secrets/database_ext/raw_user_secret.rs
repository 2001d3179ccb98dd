use crate::secrets::UserSecret;
use time::OffsetDateTime;

#[derive(Debug, Eq, PartialEq, Clone, sqlx::FromRow)]
pub(super) struct RawUserSecret {
    pub id: String,
    pub user_id: String,
    pub context: String,
    #[sqlx(rename = "type")]
    pub secret_type: String,
    pub label: String,
    pub value: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<RawUserSecret> for UserSecret {
    type Error = anyhow::Error;

    fn try_from(raw: RawUserSecret) -> Result<Self, Self::Error> {
        Ok(UserSecret {
            id: raw.id.parse()?,
            user_id: raw.user_id.parse()?,
            context: raw.context,
            secret_type: raw.secret_type.parse()?,
            label: raw.label,
            value: raw.value,
            created_at: OffsetDateTime::from_unix_timestamp(raw.created_at)?,
            updated_at: OffsetDateTime::from_unix_timestamp(raw.updated_at)?,
        })
    }
}

impl From<&UserSecret> for RawUserSecret {
    fn from(secret: &UserSecret) -> Self {
        Self {
            id: secret.id.to_string(),
            user_id: secret.user_id.to_string(),
            context: secret.context.clone(),
            secret_type: secret.secret_type.to_string(),
            label: secret.label.clone(),
            value: secret.value.clone(),
            created_at: secret.created_at.unix_timestamp(),
            updated_at: secret.updated_at.unix_timestamp(),
        }
    }
}
