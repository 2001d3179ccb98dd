use crate::{secrets::UserSecretType, users::UserId};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Represents a user secret stored encrypted at rest. Unique per (user, context, type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSecret {
    /// Unique identifier for the secret.
    pub id: Uuid,
    /// The user who owns this secret.
    #[serde(skip)]
    pub user_id: UserId,
    /// What the secret belongs to, e.g. a backend or a tool ID.
    pub context: String,
    /// Kind of the secret.
    #[serde(rename = "type")]
    pub secret_type: UserSecretType,
    /// Human-readable name of the secret.
    pub label: String,
    /// Encrypted payload, never serialized.
    #[serde(skip)]
    pub value: String,
    /// When the secret was first created.
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    /// When the secret value was last updated.
    #[serde(with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}
