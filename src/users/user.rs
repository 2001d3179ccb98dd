use crate::users::UserId;
use serde_derive::Serialize;
use time::OffsetDateTime;

/// Authenticated user of the platform. Only the identity is kept, everything else is owned by
/// the main application.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub is_admin: bool,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
}

impl AsRef<User> for User {
    fn as_ref(&self) -> &User {
        self
    }
}
