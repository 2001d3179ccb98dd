use crate::users::User;
use time::OffsetDateTime;

#[derive(Debug, Eq, PartialEq, Clone, sqlx::FromRow)]
pub(super) struct RawUser {
    pub id: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: i64,
}

impl TryFrom<RawUser> for User {
    type Error = anyhow::Error;

    fn try_from(raw_user: RawUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: raw_user.id.parse()?,
            email: raw_user.email,
            is_admin: raw_user.is_admin,
            created_at: OffsetDateTime::from_unix_timestamp(raw_user.created_at)?,
        })
    }
}

impl From<&User> for RawUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at.unix_timestamp(),
        }
    }
}
