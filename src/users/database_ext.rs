mod raw_user;

use self::raw_user::RawUser;
use crate::{
    database::Database,
    users::{User, UserId},
};
use sqlx::{query, query_as};

/// Extends primary database with the user management-related methods.
impl Database {
    /// Retrieves user from the `users` table using user ID.
    pub async fn get_user(&self, id: UserId) -> anyhow::Result<Option<User>> {
        query_as::<_, RawUser>(
            r#"
SELECT id, email, is_admin, created_at
FROM users
WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Inserts or updates user in the `users` table. The creation timestamp of an existing user
    /// is preserved.
    pub async fn upsert_user<U: AsRef<User>>(&self, user: U) -> anyhow::Result<()> {
        let raw_user = RawUser::from(user.as_ref());
        query(
            r#"
INSERT INTO users (id, email, is_admin, created_at)
VALUES ( ?1, ?2, ?3, ?4 )
ON CONFLICT(id) DO UPDATE SET email=excluded.email, is_admin=excluded.is_admin
            "#,
        )
        .bind(raw_user.id)
        .bind(raw_user.email)
        .bind(raw_user.is_admin)
        .bind(raw_user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes user with the specified ID from the `users` table. User secrets are removed by the
    /// database as well.
    pub async fn remove_user(&self, id: UserId) -> anyhow::Result<Option<User>> {
        query_as::<_, RawUser>(
            r#"
DELETE FROM users
WHERE id = ?1
RETURNING id, email, is_admin, created_at
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }
}
