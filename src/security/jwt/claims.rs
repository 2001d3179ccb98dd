use crate::users::UserId;
use serde::{Deserialize, Serialize};
use serde_with::{TimestampSeconds, serde_as};
use time::OffsetDateTime;

/// JWT claims struct.
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Claims {
    /// User ID.
    pub sub: UserId,
    /// User email.
    pub email: String,
    /// Whether the user is an administrator.
    #[serde(default)]
    pub admin: bool,
    /// Token expiration time (UTC timestamp).
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub exp: OffsetDateTime,
}

#[cfg(test)]
mod test {
    use crate::security::jwt::Claims;
    use time::OffsetDateTime;
    use uuid::uuid;

    #[test]
    fn deserialization() -> anyhow::Result<()> {
        assert_eq!(
            serde_json::from_str::<Claims>(
                r#"
        {
          "sub": "00000000-0000-0000-0000-000000000001",
          "email": "dev@toolvault.dev",
          "exp": 1262340000
        }"#
            )?,
            Claims {
                sub: uuid!("00000000-0000-0000-0000-000000000001").into(),
                email: "dev@toolvault.dev".to_string(),
                admin: false,
                exp: OffsetDateTime::from_unix_timestamp(1262340000)?,
            }
        );

        assert!(
            serde_json::from_str::<Claims>(
                r#"
        {
          "sub": "00000000-0000-0000-0000-000000000001",
          "email": "dev@toolvault.dev",
          "admin": true,
          "exp": 1262340000
        }"#
            )?
            .admin
        );

        assert!(
            serde_json::from_str::<Claims>(
                r#"{ "sub": "dev@toolvault.dev", "email": "dev@toolvault.dev", "exp": 1262340000 }"#
            )
            .is_err()
        );

        Ok(())
    }
}
