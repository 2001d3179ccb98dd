use crate::{
    api::Api,
    security::{Claims, Credentials},
    users::User,
};
use anyhow::bail;
use jsonwebtoken::{DecodingKey, Validation, decode};
use time::OffsetDateTime;
use tracing::warn;

/// Authenticates users of the service.
pub struct SecurityApiExt<'a> {
    api: &'a Api,
}

impl<'a> SecurityApiExt<'a> {
    /// Instantiates security API extension.
    pub fn new(api: &'a Api) -> Self {
        Self { api }
    }

    /// Authenticates user with the JWT issued by the main application. Every authenticated user
    /// is recorded in the `users` table, so that secrets can reference it.
    pub async fn authenticate(&self, credentials: &Credentials) -> anyhow::Result<Option<User>> {
        let claims = match self.decode_claims(credentials.token()) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(
                    "Couldn't authenticate user with `{}` credentials: {err}",
                    credentials.source()
                );
                return Ok(None);
            }
        };

        let created_at = match self.api.db.get_user(claims.sub).await? {
            Some(existing_user) => existing_user.created_at,
            None => OffsetDateTime::from_unix_timestamp(OffsetDateTime::now_utc().unix_timestamp())?,
        };
        let user = User {
            id: claims.sub,
            email: claims.email,
            is_admin: claims.admin,
            created_at,
        };
        self.api.db.upsert_user(&user).await?;

        Ok(Some(user))
    }

    fn decode_claims(&self, token: &str) -> anyhow::Result<Claims> {
        let Some(ref jwt_secret) = self.api.config.security.jwt_secret else {
            bail!("JWT secret is not configured.");
        };

        Ok(decode::<Claims>(
            token,
            &DecodingKey::from_secret(jwt_secret.as_bytes()),
            &Validation::default(),
        )?
        .claims)
    }
}

impl Api {
    /// Returns an API to authenticate users.
    pub fn security(&self) -> SecurityApiExt<'_> {
        SecurityApiExt::new(self)
    }
}
