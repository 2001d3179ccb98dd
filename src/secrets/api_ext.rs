use crate::{
    api::Api,
    database::is_unique_violation,
    error::Error as ToolvaultError,
    secrets::{
        SecretsEncryption, SecretsError, ToolSecretResolution, UserSecret, UserSecretResolution,
        UserSecretStatus, UserSecretType,
    },
    users::UserId,
};
use anyhow::{anyhow, bail};
use time::OffsetDateTime;
use tracing::{error, warn};
use uuid::Uuid;

/// Maximum length of the secret context and label.
const MAX_SECRET_ATTRIBUTE_LENGTH: usize = 256;
/// Maximum length of the secret value (10 KB).
const MAX_SECRET_VALUE_LENGTH: usize = 10 * 1024;

/// Parameters required to store a user secret.
#[derive(Debug, Clone, Copy)]
pub struct UserSecretParams<'p> {
    pub context: &'p str,
    pub secret_type: UserSecretType,
    pub label: &'p str,
    pub value: &'p str,
}

pub struct SecretsApiExt<'a> {
    api: &'a Api,
}

impl<'a> SecretsApiExt<'a> {
    /// Creates Secrets API.
    pub fn new(api: &'a Api) -> Self {
        Self { api }
    }

    /// Encrypts and stores a new user secret. Fails with [`SecretsError::Conflict`] if the user
    /// already has a secret with the same context and type.
    pub async fn create_user_secret(
        &self,
        user_id: UserId,
        params: UserSecretParams<'_>,
    ) -> anyhow::Result<UserSecret> {
        Self::validate_params(&params)?;

        let secret = self.encrypt_user_secret(user_id, params)?;
        match self.api.db.insert_user_secret(&secret).await {
            Ok(()) => Ok(secret),
            Err(err) if is_unique_violation(&err) => {
                Err(anyhow!(err).context(SecretsError::Conflict))
            }
            Err(err) => Err(anyhow!(err).context(format!(
                "Couldn't create user secret ('{}') due to unknown reason.",
                params.context
            ))),
        }
    }

    /// Encrypts and stores a user secret replacing label and value of the existing secret with
    /// the same context and type, if any.
    pub async fn upsert_user_secret(
        &self,
        user_id: UserId,
        params: UserSecretParams<'_>,
    ) -> anyhow::Result<UserSecret> {
        Self::validate_params(&params)?;

        let secret = self.encrypt_user_secret(user_id, params)?;
        self.api.db.upsert_user_secret(&secret).await
    }

    /// Reads and decrypts the value of the user secret with the specified context and type.
    pub async fn get_user_secret_value(
        &self,
        user_id: UserId,
        context: &str,
        secret_type: UserSecretType,
    ) -> anyhow::Result<UserSecretResolution> {
        let Some(secret) = self
            .api
            .db
            .get_user_secret(user_id, context, secret_type)
            .await?
        else {
            return Ok(UserSecretResolution::Missing);
        };

        match self.decrypt_user_secret(&secret) {
            Ok(value) => Ok(UserSecretResolution::Ok(value)),
            Err(_) => Ok(UserSecretResolution::Unreadable),
        }
    }

    /// Lists secrets of the specified user, optionally filtered by type, reporting whether
    /// every secret can still be decrypted. Values are never exposed.
    pub async fn list_user_secret_statuses(
        &self,
        user_id: UserId,
        secret_type: Option<UserSecretType>,
    ) -> anyhow::Result<Vec<UserSecretStatus>> {
        Ok(self
            .api
            .db
            .get_user_secrets(user_id, secret_type)
            .await?
            .iter()
            .map(|secret| UserSecretStatus::new(secret, self.decrypt_user_secret(secret).is_ok()))
            .collect())
    }

    /// Deletes the secret with the specified ID if it belongs to the specified user. Returns the
    /// number of deleted secrets, deleting an already deleted secret is not an error.
    pub async fn delete_user_secret_by_id(&self, user_id: UserId, id: Uuid) -> anyhow::Result<u64> {
        self.api.db.remove_user_secret(user_id, id).await
    }

    /// Reads the value of the tool secret with the specified key.
    pub async fn get_tool_secret_value(
        &self,
        tool_id: Uuid,
        key: &str,
    ) -> anyhow::Result<ToolSecretResolution> {
        Ok(match self.api.db.get_tool_secret(tool_id, key).await? {
            Some(value) => ToolSecretResolution::Ok(value),
            None => ToolSecretResolution::Missing,
        })
    }

    /// Stores the value of the tool secret with the specified key.
    pub async fn upsert_tool_secret(
        &self,
        tool_id: Uuid,
        key: &str,
        value: &str,
    ) -> anyhow::Result<()> {
        self.api.db.upsert_tool_secret(tool_id, key, value).await
    }

    fn encryption(&self) -> Result<SecretsEncryption, SecretsError> {
        SecretsEncryption::new(self.api.config.security.secrets_passphrase.as_deref())
    }

    fn encrypt_user_secret(
        &self,
        user_id: UserId,
        params: UserSecretParams<'_>,
    ) -> anyhow::Result<UserSecret> {
        let value = self.encryption()?.encrypt(params.value)?;
        // Timestamps are stored with a second precision.
        let now = OffsetDateTime::from_unix_timestamp(OffsetDateTime::now_utc().unix_timestamp())?;
        Ok(UserSecret {
            id: Uuid::now_v7(),
            user_id,
            context: params.context.to_string(),
            secret_type: params.secret_type,
            label: params.label.to_string(),
            value,
            created_at: now,
            updated_at: now,
        })
    }

    fn decrypt_user_secret(&self, secret: &UserSecret) -> Result<String, SecretsError> {
        self.encryption()
            .and_then(|encryption| encryption.decrypt(&secret.value))
            .inspect_err(|err| match err {
                SecretsError::MissingKey => {
                    error!(
                        user.id = %secret.user_id,
                        secret.id = %secret.id,
                        "Cannot decrypt user secret, passphrase is not configured."
                    );
                }
                err => {
                    warn!(
                        user.id = %secret.user_id,
                        secret.id = %secret.id,
                        "Cannot decrypt user secret: {err}"
                    );
                }
            })
    }

    fn validate_params(params: &UserSecretParams<'_>) -> anyhow::Result<()> {
        for (name, value) in [("context", params.context), ("label", params.label)] {
            if value.trim().is_empty() {
                bail!(ToolvaultError::client(format!(
                    "Secret {name} cannot be empty."
                )));
            }
            if value.len() > MAX_SECRET_ATTRIBUTE_LENGTH {
                bail!(ToolvaultError::client(format!(
                    "Secret {name} cannot be longer than {MAX_SECRET_ATTRIBUTE_LENGTH} characters."
                )));
            }
        }

        if params.value.is_empty() {
            bail!(ToolvaultError::client("Secret value cannot be empty."));
        }
        if params.value.len() > MAX_SECRET_VALUE_LENGTH {
            bail!(ToolvaultError::client(format!(
                "Secret value cannot be larger than {MAX_SECRET_VALUE_LENGTH} bytes."
            )));
        }

        Ok(())
    }
}

impl Api {
    /// Returns an API to work with user and tool secrets.
    pub fn secrets(&self) -> SecretsApiExt<'_> {
        SecretsApiExt::new(self)
    }
}
