mod api_ext;
mod database_ext;
mod encryption;
mod secret_resolution;
mod secrets_error;
mod user_secret;
mod user_secret_status;
mod user_secret_type;

pub use self::{
    api_ext::{SecretsApiExt, UserSecretParams},
    encryption::SecretsEncryption,
    secret_resolution::{ToolSecretResolution, UserSecretResolution},
    secrets_error::SecretsError,
    user_secret::UserSecret,
    user_secret_status::UserSecretStatus,
    user_secret_type::UserSecretType,
};

pub(crate) use self::{database_ext::upsert_tool_secret, encryption::random_bytes};
