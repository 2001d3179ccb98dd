use crate::secrets::{UserSecret, UserSecretType};
use serde::Serialize;
use uuid::Uuid;

/// Public view of a user secret: metadata and whether its value can still be decrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSecretStatus {
    pub id: Uuid,
    pub context: String,
    #[serde(rename = "type")]
    pub secret_type: UserSecretType,
    pub label: String,
    pub readable: bool,
}

impl UserSecretStatus {
    pub fn new(secret: &UserSecret, readable: bool) -> Self {
        Self {
            id: secret.id,
            context: secret.context.clone(),
            secret_type: secret.secret_type,
            label: secret.label.clone(),
            readable,
        }
    }
}
