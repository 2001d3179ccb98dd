/// Data-level conditions that can happen while storing or reading secrets.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretsError {
    /// No passphrase is configured, secrets can be neither encrypted nor decrypted.
    #[error("Secrets encryption passphrase is not configured.")]
    MissingKey,
    /// The stored payload cannot be decrypted: malformed, unknown version, wrong key or tampered.
    #[error("Secret is unreadable: {0}")]
    Unreadable(String),
    /// A secret for the same owner, context and type already exists.
    #[error("Secret already exists for this context and type.")]
    Conflict,
}
