/// Result of reading a user secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserSecretResolution {
    /// Decrypted secret value.
    Ok(String),
    /// There is no secret for the requested owner, context and type.
    Missing,
    /// The secret exists, but cannot be decrypted and should be re-entered.
    Unreadable,
}

/// Result of reading a tool secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSecretResolution {
    Ok(String),
    Missing,
}
