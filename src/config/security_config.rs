use serde_derive::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// Security configuration: user authentication, secrets encryption and browser sessions.
#[derive(Deserialize, Serialize, Clone, PartialEq)]
pub struct SecurityConfig {
    /// Name of the cookie that may carry the user JWT when the `Authorization` header cannot be
    /// used (e.g. top-level navigations to the OAuth start endpoint).
    pub session_cookie_name: String,
    /// Secret key used to verify JWT tokens used for HTTP authentication. If not provided, HTTP
    /// authentication will be disabled.
    pub jwt_secret: Option<String>,
    /// Passphrase used to derive per-secret encryption keys and to sign OAuth state tokens. If not
    /// provided, user secrets can be neither stored nor read.
    pub secrets_passphrase: Option<String>,
    /// Hex-encoded 64-byte key used to sign and encrypt the short-lived OAuth session cookie. A
    /// random key is generated on startup if not provided.
    pub session_key: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "id".to_string(),
            jwt_secret: None,
            secrets_passphrase: None,
            session_key: None,
        }
    }
}

impl Debug for SecurityConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SecurityConfig")
            .field("session_cookie_name", &self.session_cookie_name)
            .field("jwt_secret", &redact(&self.jwt_secret))
            .field("secrets_passphrase", &redact(&self.secrets_passphrase))
            .field("session_key", &redact(&self.session_key))
            .finish()
    }
}
