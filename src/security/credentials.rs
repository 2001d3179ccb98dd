use std::fmt::{Debug, Formatter};

/// Credentials the user presents with the request, both carry a JWT issued by the main
/// application.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// JWT from the `Authorization: Bearer` header.
    Jwt(String),
    /// JWT from the session cookie.
    SessionCookie(String),
}

impl Credentials {
    /// Returns the JWT.
    pub fn token(&self) -> &str {
        match self {
            Self::Jwt(token) | Self::SessionCookie(token) => token,
        }
    }

    /// Returns where the credentials came from, used for logging.
    pub fn source(&self) -> &'static str {
        match self {
            Self::Jwt(_) => "jwt",
            Self::SessionCookie(_) => "session",
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credentials({}, [REDACTED])", self.source())
    }
}
