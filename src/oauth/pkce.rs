use crate::secrets::random_bytes;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use openssl::sha::sha256;

/// The only supported code challenge method.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Proof Key for Code Exchange (RFC 7636) verifier and its S256 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl PkcePair {
    /// Generates a new pair from 32 random bytes, the verifier is 43 characters long.
    pub fn generate() -> anyhow::Result<Self> {
        let code_verifier = URL_SAFE_NO_PAD.encode(random_bytes::<32>()?);
        let code_challenge = code_challenge(&code_verifier);
        Ok(Self {
            code_verifier,
            code_challenge,
        })
    }
}

/// Computes S256 code challenge for the verifier.
pub fn code_challenge(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(sha256(code_verifier.as_bytes()))
}
