use crate::{oauth::OAuthError, secrets::random_bytes, users::UserId};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use openssl::{hash::MessageDigest, memcmp, pkey::PKey, sign::Signer};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Context used to derive the state signing key from the passphrase.
const STATE_KEY_CONTEXT: &[u8] = b"toolvault/mcp-oauth-state";
/// Maximum clock skew tolerated for states issued "in the future".
const MAX_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Data bound to the OAuth `state` parameter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthStatePayload {
    pub user_id: UserId,
    pub tool_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    pub nonce: String,
}

/// Issues and verifies tamper-evident OAuth `state` values:
/// `base64url(json payload).base64url(HMAC-SHA256(encoded payload))`.
pub struct OAuthStateSigner {
    key: Vec<u8>,
}

impl OAuthStateSigner {
    /// Creates a signer with the key derived from the configured passphrase.
    pub fn new(passphrase: Option<&str>) -> Result<Self, OAuthError> {
        let passphrase = passphrase.filter(|passphrase| !passphrase.is_empty()).ok_or_else(|| {
            OAuthError::Configuration(
                "Secrets passphrase is required to sign OAuth state.".to_string(),
            )
        })?;

        let key = hmac_sha256(passphrase.as_bytes(), STATE_KEY_CONTEXT)
            .map_err(|err| OAuthError::Configuration(format!("Cannot derive state key: {err}")))?;
        Ok(Self { key })
    }

    /// Issues a new signed state for the user and tool with a fresh random nonce.
    pub fn issue(
        &self,
        user_id: UserId,
        tool_id: Uuid,
        issued_at: OffsetDateTime,
    ) -> anyhow::Result<String> {
        self.sign(&OAuthStatePayload {
            user_id,
            tool_id,
            issued_at,
            nonce: URL_SAFE_NO_PAD.encode(random_bytes::<32>()?),
        })
    }

    pub fn sign(&self, payload: &OAuthStatePayload) -> anyhow::Result<String> {
        let encoded_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
        let signature = hmac_sha256(&self.key, encoded_payload.as_bytes())?;
        Ok(format!(
            "{encoded_payload}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verifies the signature and the age of the state and returns its payload.
    pub fn verify(
        &self,
        state: &str,
        now: OffsetDateTime,
        ttl: Duration,
    ) -> Result<OAuthStatePayload, OAuthError> {
        let invalid = |message: &str| OAuthError::InvalidState(message.to_string());

        let (encoded_payload, encoded_signature) = state
            .split_once('.')
            .filter(|(payload, signature)| !payload.is_empty() && !signature.is_empty())
            .ok_or_else(|| invalid("state is not signed"))?;

        let signature = URL_SAFE_NO_PAD
            .decode(encoded_signature)
            .map_err(|_| invalid("state signature is malformed"))?;
        let expected_signature = hmac_sha256(&self.key, encoded_payload.as_bytes())
            .map_err(|err| OAuthError::InvalidState(format!("cannot verify state: {err}")))?;
        if signature.len() != expected_signature.len()
            || !memcmp::eq(&signature, &expected_signature)
        {
            return Err(invalid("state signature doesn't match"));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(encoded_payload)
            .ok()
            .and_then(|payload| serde_json::from_slice::<OAuthStatePayload>(&payload).ok())
            .ok_or_else(|| invalid("state payload is malformed"))?;

        if now > payload.issued_at + ttl {
            return Err(invalid("state has expired"));
        }
        if payload.issued_at > now + MAX_CLOCK_SKEW {
            return Err(invalid("state is issued in the future"));
        }

        Ok(payload)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let key = PKey::hmac(key)?;
    let mut signer = Signer::new(MessageDigest::sha256(), &key)?;
    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}
