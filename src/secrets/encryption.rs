use crate::secrets::SecretsError;
use anyhow::Context;
use base64::{Engine, engine::general_purpose::STANDARD};
use openssl::{
    hash::MessageDigest,
    pkcs5::pbkdf2_hmac,
    symm::{Cipher, Crypter, Mode},
};
use std::fmt::{Debug, Formatter};

/// Version tag of the payload format produced by [`SecretsEncryption::encrypt`].
const PAYLOAD_VERSION: &str = "v1";
/// Size of the random salt used to derive a key for every payload.
const SALT_SIZE: usize = 16;
/// AES-256-GCM nonce size in bytes.
const NONCE_SIZE: usize = 12;
/// AES-256-GCM authentication tag size in bytes.
const TAG_SIZE: usize = 16;
/// AES-256 key size in bytes.
const KEY_SIZE: usize = 32;
/// Number of PBKDF2-HMAC-SHA256 iterations used to derive a key from the passphrase.
const PBKDF2_ITERATIONS: usize = 120_000;

/// Envelope encryption for secret values: every payload is encrypted with AES-256-GCM under a key
/// derived from the configured passphrase and a fresh random salt.
///
/// Payload format is `v1:<salt>:<nonce>:<ciphertext>:<tag>`, every segment after the version is
/// base64 encoded.
#[derive(Clone)]
pub struct SecretsEncryption {
    passphrase: String,
}

impl SecretsEncryption {
    /// Creates a new instance from the configured passphrase. Fails with
    /// [`SecretsError::MissingKey`] if the passphrase is absent or empty.
    pub fn new(passphrase: Option<&str>) -> Result<Self, SecretsError> {
        match passphrase {
            Some(passphrase) if !passphrase.is_empty() => Ok(Self {
                passphrase: passphrase.to_string(),
            }),
            _ => Err(SecretsError::MissingKey),
        }
    }

    /// Encrypts plaintext using a freshly derived key and a random nonce. Encrypting the same
    /// value twice never produces the same payload.
    pub fn encrypt(&self, plaintext: &str) -> anyhow::Result<String> {
        let salt = random_bytes::<SALT_SIZE>()?;
        let nonce = random_bytes::<NONCE_SIZE>()?;
        let key = self.derive_key(&salt)?;

        let cipher = Cipher::aes_256_gcm();
        let mut crypter = Crypter::new(cipher, Mode::Encrypt, &key, Some(&nonce))?;
        let mut ciphertext = vec![0u8; plaintext.len() + cipher.block_size()];
        let mut count = crypter.update(plaintext.as_bytes(), &mut ciphertext)?;
        count += crypter.finalize(&mut ciphertext[count..])?;
        ciphertext.truncate(count);

        let mut tag = [0u8; TAG_SIZE];
        crypter.get_tag(&mut tag)?;

        Ok([
            PAYLOAD_VERSION.to_string(),
            STANDARD.encode(salt),
            STANDARD.encode(nonce),
            STANDARD.encode(ciphertext),
            STANDARD.encode(tag),
        ]
        .join(":"))
    }

    /// Decrypts a payload previously produced by [`SecretsEncryption::encrypt`]. Any malformed,
    /// tampered or foreign payload results in [`SecretsError::Unreadable`].
    pub fn decrypt(&self, payload: &str) -> Result<String, SecretsError> {
        let segments = payload.split(':').collect::<Vec<_>>();
        let [version, salt, nonce, ciphertext, tag] = segments.as_slice() else {
            return Err(unreadable("Malformed secret payload."));
        };
        if *version != PAYLOAD_VERSION {
            return Err(unreadable("Unsupported secret payload version."));
        }

        let decode = |segment: &str, name: &str| {
            STANDARD
                .decode(segment)
                .map_err(|err| unreadable(format!("Cannot decode {name}: {err}")))
        };
        let salt = decode(salt, "salt")?;
        let nonce = decode(nonce, "nonce")?;
        let ciphertext = decode(ciphertext, "ciphertext")?;
        let tag = decode(tag, "authentication tag")?;
        if salt.len() != SALT_SIZE || nonce.len() != NONCE_SIZE || tag.len() != TAG_SIZE {
            return Err(unreadable("Secret payload segments have unexpected size."));
        }

        let plaintext = self
            .decrypt_bytes(&salt, &nonce, &ciphertext, &tag)
            .map_err(|err| unreadable(format!("Cannot decrypt secret: {err}")))?;
        String::from_utf8(plaintext)
            .map_err(|_| unreadable("Decrypted secret is not a valid UTF-8 string."))
    }

    fn decrypt_bytes(
        &self,
        salt: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        let key = self.derive_key(salt)?;

        let cipher = Cipher::aes_256_gcm();
        let mut crypter = Crypter::new(cipher, Mode::Decrypt, &key, Some(nonce))?;
        crypter.set_tag(tag)?;

        let mut plaintext = vec![0u8; ciphertext.len() + cipher.block_size()];
        let mut count = crypter.update(ciphertext, &mut plaintext)?;
        count += crypter
            .finalize(&mut plaintext[count..])
            .context("Authentication tag mismatch.")?;
        plaintext.truncate(count);

        Ok(plaintext)
    }

    fn derive_key(&self, salt: &[u8]) -> anyhow::Result<[u8; KEY_SIZE]> {
        let mut key = [0u8; KEY_SIZE];
        pbkdf2_hmac(
            self.passphrase.as_bytes(),
            salt,
            PBKDF2_ITERATIONS,
            MessageDigest::sha256(),
            &mut key,
        )?;
        Ok(key)
    }
}

impl Debug for SecretsEncryption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsEncryption").finish_non_exhaustive()
    }
}

fn unreadable(message: impl Into<String>) -> SecretsError {
    SecretsError::Unreadable(message.into())
}

/// Fills an array with bytes from the cryptographically secure random generator.
pub(crate) fn random_bytes<const N: usize>() -> anyhow::Result<[u8; N]> {
    let mut bytes = [0u8; N];
    openssl::rand::rand_bytes(&mut bytes).context("Failed to generate random bytes.")?;
    Ok(bytes)
}
