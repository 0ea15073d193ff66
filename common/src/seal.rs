// common/src/seal.rs
//! Stateless sealed payloads for session cookies.
//!
//! A sealed value is `v1*` followed by the URL-safe base64 of a random
//! 96-bit IV and the AES-256-GCM ciphertext of a JSON envelope that holds
//! the payload and its absolute expiry. Anyone without the server secret can
//! neither read nor forge it.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Minimum length of the secret a sealer is built from.
pub const MIN_PASSWORD_LEN: usize = 32;

const SEAL_PREFIX: &str = "v1*";
const IV_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum SealError {
    #[error("password must be at least {min} characters long")]
    PasswordTooShort { min: usize },
    #[error("failed to serialize sealed payload: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("seal lifetime is out of range")]
    TtlOutOfRange,
    #[error("failed to encrypt sealed payload")]
    Encrypt,
    #[error("sealed value has an unknown format")]
    Format,
    #[error("sealed value is not valid base64: {0}")]
    Decode(String),
    #[error("sealed value failed authentication")]
    Decrypt,
    #[error("sealed payload could not be read: {0}")]
    Deserialize(#[source] serde_json::Error),
    #[error("sealed value expired")]
    Expired,
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    exp: i64,
    data: T,
}

/// Seals and unseals payloads with a key derived from a server secret.
#[derive(Clone)]
pub struct SessionSealer {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SessionSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSealer").finish_non_exhaustive()
    }
}

impl SessionSealer {
    pub fn new(password: &str) -> Result<Self, SealError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SealError::PasswordTooShort { min: MIN_PASSWORD_LEN });
        }

        let digest = Sha256::digest(password.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(digest.as_slice());
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Seal `data`, valid for `ttl` from now.
    pub fn seal<T: Serialize>(&self, data: &T, ttl: Duration) -> Result<String, SealError> {
        self.seal_at(data, ttl, Utc::now())
    }

    pub fn seal_at<T: Serialize>(
        &self,
        data: &T,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, SealError> {
        let exp = now.checked_add_signed(ttl).ok_or(SealError::TtlOutOfRange)?;
        let envelope = Envelope {
            exp: exp.timestamp(),
            data,
        };
        let plaintext = serde_json::to_vec(&envelope).map_err(SealError::Serialize)?;

        let iv = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&iv, plaintext.as_slice())
            .map_err(|_| SealError::Encrypt)?;

        let mut raw = Vec::with_capacity(IV_LEN + ciphertext.len());
        raw.extend_from_slice(iv.as_slice());
        raw.extend_from_slice(&ciphertext);

        Ok(format!(
            "{}{}",
            SEAL_PREFIX,
            base64::encode_config(&raw, base64::URL_SAFE_NO_PAD)
        ))
    }

    pub fn unseal<T: DeserializeOwned>(&self, sealed: &str) -> Result<T, SealError> {
        self.unseal_at(sealed, Utc::now())
    }

    pub fn unseal_at<T: DeserializeOwned>(
        &self,
        sealed: &str,
        now: DateTime<Utc>,
    ) -> Result<T, SealError> {
        let encoded = sealed.strip_prefix(SEAL_PREFIX).ok_or(SealError::Format)?;
        let raw = base64::decode_config(encoded, base64::URL_SAFE_NO_PAD)
            .map_err(|e| SealError::Decode(e.to_string()))?;
        if raw.len() <= IV_LEN {
            return Err(SealError::Format);
        }

        let (iv, ciphertext) = raw.split_at(IV_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| SealError::Decrypt)?;

        let envelope: Envelope<T> =
            serde_json::from_slice(&plaintext).map_err(SealError::Deserialize)?;
        if envelope.exp <= now.timestamp() {
            return Err(SealError::Expired);
        }

        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    const PASSWORD: &str = "complex_password_at_least_32_characters_long";

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        nonce: String,
        count: u32,
    }

    fn payload() -> Payload {
        Payload {
            nonce: "abcdefgh12345678".to_string(),
            count: 3,
        }
    }

    #[test]
    fn test_seal_unseal() {
        let sealer = SessionSealer::new(PASSWORD).unwrap();
        let sealed = sealer.seal(&payload(), Duration::minutes(10)).unwrap();

        assert!(sealed.starts_with("v1*"));
        assert!(!sealed.contains("abcdefgh12345678"));
        let unsealed: Payload = sealer.unseal(&sealed).unwrap();
        assert_eq!(unsealed, payload());
    }

    #[test]
    fn test_each_seal_uses_fresh_iv() {
        let sealer = SessionSealer::new(PASSWORD).unwrap();
        let a = sealer.seal(&payload(), Duration::minutes(10)).unwrap();
        let b = sealer.seal(&payload(), Duration::minutes(10)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_short_password() {
        assert!(matches!(
            SessionSealer::new("short"),
            Err(SealError::PasswordTooShort { min: MIN_PASSWORD_LEN })
        ));
    }

    #[test]
    fn test_tampered_value_fails() {
        let sealer = SessionSealer::new(PASSWORD).unwrap();
        let sealed = sealer.seal(&payload(), Duration::minutes(10)).unwrap();

        let mut chars: Vec<char> = sealed.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        assert!(matches!(
            sealer.unseal::<Payload>(&tampered),
            Err(SealError::Decrypt) | Err(SealError::Decode(_))
        ));
    }

    #[test]
    fn test_other_key_fails() {
        let sealer = SessionSealer::new(PASSWORD).unwrap();
        let rotated = SessionSealer::new("another_password_that_is_32_characters_or_more").unwrap();
        let sealed = sealer.seal(&payload(), Duration::minutes(10)).unwrap();

        assert!(matches!(rotated.unseal::<Payload>(&sealed), Err(SealError::Decrypt)));
    }

    #[test]
    fn test_expired_value_fails() {
        let sealer = SessionSealer::new(PASSWORD).unwrap();
        let issued = Utc::now() - Duration::minutes(20);
        let sealed = sealer.seal_at(&payload(), Duration::minutes(10), issued).unwrap();

        assert!(matches!(sealer.unseal::<Payload>(&sealed), Err(SealError::Expired)));
        let still_valid: Payload = sealer
            .unseal_at(&sealed, issued + Duration::minutes(5))
            .unwrap();
        assert_eq!(still_valid, payload());
    }

    #[test]
    fn test_unrepresentable_ttl_fails() {
        let sealer = SessionSealer::new(PASSWORD).unwrap();
        let result = sealer.seal(&payload(), Duration::seconds(1_000_000_000_000_000));
        assert!(matches!(result, Err(SealError::TtlOutOfRange)));
    }

    #[test]
    fn test_garbage_fails() {
        let sealer = SessionSealer::new(PASSWORD).unwrap();
        assert!(matches!(sealer.unseal::<Payload>("plain"), Err(SealError::Format)));
        assert!(matches!(sealer.unseal::<Payload>("v1*!!!"), Err(SealError::Decode(_))));
        assert!(matches!(sealer.unseal::<Payload>("v1*AAAA"), Err(SealError::Format)));
    }
}
