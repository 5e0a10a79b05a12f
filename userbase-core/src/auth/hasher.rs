//! Password digests
//!
//! PBKDF2-HMAC over the plaintext with the configured salt, iteration count,
//! output length and digest. The same inputs always produce the same hex
//! string, so stored digests are compared instead of plaintexts.

use crate::auth::constant_time_digest_compare;
use crate::config::{DigestAlgorithm, EncryptionConfig};
use crate::{PasswordDigest, Result, UserbaseError};
use pbkdf2::pbkdf2_hmac;
use sha2::{Sha256, Sha512};

/// Upper bound on the derived key length, in bytes
pub const MAX_KEY_LENGTH: usize = 1024;

/// Derive the hex digest of `plaintext`
pub fn derive_digest(
    plaintext: &str,
    salt: &str,
    iterations: u32,
    key_length: usize,
    digest: DigestAlgorithm,
) -> Result<PasswordDigest> {
    if iterations == 0 {
        return Err(UserbaseError::InvalidInput("iterations must be positive".to_string()));
    }
    if key_length == 0 || key_length > MAX_KEY_LENGTH {
        return Err(UserbaseError::InvalidInput(format!(
            "key length {} outside 1..={}",
            key_length, MAX_KEY_LENGTH
        )));
    }

    let mut derived = vec![0u8; key_length];
    match digest {
        DigestAlgorithm::Sha256 => {
            pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), salt.as_bytes(), iterations, &mut derived)
        }
        DigestAlgorithm::Sha512 => {
            pbkdf2_hmac::<Sha512>(plaintext.as_bytes(), salt.as_bytes(), iterations, &mut derived)
        }
    }

    Ok(PasswordDigest::from_hex(hex::encode(derived)))
}

/// Hasher bound to one [`EncryptionConfig`]
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    config: EncryptionConfig,
}

impl CredentialHasher {
    pub fn new(config: &EncryptionConfig) -> Self {
        CredentialHasher {
            config: config.clone(),
        }
    }

    pub fn hash(&self, plaintext: &str) -> Result<PasswordDigest> {
        derive_digest(
            plaintext,
            &self.config.salt,
            self.config.iterations,
            self.config.key_length,
            self.config.digest,
        )
    }

    /// Hash `plaintext` and compare it with `stored` in constant time
    pub fn verify(&self, plaintext: &str, stored: &PasswordDigest) -> Result<bool> {
        let candidate = self.hash(plaintext)?;
        Ok(constant_time_digest_compare(&candidate, stored))
    }
}
