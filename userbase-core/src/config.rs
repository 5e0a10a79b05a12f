//! Configuration for the auth core
//!
//! Built once at startup and then only read. The hasher, issuer and verifier
//! each take the piece they need by reference.

use crate::{Result, UserbaseError};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// HMAC digest used by the credential hasher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl FromStr for DigestAlgorithm {
    type Err = UserbaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            other => Err(UserbaseError::InvalidInput(format!(
                "unsupported digest algorithm '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha256 => f.write_str("sha256"),
            DigestAlgorithm::Sha512 => f.write_str("sha512"),
        }
    }
}

/// Symmetric signing schemes a token may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenAlgorithm {
    HS256,
    HS384,
    HS512,
}

impl TokenAlgorithm {
    /// Name as it appears in the JWS `alg` header
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenAlgorithm::HS256 => "HS256",
            TokenAlgorithm::HS384 => "HS384",
            TokenAlgorithm::HS512 => "HS512",
        }
    }
}

impl FromStr for TokenAlgorithm {
    type Err = UserbaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HS256" => Ok(TokenAlgorithm::HS256),
            "HS384" => Ok(TokenAlgorithm::HS384),
            "HS512" => Ok(TokenAlgorithm::HS512),
            other => Err(UserbaseError::InvalidInput(format!(
                "unsupported token algorithm '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TokenAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token signing secret; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        SigningSecret(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret({} bytes)", self.0.len())
    }
}

/// Parameters of the password key-derivation function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionConfig {
    pub salt: String,
    pub iterations: u32,
    /// Derived key length in bytes; the hex digest is twice as long
    pub key_length: usize,
    pub digest: DigestAlgorithm,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        EncryptionConfig {
            salt: "salt".to_string(),
            iterations: 100_000,
            key_length: 64,
            digest: DigestAlgorithm::Sha512,
        }
    }
}

/// Token issuance and verification settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    pub secret: SigningSecret,
    /// Validity window added to the issue time
    pub expiration: Duration,
    pub audience: String,
    pub issuer: String,
    /// Algorithm new tokens are signed with
    pub algorithm: TokenAlgorithm,
    /// Algorithms the verifier accepts
    pub allowed_algorithms: Vec<TokenAlgorithm>,
    /// Clock skew tolerated when checking expiration
    pub leeway: Duration,
}

impl TokenConfig {
    /// Shortest HMAC key the signer will accept (96 bits)
    pub const MIN_SECRET_LEN: usize = 12;
    /// Tokens carry whole-second timestamps
    pub const MIN_EXPIRATION: Duration = Duration::from_secs(1);
    pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(4 * 60 * 60);
    pub const DEFAULT_AUDIENCE: &'static str = "urn:api:client";
    pub const DEFAULT_ISSUER: &'static str = "urn:api:issuer";

    /// Defaults for everything but the secret
    pub fn with_secret(secret: SigningSecret) -> Self {
        TokenConfig {
            secret,
            expiration: Self::DEFAULT_EXPIRATION,
            audience: Self::DEFAULT_AUDIENCE.to_string(),
            issuer: Self::DEFAULT_ISSUER.to_string(),
            algorithm: TokenAlgorithm::HS256,
            allowed_algorithms: vec![TokenAlgorithm::HS256],
            leeway: Duration::ZERO,
        }
    }
}

/// Everything the credential and token core needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub encryption: EncryptionConfig,
    pub token: TokenConfig,
}

impl AuthConfig {
    pub fn new(encryption: EncryptionConfig, token: TokenConfig) -> Result<Self> {
        let config = AuthConfig { encryption, token };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.encryption.iterations == 0 {
            return Err(UserbaseError::InvalidInput("iterations must be positive".to_string()));
        }
        if self.encryption.key_length == 0 || self.encryption.key_length > crate::auth::MAX_KEY_LENGTH {
            return Err(UserbaseError::InvalidInput(format!(
                "key length must be between 1 and {} bytes",
                crate::auth::MAX_KEY_LENGTH
            )));
        }
        if self.token.secret.len() < TokenConfig::MIN_SECRET_LEN {
            return Err(UserbaseError::InvalidInput(format!(
                "token secret must be at least {} bytes",
                TokenConfig::MIN_SECRET_LEN
            )));
        }
        if self.token.expiration < TokenConfig::MIN_EXPIRATION {
            return Err(UserbaseError::InvalidInput(
                "token expiration must be at least one second".to_string(),
            ));
        }
        if self.token.audience.is_empty() || self.token.issuer.is_empty() {
            return Err(UserbaseError::InvalidInput(
                "token audience and issuer must be set".to_string(),
            ));
        }
        if !self.token.allowed_algorithms.contains(&self.token.algorithm) {
            return Err(UserbaseError::InvalidInput(format!(
                "signing algorithm {} is not in the allow-list",
                self.token.algorithm
            )));
        }
        Ok(())
    }
}

/// Parse a human duration such as `4h` or `30m`
pub fn parse_duration(s: &str) -> Result<Duration> {
    humantime::parse_duration(s)
        .map_err(|e| UserbaseError::InvalidInput(format!("invalid duration '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_values() {
        let encryption = EncryptionConfig::default();
        assert_eq!(encryption.salt, "salt");
        assert_eq!(encryption.iterations, 100_000);
        assert_eq!(encryption.key_length, 64);
        assert_eq!(encryption.digest, DigestAlgorithm::Sha512);

        let token = TokenConfig::with_secret(SigningSecret::new("userbase-config-test-secret"));
        assert_eq!(token.expiration, Duration::from_secs(14_400));
        assert_eq!(token.audience, "urn:api:client");
        assert_eq!(token.issuer, "urn:api:issuer");
        assert_eq!(token.allowed_algorithms, vec![TokenAlgorithm::HS256]);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("4h").unwrap(), Duration::from_secs(14_400));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let token = TokenConfig::with_secret(SigningSecret::new("userbase-config-test-secret"));

        let zero_iterations = EncryptionConfig {
            iterations: 0,
            ..Default::default()
        };
        assert!(AuthConfig::new(zero_iterations, token.clone()).is_err());

        let empty_secret = TokenConfig::with_secret(SigningSecret::new(Vec::new()));
        assert!(AuthConfig::new(EncryptionConfig::default(), empty_secret).is_err());

        let mut subsecond = token.clone();
        subsecond.expiration = Duration::from_millis(500);
        assert!(AuthConfig::new(EncryptionConfig::default(), subsecond).is_err());

        let mut not_allowed = token.clone();
        not_allowed.algorithm = TokenAlgorithm::HS512;
        assert!(AuthConfig::new(EncryptionConfig::default(), not_allowed).is_err());

        assert!(AuthConfig::new(EncryptionConfig::default(), token).is_ok());
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let seven = TokenConfig::with_secret(SigningSecret::new("mpp7094"));
        let err = AuthConfig::new(EncryptionConfig::default(), seven).unwrap_err();
        assert!(matches!(err, UserbaseError::InvalidInput(_)));

        let eleven = TokenConfig::with_secret(SigningSecret::new(vec![7u8; 11]));
        assert!(AuthConfig::new(EncryptionConfig::default(), eleven).is_err());

        let twelve = TokenConfig::with_secret(SigningSecret::new(vec![7u8; 12]));
        assert!(AuthConfig::new(EncryptionConfig::default(), twelve).is_ok());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = SigningSecret::new("mpp7094");
        assert_eq!(format!("{:?}", secret), "SigningSecret(7 bytes)");
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("HS384".parse::<TokenAlgorithm>().unwrap(), TokenAlgorithm::HS384);
        assert!("none".parse::<TokenAlgorithm>().is_err());
        assert!("hs256".parse::<TokenAlgorithm>().is_err());
        assert_eq!("SHA256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
    }
}
