//! Signed access tokens
//!
//! HMAC-signed JWTs carrying a user's public claims. The issuer stamps
//! audience, issuer, issue time and expiry; the verifier enforces structure,
//! the algorithm allow-list, the signature, expiry, audience and issuer, in
//! that order.

use crate::config::{TokenAlgorithm, TokenConfig};
use crate::{AuthFailure, Principal, Result, UserId, UserbaseError};
use jwt_simple::prelude::*;
use jwt_simple::JWTError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Public claims embedded in a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaims {
    pub id: u64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserClaims {
    pub fn principal(&self) -> Principal {
        Principal {
            id: UserId::new(self.id),
            username: self.username.clone(),
        }
    }
}

/// A freshly minted token
#[derive(Debug, Clone)]
pub struct SignedToken {
    token: String,
    issued_at: u64,
    expires_at: u64,
}

impl SignedToken {
    /// Get the compact token string
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn into_token(self) -> String {
        self.token
    }

    /// Issue time, seconds since the epoch
    pub fn issued_at(&self) -> u64 {
        self.issued_at
    }

    /// Expiry, seconds since the epoch
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }
}

/// Claims of a token that passed every verification step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    pub subject: UserClaims,
    pub audience: String,
    pub issuer: String,
    pub issued_at: Option<u64>,
    pub expires_at: u64,
}

impl VerifiedClaims {
    pub fn principal(&self) -> Principal {
        self.subject.principal()
    }
}

enum MacKey {
    HS256(HS256Key),
    HS384(HS384Key),
    HS512(HS512Key),
}

impl MacKey {
    fn new(algorithm: TokenAlgorithm, secret: &[u8]) -> Self {
        match algorithm {
            TokenAlgorithm::HS256 => MacKey::HS256(HS256Key::from_bytes(secret)),
            TokenAlgorithm::HS384 => MacKey::HS384(HS384Key::from_bytes(secret)),
            TokenAlgorithm::HS512 => MacKey::HS512(HS512Key::from_bytes(secret)),
        }
    }

    fn authenticate(&self, claims: JWTClaims<UserClaims>) -> Result<String> {
        let signed = match self {
            MacKey::HS256(key) => key.authenticate(claims),
            MacKey::HS384(key) => key.authenticate(claims),
            MacKey::HS512(key) => key.authenticate(claims),
        };
        signed.map_err(|e| UserbaseError::Internal(format!("token signing failed: {}", e)))
    }

    fn verify(
        &self,
        token: &str,
        options: VerificationOptions,
    ) -> std::result::Result<JWTClaims<UserClaims>, AuthFailure> {
        let verified = match self {
            MacKey::HS256(key) => key.verify_token::<UserClaims>(token, Some(options)),
            MacKey::HS384(key) => key.verify_token::<UserClaims>(token, Some(options)),
            MacKey::HS512(key) => key.verify_token::<UserClaims>(token, Some(options)),
        };

        verified.map_err(|e| match e.downcast_ref::<JWTError>() {
            Some(JWTError::InvalidAuthenticationTag) => AuthFailure::BadSignature,
            Some(JWTError::TokenHasExpired) => AuthFailure::Expired,
            Some(JWTError::AlgorithmMismatch) => AuthFailure::AlgorithmNotAllowed,
            _ => {
                debug!("token rejected by verifier: {}", e);
                AuthFailure::Malformed
            }
        })
    }
}

fn jwt_duration(duration: Duration) -> jwt_simple::prelude::Duration {
    jwt_simple::prelude::Duration::from_secs(duration.as_secs())
}

fn reject(cause: AuthFailure) -> UserbaseError {
    debug!(%cause, "token verification failed");
    UserbaseError::authentication(cause)
}

/// Mints tokens for authenticated users
pub struct TokenIssuer {
    key: MacKey,
    algorithm: TokenAlgorithm,
    expiration: Duration,
    audience: String,
    issuer: String,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        TokenIssuer {
            key: MacKey::new(config.algorithm, config.secret.as_bytes()),
            algorithm: config.algorithm,
            expiration: config.expiration,
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
        }
    }

    /// Sign `subject` with the configured audience, issuer and lifetime
    pub fn issue(&self, subject: &UserClaims) -> Result<SignedToken> {
        self.issue_at(subject, Clock::now_since_epoch())
    }

    fn issue_at(&self, subject: &UserClaims, now: UnixTimeStamp) -> Result<SignedToken> {
        let valid_for = jwt_duration(self.expiration);
        let expires_at = now + valid_for;

        let mut claims = Claims::with_custom_claims(subject.clone(), valid_for)
            .with_subject(subject.id)
            .with_audience(&self.audience)
            .with_issuer(&self.issuer);
        claims.issued_at = Some(now);
        claims.invalid_before = Some(now);
        claims.expires_at = Some(expires_at);

        let token = self.key.authenticate(claims)?;

        Ok(SignedToken {
            token,
            issued_at: now.as_secs(),
            expires_at: expires_at.as_secs(),
        })
    }

    pub fn algorithm(&self) -> TokenAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// Checks tokens presented on requests
pub struct TokenVerifier {
    secret: crate::config::SigningSecret,
    allowed_algorithms: Vec<TokenAlgorithm>,
    audience: String,
    issuer: String,
    leeway: Duration,
}

impl TokenVerifier {
    pub fn new(config: &TokenConfig) -> Self {
        TokenVerifier {
            secret: config.secret.clone(),
            allowed_algorithms: config.allowed_algorithms.clone(),
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
            leeway: config.leeway,
        }
    }

    /// Verify `token` and return its claims
    pub fn verify(&self, token: &str) -> Result<VerifiedClaims> {
        // structure: three dot separated segments with a decodable header
        if token.split('.').count() != 3 {
            return Err(reject(AuthFailure::Malformed));
        }
        let metadata = Token::decode_metadata(token).map_err(|_| reject(AuthFailure::Malformed))?;

        // algorithm allow-list, checked before any key is touched
        let algorithm = metadata
            .algorithm()
            .parse::<TokenAlgorithm>()
            .ok()
            .filter(|alg| self.allowed_algorithms.contains(alg))
            .ok_or_else(|| reject(AuthFailure::AlgorithmNotAllowed))?;

        // signature, then expiry
        let options = VerificationOptions {
            time_tolerance: Some(jwt_duration(self.leeway)),
            ..Default::default()
        };
        let claims = MacKey::new(algorithm, self.secret.as_bytes())
            .verify(token, options)
            .map_err(reject)?;
        let expires_at = claims
            .expires_at
            .ok_or_else(|| reject(AuthFailure::Malformed))?;

        let audience = match &claims.audiences {
            Some(Audiences::AsString(aud)) if *aud == self.audience => aud.clone(),
            Some(Audiences::AsSet(set)) if set.contains(&self.audience) => self.audience.clone(),
            _ => return Err(reject(AuthFailure::AudienceMismatch)),
        };

        let issuer = match &claims.issuer {
            Some(iss) if *iss == self.issuer => iss.clone(),
            _ => return Err(reject(AuthFailure::IssuerMismatch)),
        };

        Ok(VerifiedClaims {
            subject: claims.custom,
            audience,
            issuer,
            issued_at: claims.issued_at.map(|d| d.as_secs()),
            expires_at: expires_at.as_secs(),
        })
    }
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("allowed_algorithms", &self.allowed_algorithms)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}
