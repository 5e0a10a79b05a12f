//! Login and request authentication

use crate::auth::{
    extract_basic_credentials, extract_bearer_token, CredentialHasher, SignedToken, TokenIssuer,
    TokenVerifier,
};
use crate::store::UserStore;
use crate::{AuthConfig, AuthFailure, Credentials, Principal, Result, User, UserbaseError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Establishes who is calling.
///
/// Password logins go through the store, hasher and comparator; bearer
/// tokens only through the verifier.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn UserStore>,
    hasher: Arc<CredentialHasher>,
    issuer: Arc<TokenIssuer>,
    verifier: Arc<TokenVerifier>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn UserStore>, config: &AuthConfig) -> Self {
        Authenticator {
            store,
            hasher: Arc::new(CredentialHasher::new(&config.encryption)),
            issuer: Arc::new(TokenIssuer::new(&config.token)),
            verifier: Arc::new(TokenVerifier::new(&config.token)),
        }
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Look the user up and check the password.
    ///
    /// An unknown login and a wrong password produce the same error kind and
    /// public message; only the logged cause differs. The hasher runs on both
    /// paths so they take comparable time.
    pub async fn check_credentials(&self, credentials: &Credentials) -> Result<User> {
        let user = match self.store.get_by_login(&credentials.username).await {
            Ok(user) => user,
            Err(UserbaseError::NotFound { .. }) => {
                self.hasher.hash(&credentials.plain_password)?;
                return Err(self.reject(AuthFailure::UnknownUser));
            }
            Err(e) => return Err(e),
        };

        if !self.hasher.verify(&credentials.plain_password, &user.password)? {
            return Err(self.reject(AuthFailure::InvalidCredentials));
        }

        Ok(user)
    }

    /// Check credentials and mint a token carrying the user's public claims
    pub async fn login(&self, credentials: &Credentials) -> Result<SignedToken> {
        let user = self.check_credentials(credentials).await?;
        let token = self.issuer.issue(&user.claims())?;
        debug!(user = %user.id, expires_at = token.expires_at(), "token issued");
        Ok(token)
    }

    /// Log in with the credentials of an `Authorization: Basic` header
    pub async fn login_basic(&self, header: Option<&str>) -> Result<SignedToken> {
        let credentials = extract_basic_credentials(header).map_err(|e| self.logged(e))?;
        self.login(&credentials).await
    }

    /// Authenticate an `Authorization: Basic` header
    pub async fn authenticate_basic(&self, header: Option<&str>) -> Result<Principal> {
        let credentials = extract_basic_credentials(header).map_err(|e| self.logged(e))?;
        let user = self.check_credentials(&credentials).await?;
        Ok(user.principal())
    }

    /// Authenticate an `Authorization: Bearer` header
    pub fn authenticate_bearer(&self, header: Option<&str>) -> Result<Principal> {
        let token = extract_bearer_token(header).map_err(|e| self.logged(e))?;
        let claims = self.verifier.verify(token).map_err(|e| self.logged(e))?;
        Ok(claims.principal())
    }

    fn reject(&self, cause: AuthFailure) -> UserbaseError {
        self.logged(UserbaseError::authentication(cause))
    }

    fn logged(&self, err: UserbaseError) -> UserbaseError {
        if let Some(cause) = err.auth_failure() {
            warn!(%cause, "authentication failed");
        }
        err
    }
}
