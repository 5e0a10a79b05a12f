//! User management operations
//!
//! Runs each request through validation, authentication results, the
//! ownership guard and the store in the same order for every caller.

use crate::auth::{authorize, Authenticator, SignedToken};
use crate::store::UserStore;
use crate::validation::{validate_changes, validate_login, validate_new_user};
use crate::{
    AuthConfig, LoginRequest, NewUser, Principal, Result, User, UserChanges, UserDraft, UserId,
};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    auth: Authenticator,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, config: &AuthConfig) -> Self {
        let auth = Authenticator::new(store.clone(), config);
        UserService { store, auth }
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// Register a user; the digest is computed before anything is stored
    pub async fn register(&self, request: &NewUser) -> Result<User> {
        let validated = validate_new_user(request)?;
        let password = self.auth.hasher().hash(&validated.credentials.plain_password)?;

        let user = self
            .store
            .insert(UserDraft {
                username: validated.credentials.username,
                password,
                first_name: validated.first_name,
                last_name: validated.last_name,
            })
            .await?;

        info!(user = %user.id, "user registered");
        Ok(user)
    }

    pub async fn get(&self, id: UserId) -> Result<User> {
        self.store.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.store.list().await
    }

    /// Apply `changes` to the caller's own account.
    ///
    /// The digest is recomputed only when a new password is supplied.
    pub async fn update(&self, principal: &Principal, id: UserId, changes: &UserChanges) -> Result<User> {
        let changes = validate_changes(changes)?;
        authorize(principal, id)?;

        let mut user = self.store.get(id).await?;
        if let Some(password) = &changes.password {
            user.password = self.auth.hasher().hash(password)?;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }

        let updated = self.store.update(user).await?;
        info!(user = %updated.id, "user updated");
        Ok(updated)
    }

    /// Delete the caller's own account
    pub async fn delete(&self, principal: &Principal, id: UserId) -> Result<()> {
        authorize(principal, id)?;
        self.store.get(id).await?;
        self.store.delete(id).await?;
        info!(user = %id, "user deleted");
        Ok(())
    }

    /// Password login from a JSON body
    pub async fn login(&self, request: &LoginRequest) -> Result<SignedToken> {
        let credentials = validate_login(request)?;
        self.auth.login(&credentials).await
    }

    /// Password login from an `Authorization: Basic` header
    pub async fn login_basic(&self, header: Option<&str>) -> Result<SignedToken> {
        self.auth.login_basic(header).await
    }

    pub async fn authenticate_basic(&self, header: Option<&str>) -> Result<Principal> {
        self.auth.authenticate_basic(header).await
    }

    pub fn authenticate_bearer(&self, header: Option<&str>) -> Result<Principal> {
        self.auth.authenticate_bearer(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncryptionConfig, SigningSecret, TokenConfig};
    use crate::store::MemoryUserStore;
    use crate::ErrorKind;

    fn service() -> UserService {
        let config = AuthConfig::new(
            EncryptionConfig {
                iterations: 10,
                ..Default::default()
            },
            TokenConfig::with_secret(SigningSecret::new(crate::test_utils::TEST_SECRET)),
        )
        .unwrap();
        UserService::new(Arc::new(MemoryUserStore::new()), &config)
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: Some(username.to_string()),
            password: Some("secret123".to_string()),
            first_name: Some("Alice".to_string()),
            last_name: Some("Liddell".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_stores_digest_not_plaintext() {
        let service = service();
        let user = service.register(&new_user("alice@example.com")).await.unwrap();

        assert_ne!(user.password.as_str(), "secret123");
        assert_eq!(user.password, service.authenticator().hasher().hash("secret123").unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_login() {
        let service = service();
        service.register(&new_user("alice@example.com")).await.unwrap();
        let err = service.register(&new_user("alice@example.com")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_update_rehashes_only_with_password() {
        let service = service();
        let user = service.register(&new_user("alice@example.com")).await.unwrap();
        let principal = user.principal();

        let renamed = service
            .update(
                &principal,
                user.id,
                &UserChanges {
                    first_name: Some("Alicia".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.first_name, "Alicia");
        assert_eq!(renamed.password, user.password);

        let rekeyed = service
            .update(
                &principal,
                user.id,
                &UserChanges {
                    password: Some("another1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_ne!(rekeyed.password, user.password);
        assert_eq!(rekeyed.first_name, "Alicia");
    }

    #[tokio::test]
    async fn test_mutations_require_ownership() {
        let service = service();
        let alice = service.register(&new_user("alice@example.com")).await.unwrap();
        let bob = service.register(&new_user("bob@example.com")).await.unwrap();

        let changes = UserChanges {
            last_name: Some("Builder".to_string()),
            ..Default::default()
        };
        let err = service.update(&alice.principal(), bob.id, &changes).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let err = service.delete(&alice.principal(), bob.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        service.delete(&bob.principal(), bob.id).await.unwrap();
        assert_eq!(service.list().await.unwrap(), vec![alice]);
    }

    #[tokio::test]
    async fn test_delete_missing_self_is_not_found() {
        let service = service();
        let user = service.register(&new_user("alice@example.com")).await.unwrap();
        service.delete(&user.principal(), user.id).await.unwrap();

        let err = service.delete(&user.principal(), user.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_login_paths() {
        let service = service();
        service.register(&new_user("alice@example.com")).await.unwrap();

        let token = service
            .login(&LoginRequest {
                username: Some("alice@example.com".to_string()),
                password: Some("secret123".to_string()),
            })
            .await
            .unwrap();
        let principal = service
            .authenticate_bearer(Some(&format!("Bearer {}", token.token())))
            .unwrap();
        assert_eq!(principal.username, "alice@example.com");

        let header = crate::auth::basic_header_value("alice@example.com", "wrong");
        let err = service.login_basic(Some(&header)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
