//! User store contract and an in-memory implementation

use crate::{Result, User, UserDraft, UserId, UserbaseError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Resource name reported in not-found errors
pub const USERS_RESOURCE: &str = "users";

/// Persistence collaborator for user records.
///
/// Missing ids and logins fail with [`UserbaseError::NotFound`]; inserting a
/// login that already exists fails with [`UserbaseError::Conflict`].
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Store a new user and assign its id
    async fn insert(&self, user: UserDraft) -> Result<User>;

    async fn get(&self, id: UserId) -> Result<User>;

    async fn get_by_login(&self, username: &str) -> Result<User>;

    /// Replace an existing user
    async fn update(&self, user: User) -> Result<User>;

    async fn delete(&self, id: UserId) -> Result<()>;

    /// All users ordered by id
    async fn list(&self) -> Result<Vec<User>>;
}

pub fn login_conflict(username: &str) -> UserbaseError {
    UserbaseError::Conflict(format!("login '{}' is already registered", username))
}

#[derive(Default)]
struct MemoryTables {
    last_id: u64,
    users: BTreeMap<UserId, User>,
    logins: HashMap<String, UserId>,
}

/// Process-local store, used by tests and `--in-memory` servers
#[derive(Default)]
pub struct MemoryUserStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: UserDraft) -> Result<User> {
        let mut tables = self.tables.write();
        if tables.logins.contains_key(&user.username) {
            return Err(login_conflict(&user.username));
        }

        tables.last_id += 1;
        let user = user.with_id(UserId::new(tables.last_id));
        tables.logins.insert(user.username.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<User> {
        self.tables
            .read()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| UserbaseError::not_found(USERS_RESOURCE, id))
    }

    async fn get_by_login(&self, username: &str) -> Result<User> {
        let tables = self.tables.read();
        tables
            .logins
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned()
            .ok_or_else(|| UserbaseError::not_found(USERS_RESOURCE, username))
    }

    async fn update(&self, user: User) -> Result<User> {
        let mut tables = self.tables.write();
        let previous = tables
            .users
            .get(&user.id)
            .map(|u| u.username.clone())
            .ok_or_else(|| UserbaseError::not_found(USERS_RESOURCE, user.id))?;

        if previous != user.username {
            if tables.logins.contains_key(&user.username) {
                return Err(login_conflict(&user.username));
            }
            tables.logins.remove(&previous);
            tables.logins.insert(user.username.clone(), user.id);
        }

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        let mut tables = self.tables.write();
        let removed = tables
            .users
            .remove(&id)
            .ok_or_else(|| UserbaseError::not_found(USERS_RESOURCE, id))?;
        tables.logins.remove(&removed.username);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().users.values().cloned().collect())
    }
}
