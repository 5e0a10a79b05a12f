//! User table over a fjall partition
//!
//! Layout of the `users` partition:
//! - `meta:last_id` holds the last assigned id (big-endian u64)
//! - `user:{id:020}` holds the JSON record, so a prefix scan yields id order
//! - `login:{username}` maps a login back to its id
//!
//! Writers hold the engine's write lock across the read-check-commit sequence
//! and commit through a single batch, so the login index never drifts from
//! the records.

use async_trait::async_trait;
use fjall::{Partition, PartitionCreateOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use userbase_core::store::{login_conflict, UserStore, USERS_RESOURCE};
use userbase_core::*;

use crate::StorageEngine;

const PARTITION_NAME: &str = "users";
const LAST_ID_KEY: &[u8] = b"meta:last_id";
const USER_PREFIX: &str = "user:";

/// On-disk form of a user; unlike `User` it keeps the digest
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    id: u64,
    username: String,
    password: String,
    first_name: String,
    last_name: String,
}

impl From<&User> for StoredUser {
    fn from(user: &User) -> Self {
        StoredUser {
            id: user.id.get(),
            username: user.username.clone(),
            password: user.password.as_str().to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

impl From<StoredUser> for User {
    fn from(stored: StoredUser) -> Self {
        User {
            id: UserId::new(stored.id),
            username: stored.username,
            password: PasswordDigest::from_hex(stored.password),
            first_name: stored.first_name,
            last_name: stored.last_name,
        }
    }
}

/// `UserStore` persisted in the engine's keyspace
pub struct FjallUserStore {
    engine: StorageEngine,
    partition: Arc<Partition>,
}

impl FjallUserStore {
    pub(crate) fn open(engine: StorageEngine) -> Result<Self> {
        let partition = engine
            .keyspace()
            .open_partition(PARTITION_NAME, PartitionCreateOptions::default())
            .map_err(storage_error)?;

        Ok(FjallUserStore {
            engine,
            partition: Arc::new(partition),
        })
    }

    fn read_user(&self, id: UserId) -> Result<Option<User>> {
        match self.partition.get(user_key(id)).map_err(storage_error)? {
            Some(bytes) => {
                let stored: StoredUser = serde_json::from_slice(&bytes)?;
                Ok(Some(stored.into()))
            }
            None => Ok(None),
        }
    }

    fn read_login(&self, username: &str) -> Result<Option<UserId>> {
        self.partition
            .get(login_key(username))
            .map_err(storage_error)?
            .map(|bytes| decode_id(&bytes))
            .transpose()
    }

    fn last_id(&self) -> Result<u64> {
        match self.partition.get(LAST_ID_KEY).map_err(storage_error)? {
            Some(bytes) => decode_id(&bytes).map(|id| id.get()),
            None => Ok(0),
        }
    }

    fn commit(&self, batch: fjall::Batch) -> Result<()> {
        batch.commit().map_err(storage_error)?;
        self.engine.persist()
    }
}

#[async_trait]
impl UserStore for FjallUserStore {
    async fn insert(&self, draft: UserDraft) -> Result<User> {
        let _writer = self.engine.write_lock();

        if self.read_login(&draft.username)?.is_some() {
            return Err(login_conflict(&draft.username));
        }

        let id = self.last_id()? + 1;
        let user = draft.with_id(UserId::new(id));
        let record = serde_json::to_vec(&StoredUser::from(&user))?;

        let mut batch = self.engine.keyspace().batch();
        batch.insert(&self.partition, LAST_ID_KEY.to_vec(), id.to_be_bytes().to_vec());
        batch.insert(&self.partition, user_key(user.id), record);
        batch.insert(&self.partition, login_key(&user.username), id.to_be_bytes().to_vec());
        self.commit(batch)?;

        debug!(user = %user.id, "user record inserted");
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<User> {
        self.read_user(id)?
            .ok_or_else(|| UserbaseError::not_found(USERS_RESOURCE, id))
    }

    async fn get_by_login(&self, username: &str) -> Result<User> {
        let not_found = || UserbaseError::not_found(USERS_RESOURCE, username);
        let id = self.read_login(username)?.ok_or_else(not_found)?;
        self.read_user(id)?.ok_or_else(not_found)
    }

    async fn update(&self, user: User) -> Result<User> {
        let _writer = self.engine.write_lock();

        let previous = self
            .read_user(user.id)?
            .ok_or_else(|| UserbaseError::not_found(USERS_RESOURCE, user.id))?;

        let mut batch = self.engine.keyspace().batch();
        if previous.username != user.username {
            if self.read_login(&user.username)?.is_some() {
                return Err(login_conflict(&user.username));
            }
            batch.remove(&self.partition, login_key(&previous.username));
            batch.insert(
                &self.partition,
                login_key(&user.username),
                user.id.get().to_be_bytes().to_vec(),
            );
        }
        batch.insert(
            &self.partition,
            user_key(user.id),
            serde_json::to_vec(&StoredUser::from(&user))?,
        );
        self.commit(batch)?;

        debug!(user = %user.id, "user record updated");
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        let _writer = self.engine.write_lock();

        let existing = self
            .read_user(id)?
            .ok_or_else(|| UserbaseError::not_found(USERS_RESOURCE, id))?;

        let mut batch = self.engine.keyspace().batch();
        batch.remove(&self.partition, user_key(id));
        batch.remove(&self.partition, login_key(&existing.username));
        self.commit(batch)?;

        debug!(user = %id, "user record deleted");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let mut users = Vec::new();

        for item in self.partition.prefix(USER_PREFIX) {
            let (_key, value) = item.map_err(|e| UserbaseError::Storage(format!("Scan error: {}", e)))?;
            let stored: StoredUser = serde_json::from_slice(&value)?;
            users.push(stored.into());
        }

        Ok(users)
    }
}

fn storage_error(e: impl std::fmt::Display) -> UserbaseError {
    UserbaseError::Storage(e.to_string())
}

fn user_key(id: UserId) -> Vec<u8> {
    format!("{}{:020}", USER_PREFIX, id.get()).into_bytes()
}

fn login_key(username: &str) -> Vec<u8> {
    format!("login:{}", username).into_bytes()
}

fn decode_id(bytes: &[u8]) -> Result<UserId> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| UserbaseError::Storage(format!("corrupt id of {} bytes", bytes.len())))?;
    Ok(UserId::new(u64::from_be_bytes(raw)))
}
