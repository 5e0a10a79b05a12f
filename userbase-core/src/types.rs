//! Core data types for userbase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric user identifier, assigned by the store on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    pub fn new(id: u64) -> Self {
        UserId(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = crate::UserbaseError;

    fn from_str(s: &str) -> crate::Result<Self> {
        s.parse::<u64>().map(UserId).map_err(|_| {
            crate::UserbaseError::Validation {
                validations: vec![crate::FieldViolation::new("id", "must be a number")],
            }
        })
    }
}

/// Hex encoded output of the credential hasher.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        PasswordDigest(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// A registered user.
///
/// The digest is skipped on serialization so a `User` can be handed straight
/// to a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: PasswordDigest,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    /// Claims safe to embed in a token
    pub fn claims(&self) -> crate::auth::UserClaims {
        crate::auth::UserClaims {
            id: self.id.get(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// A user that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub username: String,
    pub password: PasswordDigest,
    pub first_name: String,
    pub last_name: String,
}

impl UserDraft {
    pub fn with_id(self, id: UserId) -> User {
        User {
            id,
            username: self.username,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
        }
    }
}

/// Username and plaintext password, straight from a request
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub plain_password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, plain_password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            plain_password: plain_password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Identity attached to a request once authentication succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: UserId,
    pub username: String,
}

/// Registration body
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Partial update body; at least one field must be present
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Login body
#[derive(Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for UserChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserChanges")
            .field("password", &self.password.as_ref().map(|_| ".."))
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
