//! Core data models, credential handling and user operations for userbase

pub mod auth;
pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{AuthConfig, DigestAlgorithm, EncryptionConfig, SigningSecret, TokenAlgorithm, TokenConfig};
pub use error::*;
pub use service::UserService;
pub use store::{MemoryUserStore, UserStore};
pub use types::*;

/// Result type alias for userbase operations
pub type Result<T> = std::result::Result<T, UserbaseError>;
