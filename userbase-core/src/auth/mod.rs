//! Credential and token core for userbase
//!
//! This module implements:
//! - PBKDF2 password digests
//! - Constant-time digest comparison
//! - HMAC-signed JWT issuance and verification
//! - `Authorization` header parsing (Basic and Bearer)
//! - The ownership guard for mutating requests
//! - The login flow tying the above to a user store

pub mod authenticator;
pub mod guard;
pub mod hasher;
pub mod header;
pub mod jwt;
pub mod timing;

pub use authenticator::*;
pub use guard::*;
pub use hasher::*;
pub use header::*;
pub use jwt::*;
pub use timing::*;
