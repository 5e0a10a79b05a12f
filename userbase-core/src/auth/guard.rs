//! Ownership check for mutating requests

use crate::{Principal, Result, UserId, UserbaseError};
use tracing::warn;

/// Allow the request only when the caller owns the resource.
///
/// Runs after authentication; a verified caller acting on somebody else's
/// account gets an authorization error, not an authentication error.
pub fn authorize(principal: &Principal, resource_owner: UserId) -> Result<()> {
    if principal.id == resource_owner {
        return Ok(());
    }

    warn!(
        caller = %principal.id,
        owner = %resource_owner,
        "authorization denied"
    );
    Err(UserbaseError::authorization(format!(
        "user {} may not act on user {}",
        principal.id, resource_owner
    )))
}
