//! Error types for userbase

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why an identity could not be established.
///
/// The cause is for logs only. Callers always see the same public message,
/// so an unknown user is indistinguishable from a wrong password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization` header on the request
    MissingHeader,
    /// Header present but with another scheme than the one expected
    SchemeMismatch,
    /// Basic payload is not base64, not UTF-8 or has no colon
    MalformedCredentials,
    /// Basic payload decoded to an empty username or password
    MissingCredentials,
    /// Login does not exist
    UnknownUser,
    /// Password digest did not match
    InvalidCredentials,
    /// Token is not a compact JWS
    Malformed,
    /// Token header names an algorithm outside the allow-list
    AlgorithmNotAllowed,
    /// Token signature did not verify
    BadSignature,
    Expired,
    AudienceMismatch,
    IssuerMismatch,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailure::MissingHeader => "header not found",
            AuthFailure::SchemeMismatch => "header scheme mismatch",
            AuthFailure::MalformedCredentials => "malformed credentials",
            AuthFailure::MissingCredentials => "missing credentials",
            AuthFailure::UnknownUser => "unknown user",
            AuthFailure::InvalidCredentials => "invalid credentials",
            AuthFailure::Malformed => "malformed",
            AuthFailure::AlgorithmNotAllowed => "algorithm not allowed",
            AuthFailure::BadSignature => "bad signature",
            AuthFailure::Expired => "expired",
            AuthFailure::AudienceMismatch => "audience mismatch",
            AuthFailure::IssuerMismatch => "issuer mismatch",
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field that failed request validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldViolation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Discriminator used by the transport layer to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Authorization,
    NotFound,
    Validation,
    Conflict,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    /// Name reported to callers in error bodies
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "AuthenticationError",
            ErrorKind::Authorization => "AuthorizationError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Conflict => "ConflictError",
            ErrorKind::InvalidInput => "InvalidInputError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

#[derive(Error, Debug)]
pub enum UserbaseError {
    #[error("The user could not be authenticated! ({cause})")]
    Authentication { cause: AuthFailure },

    #[error("The user is not authorized! ({cause})")]
    Authorization { cause: String },

    #[error("Resource '{resource_name}' with identifier '{resource_id}' not found")]
    NotFound {
        resource_name: String,
        resource_id: String,
    },

    #[error("Invalid parameters: {} violation(s)", validations.len())]
    Validation { validations: Vec<FieldViolation> },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UserbaseError {
    pub fn authentication(cause: AuthFailure) -> Self {
        UserbaseError::Authentication { cause }
    }

    pub fn authorization(cause: impl Into<String>) -> Self {
        UserbaseError::Authorization {
            cause: cause.into(),
        }
    }

    pub fn not_found(resource_name: impl Into<String>, resource_id: impl fmt::Display) -> Self {
        UserbaseError::NotFound {
            resource_name: resource_name.into(),
            resource_id: resource_id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            UserbaseError::Authentication { .. } => ErrorKind::Authentication,
            UserbaseError::Authorization { .. } => ErrorKind::Authorization,
            UserbaseError::NotFound { .. } => ErrorKind::NotFound,
            UserbaseError::Validation { .. } => ErrorKind::Validation,
            UserbaseError::Conflict(_) => ErrorKind::Conflict,
            UserbaseError::InvalidInput(_) => ErrorKind::InvalidInput,
            UserbaseError::Storage(_)
            | UserbaseError::Serialization(_)
            | UserbaseError::Io(_)
            | UserbaseError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to hand back to a caller.
    ///
    /// Authentication and authorization causes, storage details and
    /// serialization errors stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            UserbaseError::Authentication { .. } => "The user could not be authenticated!".to_string(),
            UserbaseError::Authorization { .. } => "The user is not authorized!".to_string(),
            UserbaseError::Validation { .. } => "Invalid parameters".to_string(),
            UserbaseError::NotFound { .. }
            | UserbaseError::Conflict(_)
            | UserbaseError::InvalidInput(_) => self.to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Internal cause of an authentication failure, if that is what this is
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            UserbaseError::Authentication { cause } => Some(*cause),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_message_hides_cause() {
        let unknown = UserbaseError::authentication(AuthFailure::UnknownUser);
        let wrong = UserbaseError::authentication(AuthFailure::InvalidCredentials);

        assert_eq!(unknown.public_message(), wrong.public_message());
        assert!(!unknown.public_message().contains("unknown"));
        assert_eq!(unknown.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn not_found_carries_resource() {
        let err = UserbaseError::not_found("users", 42);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.public_message(),
            "Resource 'users' with identifier '42' not found"
        );
    }

    #[test]
    fn storage_errors_are_opaque() {
        let err = UserbaseError::Storage("partition poisoned at /var/data".to_string());
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.public_message(), "Internal server error");
    }
}
