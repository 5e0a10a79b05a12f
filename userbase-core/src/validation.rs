//! Request validation
//!
//! Every rule runs and every failing field is reported, so a caller fixing a
//! registration form sees all problems at once.

use crate::{Credentials, FieldViolation, LoginRequest, NewUser, Result, UserChanges, UserbaseError};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));
static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-z]+$").expect("name pattern compiles"));

pub const PASSWORD_MIN_LENGTH: usize = 5;
pub const PASSWORD_MAX_LENGTH: usize = 255;

/// Registration body that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedNewUser {
    pub credentials: Credentials,
    pub first_name: String,
    pub last_name: String,
}

/// Update body that passed validation
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedChanges {
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl std::fmt::Debug for ValidatedChanges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedChanges")
            .field("password", &self.password.as_ref().map(|_| ".."))
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

#[derive(Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn required<'a>(&mut self, field: &str, value: &'a Option<String>) -> Option<&'a str> {
        match value.as_deref() {
            Some(v) => Some(v),
            None => {
                self.0.push(FieldViolation::new(field, "is required"));
                None
            }
        }
    }

    fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !EMAIL_REGEX.is_match(v) {
                self.0.push(FieldViolation::new(field, "must be a valid email"));
            }
        }
    }

    fn password(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            let len = v.chars().count();
            if !(PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&len) {
                self.0.push(FieldViolation::new(
                    field,
                    format!(
                        "length must be between {} and {} characters",
                        PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH
                    ),
                ));
            }
        }
    }

    fn name(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !NAME_REGEX.is_match(v) {
                self.0.push(FieldViolation::new(
                    field,
                    "must be a capitalized word matching ^[A-Z][a-z]+$",
                ));
            }
        }
    }

    fn finish(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(UserbaseError::Validation { validations: self.0 })
        }
    }
}

pub fn validate_new_user(req: &NewUser) -> Result<ValidatedNewUser> {
    let mut violations = Violations::default();

    let username = violations.required("username", &req.username);
    let password = violations.required("password", &req.password);
    let first_name = violations.required("firstName", &req.first_name);
    let last_name = violations.required("lastName", &req.last_name);

    violations.email("username", username);
    violations.password("password", password);
    violations.name("firstName", first_name);
    violations.name("lastName", last_name);
    violations.finish()?;

    match (username, password, first_name, last_name) {
        (Some(username), Some(password), Some(first_name), Some(last_name)) => Ok(ValidatedNewUser {
            credentials: Credentials::new(username, password),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }),
        _ => Err(UserbaseError::Internal("validated fields missing".to_string())),
    }
}

pub fn validate_changes(req: &UserChanges) -> Result<ValidatedChanges> {
    let mut violations = Violations::default();

    if req.password.is_none() && req.first_name.is_none() && req.last_name.is_none() {
        violations.0.push(FieldViolation::new(
            "body",
            "must contain at least one of [password, firstName, lastName]",
        ));
    }

    violations.password("password", req.password.as_deref());
    violations.name("firstName", req.first_name.as_deref());
    violations.name("lastName", req.last_name.as_deref());
    violations.finish()?;

    Ok(ValidatedChanges {
        password: req.password.clone(),
        first_name: req.first_name.clone(),
        last_name: req.last_name.clone(),
    })
}

pub fn validate_login(req: &LoginRequest) -> Result<Credentials> {
    let mut violations = Violations::default();

    let username = violations.required("username", &req.username);
    let password = violations.required("password", &req.password);

    violations.email("username", username);
    violations.password("password", password);
    violations.finish()?;

    match (username, password) {
        (Some(username), Some(password)) => Ok(Credentials::new(username, password)),
        _ => Err(UserbaseError::Internal("validated fields missing".to_string())),
    }
}
