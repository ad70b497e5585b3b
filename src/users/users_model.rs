use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{RESERVED_USERNAMES, USERNAME_MAX_LEN, USERNAME_MIN_LEN};
use crate::errors::{Error, Result, ValidationError};

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[a-z0-9._]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref UPPERCASE_RE: Regex = Regex::new(r"[A-Z]").unwrap();
    static ref LOWERCASE_RE: Regex = Regex::new(r"[a-z]").unwrap();
    static ref DIGIT_RE: Regex = Regex::new(r"\d").unwrap();
    static ref SPECIAL_RE: Regex = Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).unwrap();
}

/// Domain model representing a user account. The credential hash never
/// leaves the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub registered_at: DateTime<Utc>,
}

/// Input model for registering a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// Normalizes and validates the registration data, returning the
    /// canonical form (lowercased username and email).
    pub fn sanitized(mut self) -> Result<Self> {
        self.username = normalize_username(&self.username)?;
        self.email = normalize_email(&self.email)?;
        validate_password(&self.password)?;
        Ok(self)
    }

    /// SHA-256 hex digest of the password.
    pub fn credential_hash(&self) -> String {
        hash_password(&self.password)
    }
}

/// Full credentials, required for destructive account operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl UserCredentials {
    /// Normalizes and validates the credentials the same way registration
    /// does, so the hash comparison is apples-to-apples.
    pub fn sanitized(mut self) -> Result<Self> {
        self.username = normalize_username(&self.username)?;
        self.email = normalize_email(&self.email)?;
        validate_password(&self.password)?;
        Ok(self)
    }

    pub fn credential_hash(&self) -> String {
        hash_password(&self.password)
    }
}

/// Database model for users
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserDB {
    #[diesel(skip_insertion)]
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub registered_at: NaiveDateTime,
}

impl From<UserDB> for User {
    fn from(db: UserDB) -> Self {
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            registered_at: db.registered_at.and_utc(),
        }
    }
}

/// Validates a username against the registration rules and returns the
/// canonical (trimmed, lowercased) form.
pub(crate) fn normalize_username(value: &str) -> Result<String> {
    let value = value.trim().to_lowercase();

    if value.len() < USERNAME_MIN_LEN || value.len() > USERNAME_MAX_LEN {
        return Err(Error::Validation(ValidationError::InvalidInput(format!(
            "Username must be between {} and {} characters.",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        ))));
    }

    if !USERNAME_RE.is_match(&value) {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Username can only contain letters, numbers, dots or underscores.".to_string(),
        )));
    }

    if value.starts_with(['.', '_']) || value.ends_with(['.', '_']) {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Username can't start or end with a dot or underscore.".to_string(),
        )));
    }

    if RESERVED_USERNAMES.contains(&value.as_str()) {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "This username is reserved.".to_string(),
        )));
    }

    Ok(value)
}

/// Trims and lowercases a username used to address an existing account.
/// Lookups don't re-run the registration rules; an unknown name simply
/// resolves to not-found.
pub(crate) fn normalize_username_lookup(value: &str) -> Result<String> {
    let value = value.trim().to_lowercase();
    if value.is_empty() {
        return Err(Error::Validation(ValidationError::MissingField(
            "username".to_string(),
        )));
    }
    Ok(value)
}

pub(crate) fn normalize_email(value: &str) -> Result<String> {
    let value = value.trim().to_lowercase();

    if !EMAIL_RE.is_match(&value) {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Invalid email address.".to_string(),
        )));
    }

    Ok(value)
}

pub(crate) fn validate_password(value: &str) -> Result<()> {
    if value.len() <= 8 || value.len() >= 64 {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Password must be at least nine characters long.".to_string(),
        )));
    }

    if !UPPERCASE_RE.is_match(value) {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Password must contain at least one uppercase letter.".to_string(),
        )));
    }

    if !LOWERCASE_RE.is_match(value) {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Password must contain at least one lowercase letter.".to_string(),
        )));
    }

    if !DIGIT_RE.is_match(value) {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Password must contain at least one digit.".to_string(),
        )));
    }

    if !SPECIAL_RE.is_match(value) {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Password must contain at least one special character.".to_string(),
        )));
    }

    Ok(())
}

pub(crate) fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
