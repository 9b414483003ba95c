use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Registration payload after the plain-text password has been hashed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    pub fn register(
        username: impl Into<String>,
        email: impl Into<String>,
        password: &SecretString,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: hash_password(password),
            created_at: Utc::now(),
        }
    }
}

/// Hex-encoded SHA-256 digest of the password.
pub fn hash_password(password: &SecretString) -> String {
    let digest = Sha256::digest(password.expose_secret().as_bytes());
    format!("{digest:x}")
}

/// Login credential handed back to clients. Not a real session token.
pub fn placeholder_token(user_id: UserId) -> String {
    format!("mock-jwt-token-{user_id}")
}
