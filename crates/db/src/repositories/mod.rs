use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Decode, Row, Sqlite, Type};
use thiserror::Error;

use campusmart_core::domain::item::{ItemId, Listing, NewItem};
use campusmart_core::domain::user::{NewUser, User, UserId};
use campusmart_core::errors::ApplicationError;
use campusmart_core::lifecycle::gateway::GatewayError;

pub mod item;
pub mod memory;
pub mod request;
pub mod user;

pub use item::SqlItemRepository;
pub use memory::InMemoryMarketplace;
pub use request::SqlRequestGateway;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db_error)) => db_error.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<RepositoryError> for GatewayError {
    fn from(value: RepositoryError) -> Self {
        if value.is_unique_violation() {
            return Self::DuplicateOpenRequest;
        }
        Self::Backend(value.to_string())
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        Self::Persistence(value.to_string())
    }
}

/// Entry in the public user directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<UserId, RepositoryError>;
    async fn exists_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, RepositoryError>;
    async fn find_by_credentials(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn email_taken_by_other(
        &self,
        email: &str,
        user_id: UserId,
    ) -> Result<bool, RepositoryError>;
    /// Returns `false` when no user carries `id`.
    async fn update_email(&self, id: UserId, email: &str) -> Result<bool, RepositoryError>;
    async fn list(&self) -> Result<Vec<UserSummary>, RepositoryError>;
}

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn create(&self, item: NewItem) -> Result<ItemId, RepositoryError>;
    async fn find_listing(&self, id: ItemId) -> Result<Option<Listing>, RepositoryError>;
    /// Available items, newest first.
    async fn list_available(&self) -> Result<Vec<Listing>, RepositoryError>;
    /// Every item the seller posted regardless of status, newest first.
    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Listing>, RepositoryError>;
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

/// Fixed-width UTC text, so lexical order in SQL equals chronological order.
pub(crate) fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    // rows written by hand through sqlite's CURRENT_TIMESTAMP
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| RepositoryError::Decode(format!("timestamp `{raw}`: {e}")))
}
