//! Persistence layer: snippet and user repositories.
//!
//! Handlers depend on the [`SnippetRepository`] and [`UserRepository`] traits. The
//! SQLite implementations back the running server; the in-memory ones in
//! [`memory`] stand in for them in tests.

pub mod memory;
pub mod snippets;
pub mod users;

use async_trait::async_trait;
use sqlx::Error as SqlxError;
use thiserror::Error;
use time::OffsetDateTime;

use crate::password::PasswordError;

pub use memory::{MemorySnippetStore, MemoryUserStore};
pub use snippets::SqliteSnippetStore;
pub use users::SqliteUserStore;

/// Maximum number of snippets returned by [`SnippetRepository::latest`].
pub const LATEST_SNIPPETS_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no matching record found")]
    NotFound,
    #[error("duplicate email")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("storage failure: {0}")]
    Storage(#[from] SqlxError),
    #[error("password hashing failure: {0}")]
    PasswordHash(#[from] PasswordError),
    #[error("stored timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: OffsetDateTime,
    pub expires: OffsetDateTime,
}

/// Account profile. The password hash never leaves the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created: OffsetDateTime,
}

#[async_trait]
pub trait SnippetRepository: Send + Sync {
    /// Store a snippet expiring `expires_days` days from now and return its id.
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i64,
    ) -> Result<i64, ModelError>;

    /// Fetch a snippet that has not yet expired.
    async fn get(&self, id: i64) -> Result<Snippet, ModelError>;

    /// Up to [`LATEST_SNIPPETS_LIMIT`] live snippets, newest id first.
    async fn latest(&self) -> Result<Vec<Snippet>, ModelError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, name: &str, email: &str, password: &str) -> Result<(), ModelError>;

    async fn get(&self, id: i64) -> Result<User, ModelError>;

    /// Resolve credentials to a user id.
    ///
    /// Unknown emails and wrong passwords both fail with
    /// [`ModelError::InvalidCredentials`].
    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, ModelError>;

    async fn exists(&self, id: i64) -> Result<bool, ModelError>;

    async fn password_update(
        &self,
        id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ModelError>;
}

pub(crate) fn timestamp_to_datetime(timestamp: i64) -> Result<OffsetDateTime, ModelError> {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|_| ModelError::InvalidTimestamp(timestamp))
}

/// Detect SQLite's `UNIQUE constraint failed` error for the given `table.column`.
pub(crate) fn is_unique_violation(err: &SqlxError, column: &str) -> bool {
    match err {
        SqlxError::Database(db_err) => {
            let unique_code = db_err
                .code()
                .map(|code| code.as_ref() == "2067" || code.as_ref() == "1555")
                .unwrap_or(false);
            unique_code && db_err.message().contains(column)
        }
        _ => false,
    }
}
