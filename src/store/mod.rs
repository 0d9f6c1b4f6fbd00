//! Storage seams the feed engine reads through.
//!
//! [`QuoteStore`] only promises the two query primitives a document store
//! gives you for free: equality on the speaker and membership on the
//! listener list. Anything more selective is done by the caller.

mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewQuote, Quote, QuoteId, User, UserId};

pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("store unreachable: {0}")]
    Unreachable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn find_by_speaker(&self, speaker: &UserId) -> StoreResult<Vec<Quote>>;

    async fn find_by_listener(&self, listener: &UserId) -> StoreResult<Vec<Quote>>;

    async fn insert(&self, quote: &NewQuote) -> StoreResult<QuoteId>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn resolve(&self, id: &UserId) -> StoreResult<Option<User>>;

    /// Users whose name starts with `prefix`, ordered by name.
    async fn search_by_name_prefix(&self, prefix: &str) -> StoreResult<Vec<User>>;

    async fn upsert(&self, user: &User) -> StoreResult<()>;
}
