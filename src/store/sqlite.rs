use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    types::Json,
};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{NewQuote, Quote, QuoteId, User, UserId};

use super::{QuoteStore, StoreError, StoreResult, UserDirectory};

// unique: users.id
// unique: quotes.id
// unique: quote_listeners.(quote_id, user_id)
//
// SQLite can't filter on membership of a JSON list, so every listener also
// gets a row in quote_listeners, written in the quote's transaction.
const SCHEMA: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        profile_image_url TEXT NOT NULL DEFAULT '',
        phone_number TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS users_by_name ON users (name)",
    "CREATE TABLE IF NOT EXISTS quotes (
        id TEXT PRIMARY KEY NOT NULL,
        text TEXT NOT NULL,
        said_by TEXT NOT NULL,
        heard_by TEXT NOT NULL,
        creation_date INTEGER NOT NULL,
        heard_by_string TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS quotes_by_speaker ON quotes (said_by)",
    "CREATE TABLE IF NOT EXISTS quote_listeners (
        quote_id TEXT NOT NULL REFERENCES quotes (id),
        user_id TEXT NOT NULL,
        PRIMARY KEY (quote_id, user_id)
    )",
    "CREATE INDEX IF NOT EXISTS listeners_by_user ON quote_listeners (user_id)",
];

const QUOTE_COLUMNS: &str = "q.id, q.text, q.said_by, q.heard_by, q.creation_date, q.heard_by_string";

/// Upper bound appended to a name prefix; same range trick as a Firestore
/// `start(at:)`/`end(at:)` name query.
const PREFIX_CEILING: char = '\u{f8ff}';

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<SqliteStore> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // each connection to :memory: is its own database
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        let store = SqliteStore { pool };
        store.init_schema().await?;

        info!(url, in_memory, "connected quote store");
        Ok(store)
    }

    pub async fn in_memory() -> StoreResult<SqliteStore> {
        SqliteStore::connect("sqlite::memory:", 1).await
    }

    async fn init_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[derive(FromRow)]
struct QuoteRow {
    id: String,
    text: String,
    said_by: String,
    heard_by: Json<Vec<String>>,
    creation_date: i64,
    heard_by_string: String,
}

impl QuoteRow {
    fn into_quote(self) -> StoreResult<Quote> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: self.id.clone(),
            reason,
        };

        let id = Uuid::parse_str(&self.id).map_err(|e| corrupt(e.to_string()))?;
        let said_by = UserId::parse(&self.said_by).map_err(|e| corrupt(e.to_string()))?;
        let heard_by = self
            .heard_by
            .iter()
            .map(|raw| UserId::parse(raw).map_err(|e| corrupt(e.to_string())))
            .collect::<StoreResult<Vec<_>>>()?;
        let creation_date = OffsetDateTime::from_unix_timestamp(self.creation_date)
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Quote {
            id: QuoteId(id),
            text: self.text,
            said_by,
            heard_by,
            creation_date,
            heard_by_display: self.heard_by_string,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    profile_image_url: String,
    phone_number: String,
}

impl UserRow {
    fn into_user(self) -> StoreResult<User> {
        let id = UserId::parse(&self.id).map_err(|e| StoreError::Corrupt {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;

        Ok(User {
            id,
            name: self.name,
            profile_image_url: self.profile_image_url,
            phone_number: self.phone_number,
        })
    }
}

fn into_quotes(rows: Vec<QuoteRow>) -> StoreResult<Vec<Quote>> {
    rows.into_iter().map(QuoteRow::into_quote).collect()
}

#[async_trait]
impl QuoteStore for SqliteStore {
    async fn find_by_speaker(&self, speaker: &UserId) -> StoreResult<Vec<Quote>> {
        let rows: Vec<QuoteRow> = sqlx::query_as(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes q WHERE q.said_by=?"
        ))
        .bind(speaker.as_str())
        .fetch_all(&self.pool)
        .await?;

        debug!(%speaker, count = rows.len(), "speaker query");
        into_quotes(rows)
    }

    async fn find_by_listener(&self, listener: &UserId) -> StoreResult<Vec<Quote>> {
        let rows: Vec<QuoteRow> = sqlx::query_as(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes q
             JOIN quote_listeners l ON l.quote_id=q.id
             WHERE l.user_id=?"
        ))
        .bind(listener.as_str())
        .fetch_all(&self.pool)
        .await?;

        debug!(%listener, count = rows.len(), "listener query");
        into_quotes(rows)
    }

    async fn insert(&self, quote: &NewQuote) -> StoreResult<QuoteId> {
        let id = QuoteId::generate();
        let heard_by: Vec<String> = quote.heard_by.iter().map(ToString::to_string).collect();

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO quotes (id,text,said_by,heard_by,creation_date,heard_by_string) VALUES (?,?,?,?,?,?)")
            .bind(id.to_string())
            .bind(&quote.text)
            .bind(quote.said_by.as_str())
            .bind(Json(heard_by))
            .bind(quote.creation_date.unix_timestamp())
            .bind(&quote.heard_by_display)
            .execute(&mut *tx)
            .await?;

        for listener in &quote.heard_by {
            sqlx::query("INSERT OR IGNORE INTO quote_listeners (quote_id,user_id) VALUES (?,?)")
                .bind(id.to_string())
                .bind(listener.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(%id, said_by = %quote.said_by, "inserted quote");
        Ok(id)
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn resolve(&self, id: &UserId) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT id,name,profile_image_url,phone_number FROM users WHERE id=?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(UserRow::into_user)
            .transpose()
    }

    async fn search_by_name_prefix(&self, prefix: &str) -> StoreResult<Vec<User>> {
        let ceiling = format!("{prefix}{PREFIX_CEILING}");
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id,name,profile_image_url,phone_number FROM users
             WHERE name >= ? AND name < ?
             ORDER BY name",
        )
        .bind(prefix)
        .bind(&ceiling)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn upsert(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id,name,profile_image_url,phone_number) VALUES (?,?,?,?)
             ON CONFLICT(id) DO UPDATE SET
                name=excluded.name,
                profile_image_url=excluded.profile_image_url,
                phone_number=excluded.phone_number",
        )
        .bind(user.id.as_str())
        .bind(&user.name)
        .bind(&user.profile_image_url)
        .bind(&user.phone_number)
        .execute(&self.pool)
        .await?;

        debug!(id = %user.id, "upserted user");
        Ok(())
    }
}
