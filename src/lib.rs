pub mod appresult;
pub mod auth;
pub mod config;
pub mod feed;
pub mod index;
pub mod models;
pub mod profiles;
pub mod quotes;
pub mod session;
pub mod store;

use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use serde_json::Value;

pub use appresult::{AppError, AppResult};

use auth::Authenticator;
use feed::{FeedQueryEngine, SearchSessions};
use store::{QuoteStore, UserDirectory};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub engine: FeedQueryEngine,
    pub searches: SearchSessions,
    pub quotes: Arc<dyn QuoteStore>,
    pub users: Arc<dyn UserDirectory>,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(
        quotes: Arc<dyn QuoteStore>,
        users: Arc<dyn UserDirectory>,
        auth: Arc<dyn Authenticator>,
    ) -> AppState {
        AppState {
            engine: FeedQueryEngine::new(quotes.clone(), users.clone()),
            searches: SearchSessions::default(),
            quotes,
            users,
            auth,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index::home))
        .route("/search", get(index::search))
        .route("/q", post(quotes::new_quote))
        .merge(auth::router())
        .nest("/p", profiles::router())
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> anyhow::Result<String>;
    fn get_obj_field(&self, field: &str) -> anyhow::Result<&Value>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> anyhow::Result<String> {
        Ok(
            self.get(field)
            .ok_or_else(|| anyhow!("expected {field} in {self}"))?
            .as_str()
            .ok_or_else(|| anyhow!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }

    fn get_obj_field(&self, field: &str) -> anyhow::Result<&Value> {
        self.get(field)
            .ok_or_else(|| anyhow!("expected {field} in {self}"))
    }
}
