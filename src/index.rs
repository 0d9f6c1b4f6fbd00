use axum::{
    Json, debug_handler,
    extract::{Query, State},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    feed::{FeedMode, FeedQueryEngine, SearchSessions},
    models::Quote,
    session,
};

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// Everything the signed-in user said or heard.
#[debug_handler(state = AppState)]
pub(crate) async fn home(
    State(engine): State<FeedQueryEngine>,
    session: Session,
) -> AppResult<Json<Vec<Quote>>> {
    let viewer = session::viewer(&session).await?;
    let quotes = engine.resolve_feed(&viewer, &viewer, FeedMode::Combined).await?;
    Ok(Json(quotes))
}

#[debug_handler(state = AppState)]
pub(crate) async fn search(
    State(engine): State<FeedQueryEngine>,
    State(searches): State<SearchSessions>,
    session: Session,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> AppResult<Json<Vec<Quote>>> {
    let viewer = session::viewer(&session).await?;
    let quotes = searches.issue(&viewer).resolve(&engine, &q).await?;
    Ok(Json(quotes))
}
