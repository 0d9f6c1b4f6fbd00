use std::sync::Arc;

use axum::{Json, debug_handler, extract::State, http::StatusCode};
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    models::{Quote, QuoteDraft},
    session,
    store::{QuoteStore, UserDirectory},
};

#[debug_handler(state = AppState)]
pub(crate) async fn new_quote(
    State(quotes): State<Arc<dyn QuoteStore>>,
    State(users): State<Arc<dyn UserDirectory>>,
    session: Session,
    Json(draft): Json<QuoteDraft>,
) -> AppResult<(StatusCode, Json<Quote>)> {
    let author = session::viewer(&session).await?;
    tracing::debug!(%author, "new quote");

    let quote = super::create_quote(quotes.as_ref(), users.as_ref(), draft).await?;
    Ok((StatusCode::CREATED, Json(quote)))
}
