mod page;

use axum::{Router, routing::{get, put}};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", put(page::update_me))
        .route("/{user_id}", get(page::profile))
        .route("/{user_id}/{tab}", get(page::profile_tab))
}
