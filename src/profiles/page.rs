use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use crate::{
    AppResult, AppState,
    feed::{FeedError, FeedMode, FeedQueryEngine},
    models::{Quote, User, UserId},
    session,
    store::UserDirectory,
};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ProfileTab {
    Said,
    Heard,
}

impl From<ProfileTab> for FeedMode {
    fn from(tab: ProfileTab) -> Self {
        match tab {
            ProfileTab::Said => FeedMode::SaidOnly,
            ProfileTab::Heard => FeedMode::HeardOnly,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct ProfileUpdate {
    name: Option<String>,
    #[serde(rename = "profileImageUrl")]
    profile_image_url: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn profile(
    Path(user_id): Path<UserId>,
    State(users): State<Arc<dyn UserDirectory>>,
    session: Session,
) -> AppResult<Json<User>> {
    session::viewer(&session).await?;

    let Some(user) = users.resolve(&user_id).await.map_err(FeedError::from)? else {
        return Err(FeedError::NotFound(user_id).into());
    };
    Ok(Json(user))
}

#[debug_handler(state = AppState)]
pub(crate) async fn profile_tab(
    Path((subject, tab)): Path<(UserId, ProfileTab)>,
    State(engine): State<FeedQueryEngine>,
    session: Session,
) -> AppResult<Json<Vec<Quote>>> {
    let viewer = session::viewer(&session).await?;
    let quotes = engine.resolve_feed(&viewer, &subject, tab.into()).await?;
    Ok(Json(quotes))
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_me(
    State(users): State<Arc<dyn UserDirectory>>,
    session: Session,
    Json(ProfileUpdate { name, profile_image_url }): Json<ProfileUpdate>,
) -> AppResult<Json<User>> {
    let viewer = session::viewer(&session).await?;
    let Some(mut user) = users.resolve(&viewer).await.map_err(FeedError::from)? else {
        return Err(FeedError::NotFound(viewer).into());
    };

    if let Some(name) = name {
        let name = name.trim();
        if name.is_empty() {
            return Err(FeedError::InvalidInput("name can't be blank".to_owned()).into());
        }
        user.name = name.to_owned();
    }
    if let Some(url) = profile_image_url {
        user.profile_image_url = url;
    }

    users.upsert(&user).await.map_err(FeedError::from)?;
    tracing::info!(id = %user.id, "profile updated");
    Ok(Json(user))
}
