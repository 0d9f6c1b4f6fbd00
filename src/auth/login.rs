use std::sync::Arc;

use axum::{Form, Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;

use crate::{
    AppResult, AppState,
    feed::FeedError,
    models::{User, UserId},
    session::USER_ID,
    store::UserDirectory,
};

use super::{AuthError, Authenticator, MIN_PASSWORD_CHARS, account_email};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    phone_number: String,
    password: String,
    name: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct LoginResponse {
    user: User,
    created: bool,
}

/// Signs in, or creates the account when the provider doesn't know the
/// number. A number that exists with a different password stays rejected.
#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(auth): State<Arc<dyn Authenticator>>,
    State(users): State<Arc<dyn UserDirectory>>,
    session: Session,
    Form(LoginForm { phone_number, password, name }): Form<LoginForm>,
) -> AppResult<Json<LoginResponse>> {
    let user_id = UserId::parse(&phone_number)?;
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(FeedError::InvalidInput(format!(
            "password needs at least {MIN_PASSWORD_CHARS} characters"
        ))
        .into());
    }

    let email = account_email(&user_id);
    let created = match auth.sign_in(&email, &password).await {
        Ok(_) => false,
        Err(AuthError::BadCredentials) => {
            auth.sign_up(&email, &password).await?;
            true
        }
        Err(e) => return Err(e.into()),
    };

    let name = name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());
    let user = match (users.resolve(&user_id).await.map_err(FeedError::from)?, name) {
        (Some(user), None) => user,
        (Some(user), Some(name)) => {
            let user = User { name, ..user };
            users.upsert(&user).await.map_err(FeedError::from)?;
            user
        }
        (None, name) => {
            let user = User::named(user_id.clone(), name.unwrap_or_default());
            users.upsert(&user).await.map_err(FeedError::from)?;
            user
        }
    };

    session.insert(USER_ID, user_id.as_str()).await?;
    info!(%user_id, created, "signed in");

    Ok(Json(LoginResponse { user, created }))
}
