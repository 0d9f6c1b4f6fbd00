use tower_sessions::Session;

use crate::{AppResult, auth::AuthError, models::UserId};

pub const USER_ID: &str = "user_id";

/// The signed-in user. Every handler threads this into the engine
/// explicitly.
pub async fn viewer(session: &Session) -> AppResult<UserId> {
    let Some(raw) = session.get::<String>(USER_ID).await? else {
        return Err(AuthError::SignedOut.into());
    };

    Ok(UserId::parse(&raw)?)
}
