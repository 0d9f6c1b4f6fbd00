use async_trait::async_trait;
use axum::{
    Router, debug_handler,
    routing::{get, post},
};
use thiserror::Error;
use tower_sessions::Session;
use tracing::info;

use crate::{AppResult, AppState, models::UserId, session::USER_ID};

mod clients;
mod login;

pub use clients::FirebaseAuth;

/// Accounts are email/password under the hood; the phone number is the
/// local part.
pub const ACCOUNT_DOMAIN: &str = "quotesapp.com";
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not signed in")]
    SignedOut,

    #[error("wrong phone number or password")]
    BadCredentials,

    #[error("auth provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Malformed(#[from] anyhow::Error),
}

/// The account provider. Returns the provider's own id for the account,
/// which the app doesn't key anything on.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<String, AuthError>;
}

pub fn account_email(user_id: &UserId) -> String {
    format!("{user_id}@{ACCOUNT_DOMAIN}")
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login::login))
        .route("/logout", get(logout))
}

#[debug_handler]
async fn logout(session: Session) -> AppResult<()> {
    if let Some(user_id) = session.get::<String>(USER_ID).await? {
        info!(%user_id, "signed out");
    }
    session.flush().await?;
    Ok(())
}
