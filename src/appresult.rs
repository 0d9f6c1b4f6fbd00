use axum::{http::StatusCode, response::{IntoResponse, Response}};
use tracing::{error, warn};

use crate::{auth::AuthError, feed::FeedError};

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<FeedError>() {
            return match err {
                FeedError::NotFound(_) => StatusCode::NOT_FOUND,
                FeedError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                FeedError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                FeedError::Cancelled => StatusCode::CONFLICT,
            };
        }

        if let Some(err) = self.0.downcast_ref::<AuthError>() {
            return match err {
                AuthError::SignedOut | AuthError::BadCredentials => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_GATEWAY,
            };
        }

        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, "{:#}", self.0);
            (status, format!("{}\n\n{}", self.0, self.0.backtrace())).into_response()
        } else {
            warn!(%status, "{}", self.0);
            (status, self.0.to_string()).into_response()
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
