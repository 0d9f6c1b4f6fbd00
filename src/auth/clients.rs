use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::GetField;

use super::{AuthError, Authenticator};

const IDENTITY_TOOLKIT: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

/// Email/password accounts on Firebase Auth, through the Identity Toolkit
/// REST API.
#[derive(Clone)]
pub struct FirebaseAuth {
    api_key: String,
    http_client: reqwest::Client,
}

impl FirebaseAuth {
    pub fn new(api_key: impl Into<String>) -> FirebaseAuth {
        FirebaseAuth {
            api_key: api_key.into(),
            http_client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{IDENTITY_TOOLKIT}/accounts:{action}?key={}", self.api_key)
    }

    async fn call(&self, action: &str, email: &str, password: &str) -> Result<Value, AuthError> {
        let response = self
            .http_client
            .post(self.endpoint(action))
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;
        if status.is_success() {
            return Ok(body);
        }

        let message = body.get_obj_field("error")?.get_str_field("message")?;
        debug!(action, %status, %message, "identity toolkit rejected request");
        Err(classify(status, &message))
    }
}

/// Firebase reports failures as an upper-case code, sometimes followed by
/// " : detail".
fn classify(status: StatusCode, message: &str) -> AuthError {
    let code = message.split(" : ").next().unwrap_or(message);
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "EMAIL_EXISTS" => {
            AuthError::BadCredentials
        }
        _ => AuthError::Provider(format!("{status}: {message}")),
    }
}

#[async_trait]
impl Authenticator for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let body = self.call("signInWithPassword", email, password).await?;
        Ok(body.get_str_field("localId")?)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let body = self.call("signUp", email, password).await?;
        Ok(body.get_str_field("localId")?)
    }
}
