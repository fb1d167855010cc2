//! Credential endpoints: `POST /auth/local` and `POST /auth/local/register`.

use repair_desk_core::UserRecord;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::error::ApiError;
use crate::http::ApiClient;

const LOGIN_PATH: &[&str] = &["auth", "local"];
const REGISTER_PATH: &[&str] = &["auth", "local", "register"];

#[derive(Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct RawAuthResponse {
    jwt: String,
    user: UserRecord,
}

/// A successful login: the session token and the signed-in user.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    /// JWT to send as `Authorization: Bearer`.
    pub jwt: SecretString,
    /// The user the token belongs to.
    pub user: UserRecord,
}

impl From<RawAuthResponse> for AuthResponse {
    fn from(raw: RawAuthResponse) -> Self {
        Self {
            jwt: SecretString::from(raw.jwt),
            user: raw.user,
        }
    }
}

/// Backend authentication endpoints.
#[derive(Debug, Clone)]
pub struct AuthGateway {
    api: ApiClient,
}

impl AuthGateway {
    /// Gateway issuing requests through `api`.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Exchange credentials for a token.
    ///
    /// Does not touch the session; storing the result is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Backend` with the backend's message when the
    /// credentials are rejected, or any transport/parse error.
    #[instrument(skip(self, password), fields(identifier = %identifier))]
    pub async fn login(
        &self,
        identifier: &str,
        password: &SecretString,
    ) -> Result<AuthResponse, ApiError> {
        let request = LoginRequest {
            identifier,
            password: password.expose_secret(),
        };

        let raw: RawAuthResponse = self.api.post(LOGIN_PATH, &request).await?;
        tracing::info!(user_id = %raw.user.id, "Credentials accepted");
        Ok(raw.into())
    }

    /// Create an account. The backend's response is returned as is.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Backend` when the backend refuses the registration,
    /// or any transport/parse error.
    #[instrument(skip(self, password), fields(username = %username, email = %email))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<Value, ApiError> {
        let request = RegisterRequest {
            username,
            email,
            password: password.expose_secret(),
        };

        self.api.post(REGISTER_PATH, &request).await
    }
}
