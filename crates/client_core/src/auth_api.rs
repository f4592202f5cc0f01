use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::User,
    error::{ApiError, ErrorCode},
    protocol::{Credentials, UserEnvelope},
};
use tokio::sync::RwLock;
use tracing::{info, warn};

const REAUTHENTICATE_MESSAGE: &str = "Please re-authenticate.";

/// Request layer behind the session: fetch the current user, sign in, sign
/// up and clear the session.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `Ok(None)` means there is no active session.
    async fn current_user(&self) -> Result<Option<User>, ApiError>;
    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError>;
    async fn register(&self, credentials: &Credentials) -> Result<User, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
}

pub struct HttpAuthApi {
    http: Client,
    api_url: String,
    auth_url: String,
    token: RwLock<Option<String>>,
}

impl HttpAuthApi {
    pub fn new(api_url: impl Into<String>, auth_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: trim_base_url(api_url.into()),
            auth_url: trim_base_url(auth_url.into()),
            token: RwLock::new(None),
        }
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    async fn authenticate(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<User, ApiError> {
        credentials.validate()?;

        let response = self
            .http
            .post(format!("{}/{endpoint}", self.auth_url))
            .json(credentials)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let envelope: UserEnvelope = response.json().await.map_err(decode_error)?;
        *self.token.write().await = envelope.user.token.clone();
        info!(
            user_id = envelope.user.id.0,
            endpoint,
            "auth: session established"
        );
        Ok(envelope.user)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn current_user(&self) -> Result<Option<User>, ApiError> {
        let Some(token) = self.token().await else {
            info!("auth: no stored session token");
            return Ok(None);
        };

        let response = self
            .http
            .get(format!("{}/me", self.api_url))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("auth: session token rejected; clearing it");
            self.set_token(None).await;
            return Err(ApiError::new(ErrorCode::Unauthorized, REAUTHENTICATE_MESSAGE));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let envelope: UserEnvelope = response.json().await.map_err(decode_error)?;
        Ok(Some(envelope.user))
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        self.authenticate("login", credentials).await
    }

    async fn register(&self, credentials: &Credentials) -> Result<User, ApiError> {
        self.authenticate("register", credentials).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.set_token(None).await;
        info!("auth: session token cleared");
        Ok(())
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn transport_error(err: reqwest::Error) -> ApiError {
    let message = if err.is_connect() {
        format!("failed to connect to server: {err}")
    } else if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        format!("transport failure: {err}")
    };
    ApiError::new(ErrorCode::Internal, message)
}

fn decode_error(err: reqwest::Error) -> ApiError {
    ApiError::new(
        ErrorCode::Internal,
        format!("malformed response from server: {err}"),
    )
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
        return api_error;
    }

    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    };
    ApiError::new(ErrorCode::from_http_status(status.as_u16()), message)
}

#[cfg(test)]
#[path = "tests/auth_api_tests.rs"]
mod tests;
