use serde::{Deserialize, Serialize};

use crate::{
    domain::User,
    error::{ApiError, ErrorCode},
};

/// Body of both `POST /login` and `POST /register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.trim().is_empty() {
            return Err(ApiError::new(ErrorCode::Validation, "username is required"));
        }
        if self.password.is_empty() {
            return Err(ApiError::new(ErrorCode::Validation, "password is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: User,
}
