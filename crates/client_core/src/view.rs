//! Picks what the front end should show for a given session state.

use std::fmt;

use serde::Serialize;
use shared::{
    domain::User,
    error::{ApiError, ErrorCode},
};

use crate::async_state::{AsyncState, AsyncStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum AppView {
    Loading,
    Error(ErrorView),
    Authenticated(User),
    Unauthenticated,
}

impl AppView {
    pub fn from_state(state: AsyncState<Option<User>, ApiError>) -> Self {
        match state.into_parts() {
            (AsyncStatus::Rejected, _, Some(error)) => Self::Error(ErrorView::new(error)),
            (AsyncStatus::Resolved, Some(Some(user)), _) => Self::Authenticated(user),
            (AsyncStatus::Resolved, _, _) => Self::Unauthenticated,
            _ => Self::Loading,
        }
    }
}

impl fmt::Display for AppView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "loading session..."),
            Self::Error(view) => write!(f, "error: {}", view.hint()),
            Self::Authenticated(user) => {
                write!(f, "signed in as {} (user {})", user.username, user.id.0)
            }
            Self::Unauthenticated => write!(f, "signed out"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

/// Full-page error fallback. The underlying error is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    error: ApiError,
    category: ErrorCategory,
}

impl ErrorView {
    pub fn new(error: ApiError) -> Self {
        let category = classify(&error);
        Self { error, category }
    }

    pub fn error(&self) -> &ApiError {
        &self.error
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == ErrorCategory::Auth
    }

    pub fn hint(&self) -> String {
        match self.category {
            ErrorCategory::Auth => format!("{} Sign in again.", self.error.message),
            ErrorCategory::Transport => {
                "Server unreachable; check URL/network and retry.".to_string()
            }
            ErrorCategory::Validation => format!("Invalid request: {}", self.error.message),
            ErrorCategory::Unknown => format!("Something went wrong: {}", self.error.message),
        }
    }
}

fn classify(error: &ApiError) -> ErrorCategory {
    match error.code {
        ErrorCode::Unauthorized | ErrorCode::Forbidden => return ErrorCategory::Auth,
        ErrorCode::Validation => return ErrorCategory::Validation,
        ErrorCode::RateLimited => return ErrorCategory::Transport,
        ErrorCode::NotFound | ErrorCode::Internal => {}
    }

    let lower = error.message.to_ascii_lowercase();
    if lower.contains("failed to connect")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
        || lower.contains("network")
        || lower.contains("unavailable")
    {
        ErrorCategory::Transport
    } else {
        ErrorCategory::Unknown
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
