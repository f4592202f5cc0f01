//! State record tracked by [`crate::controller::AsyncController`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsyncStatus {
    #[default]
    Idle,
    Pending,
    Resolved,
    Rejected,
}

impl AsyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }
}

/// Snapshot of an async operation's lifecycle.
///
/// Only the four constructors below build values, so `data` is present only
/// when resolved and `error` only when rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsyncState<T, E> {
    status: AsyncStatus,
    data: Option<T>,
    error: Option<E>,
}

impl<T, E> AsyncState<T, E> {
    pub fn idle() -> Self {
        Self {
            status: AsyncStatus::Idle,
            data: None,
            error: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            status: AsyncStatus::Pending,
            data: None,
            error: None,
        }
    }

    pub fn resolved(data: T) -> Self {
        Self {
            status: AsyncStatus::Resolved,
            data: Some(data),
            error: None,
        }
    }

    pub fn rejected(error: E) -> Self {
        Self {
            status: AsyncStatus::Rejected,
            data: None,
            error: Some(error),
        }
    }

    pub fn status(&self) -> AsyncStatus {
        self.status
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    pub fn into_parts(self) -> (AsyncStatus, Option<T>, Option<E>) {
        (self.status, self.data, self.error)
    }

    pub fn is_idle(&self) -> bool {
        self.status == AsyncStatus::Idle
    }

    /// Alias for "pending".
    pub fn is_loading(&self) -> bool {
        self.status == AsyncStatus::Pending
    }

    pub fn is_error(&self) -> bool {
        self.status == AsyncStatus::Rejected
    }

    pub fn is_success(&self) -> bool {
        self.status == AsyncStatus::Resolved
    }
}

impl<T, E> Default for AsyncState<T, E> {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type State = AsyncState<u32, String>;

    #[test]
    fn classifiers_follow_status() {
        let cases = [
            (State::idle(), [true, false, false, false]),
            (State::pending(), [false, true, false, false]),
            (State::resolved(1), [false, false, false, true]),
            (State::rejected("boom".into()), [false, false, true, false]),
        ];

        for (state, [idle, loading, error, success]) in cases {
            assert_eq!(state.is_idle(), idle, "{:?}", state.status());
            assert_eq!(state.is_loading(), loading, "{:?}", state.status());
            assert_eq!(state.is_error(), error, "{:?}", state.status());
            assert_eq!(state.is_success(), success, "{:?}", state.status());
        }
    }

    #[test]
    fn resolved_and_rejected_never_carry_both_payloads() {
        let resolved = State::resolved(5);
        assert_eq!(resolved.data(), Some(&5));
        assert!(resolved.error().is_none());

        let rejected = State::rejected("nope".into());
        assert!(rejected.data().is_none());
        assert_eq!(rejected.error().map(String::as_str), Some("nope"));
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&State::resolved(3)).expect("serialize");
        assert_eq!(json, r#"{"status":"resolved","data":3,"error":null}"#);
        assert_eq!(AsyncStatus::Pending.as_str(), "pending");
    }
}
