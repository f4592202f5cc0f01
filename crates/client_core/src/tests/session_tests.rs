use super::*;
use async_trait::async_trait;
use shared::error::ErrorCode;
use std::sync::atomic::AtomicUsize;
use tokio::sync::Notify;

use crate::view::ErrorCategory;

struct FakeAuthApi {
    current_user: Result<Option<User>, ApiError>,
    login: Result<User, ApiError>,
    logout_error: Option<ApiError>,
    logout_calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl FakeAuthApi {
    fn signed_out() -> Self {
        Self {
            current_user: Ok(None),
            login: Ok(User::new(1, "alice").with_token("t-1")),
            logout_error: None,
            logout_calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn signed_in(user: User) -> Self {
        Self {
            current_user: Ok(Some(user)),
            ..Self::signed_out()
        }
    }

    fn failing(err: ApiError) -> Self {
        Self {
            current_user: Err(err.clone()),
            login: Err(err.clone()),
            logout_error: Some(err),
            ..Self::signed_out()
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn current_user(&self) -> Result<Option<User>, ApiError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.current_user.clone()
    }

    async fn login(&self, _credentials: &Credentials) -> Result<User, ApiError> {
        self.login.clone()
    }

    async fn register(&self, credentials: &Credentials) -> Result<User, ApiError> {
        self.login
            .clone()
            .map(|user| User::new(user.id.0 + 1, credentials.username.clone()))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        match &self.logout_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn credentials() -> Credentials {
    Credentials::new("alice", "secret")
}

#[tokio::test]
async fn bootstrap_without_session_renders_unauthenticated() {
    let session = AuthSession::new(Arc::new(FakeAuthApi::signed_out()));
    assert_eq!(session.view(), AppView::Loading);

    let handle = session.bootstrap().expect("first bootstrap");
    assert_eq!(session.view(), AppView::Loading);
    handle.await.expect("bootstrap finished");

    assert_eq!(session.view(), AppView::Unauthenticated);
}

#[tokio::test]
async fn bootstrap_with_session_renders_authenticated() {
    let user = User::new(9, "zoe");
    let session = AuthSession::new(Arc::new(FakeAuthApi::signed_in(user.clone())));

    session
        .bootstrap()
        .expect("first bootstrap")
        .await
        .expect("bootstrap finished");

    assert_eq!(session.view(), AppView::Authenticated(user));
}

#[tokio::test]
async fn bootstrap_failure_renders_error_view() {
    let err = ApiError::new(ErrorCode::Internal, "network error");
    let session = AuthSession::new(Arc::new(FakeAuthApi::failing(err.clone())));

    session
        .bootstrap()
        .expect("first bootstrap")
        .await
        .expect("bootstrap finished");

    let AppView::Error(view) = session.view() else {
        panic!("expected error view");
    };
    assert_eq!(view.error(), &err);
    assert_eq!(view.category(), ErrorCategory::Transport);
    assert!(session.controller().is_error());
}

#[tokio::test]
async fn bootstrap_runs_only_once() {
    let session = AuthSession::new(Arc::new(FakeAuthApi::signed_out()));

    let first = session.bootstrap();
    assert!(first.is_some());
    assert!(session.bootstrap().is_none());
}

#[tokio::test]
async fn login_sets_user_directly() {
    let session = AuthSession::new(Arc::new(FakeAuthApi::signed_out()));
    session
        .bootstrap()
        .expect("first bootstrap")
        .await
        .expect("bootstrap finished");

    let user = session.login(&credentials()).await.expect("login");

    assert_eq!(user.username, "alice");
    assert_eq!(session.view(), AppView::Authenticated(user));
}

#[tokio::test]
async fn register_sets_user_directly() {
    let session = AuthSession::new(Arc::new(FakeAuthApi::signed_out()));

    let user = session
        .register(&Credentials::new("bob", "secret"))
        .await
        .expect("register");

    assert_eq!(user, User::new(2, "bob"));
    assert_eq!(session.view(), AppView::Authenticated(user));
}

#[tokio::test]
async fn failed_login_leaves_state_untouched() {
    let err = ApiError::new(ErrorCode::Unauthorized, "invalid credentials");
    let api = FakeAuthApi {
        current_user: Ok(None),
        ..FakeAuthApi::failing(err.clone())
    };
    let session = AuthSession::new(Arc::new(api));
    session
        .bootstrap()
        .expect("first bootstrap")
        .await
        .expect("bootstrap finished");

    let login_err = session.login(&credentials()).await.expect_err("bad login");

    assert_eq!(login_err, err);
    assert_eq!(session.view(), AppView::Unauthenticated);
}

#[tokio::test]
async fn logout_clears_user_after_side_effect() {
    let api = Arc::new(FakeAuthApi::signed_in(User::new(9, "zoe")));
    let session = AuthSession::new(api.clone());
    session
        .bootstrap()
        .expect("first bootstrap")
        .await
        .expect("bootstrap finished");

    session.logout().await;

    assert_eq!(api.logout_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.view(), AppView::Unauthenticated);
    assert_eq!(session.controller().state().data(), Some(&None));
}

#[tokio::test]
async fn logout_clears_user_even_when_side_effect_fails() {
    let api = FakeAuthApi {
        current_user: Ok(Some(User::new(9, "zoe"))),
        ..FakeAuthApi::failing(ApiError::new(ErrorCode::Internal, "offline"))
    };
    let session = AuthSession::new(Arc::new(api));
    session
        .bootstrap()
        .expect("first bootstrap")
        .await
        .expect("bootstrap finished");

    session.logout().await;

    assert_eq!(session.view(), AppView::Unauthenticated);
}

#[tokio::test]
async fn shutdown_while_bootstrapping_discards_late_user() {
    let gate = Arc::new(Notify::new());
    let api = FakeAuthApi::signed_in(User::new(9, "zoe")).gated(gate.clone());
    let session = AuthSession::new(Arc::new(api));

    let handle = session.bootstrap().expect("first bootstrap");
    session.shutdown();
    gate.notify_one();

    let completion = handle.await.expect("no error after shutdown");
    assert!(!completion.was_applied());
    assert_eq!(session.view(), AppView::Loading);
}

#[tokio::test]
async fn slow_bootstrap_result_overwrites_login_while_still_current() {
    let gate = Arc::new(Notify::new());
    let api = FakeAuthApi::signed_out().gated(gate.clone());
    let session = AuthSession::new(Arc::new(api));

    let handle = session.bootstrap().expect("first bootstrap");
    session.login(&credentials()).await.expect("login");
    assert!(matches!(session.view(), AppView::Authenticated(_)));

    gate.notify_one();
    assert!(handle.await.expect("finished").was_applied());
    assert_eq!(session.view(), AppView::Unauthenticated);
}
