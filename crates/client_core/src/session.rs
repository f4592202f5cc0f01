use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{domain::User, error::ApiError, protocol::Credentials};
use tracing::{info, warn};

use crate::{
    auth_api::AuthApi,
    controller::{AsyncController, RunHandle},
    view::AppView,
};

pub type SessionController = AsyncController<Option<User>, ApiError>;

/// Session bootstrap and the login/register/logout flows built on one
/// [`SessionController`]. `None` data means "no active session".
pub struct AuthSession {
    api: Arc<dyn AuthApi>,
    controller: SessionController,
    bootstrapped: AtomicBool,
}

impl AuthSession {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        Self {
            api,
            controller: SessionController::new(),
            bootstrapped: AtomicBool::new(false),
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Starts the "fetch current user" request. Only the first call does
    /// anything; later calls return `None`.
    pub fn bootstrap(&self) -> Option<RunHandle<Option<User>, ApiError>> {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            warn!("session: bootstrap already started; ignoring");
            return None;
        }

        info!("session: fetching current user");
        let api = Arc::clone(&self.api);
        Some(self.controller.run(async move { api.current_user().await }))
    }

    /// Failures go back to the caller and leave the session state as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let user = self.api.login(credentials).await?;
        self.controller.set_data(Some(user.clone()));
        Ok(user)
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let user = self.api.register(credentials).await?;
        self.controller.set_data(Some(user.clone()));
        Ok(user)
    }

    /// Clears the session even when the API side effect fails.
    pub async fn logout(&self) {
        if let Err(err) = self.api.logout().await {
            warn!(error = %err, "session: clearing remote session failed");
        }
        self.controller.set_data(None);
    }

    pub fn view(&self) -> AppView {
        AppView::from_state(self.controller.state())
    }

    pub fn shutdown(&self) {
        self.controller.dispose();
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
