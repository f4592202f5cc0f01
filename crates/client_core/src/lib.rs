//! Client-side session core: an async lifecycle controller that tracks the
//! "fetch current user" request, the auth request layer, and the view
//! selection the front end renders from.

pub mod async_state;
pub mod auth_api;
pub mod controller;
pub mod session;
pub mod view;

pub use async_state::{AsyncState, AsyncStatus};
pub use auth_api::{AuthApi, HttpAuthApi};
pub use controller::{AsyncController, Completion, ControllerError, DisposeGuard, RunHandle};
pub use session::{AuthSession, SessionController};
pub use view::{AppView, ErrorCategory, ErrorView};
