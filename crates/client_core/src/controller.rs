//! Lifecycle controller for one externally supplied async operation at a time.
//!
//! Every `run` takes a new generation. A completion writes to state only if
//! its generation is still current and the controller has not been disposed;
//! anything else is dropped silently. Operations are never aborted, only
//! their effect on state is suppressed.

use std::{
    fmt,
    future::Future,
    ops::Deref,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    task::{Context, Poll},
};

use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

use crate::async_state::{AsyncState, AsyncStatus};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("tracked operation panicked before producing an outcome")]
    OperationPanicked,
    #[error("tracked operation was cancelled before producing an outcome")]
    OperationCancelled,
}

/// What happened to an operation's outcome once it finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T, E> {
    /// The outcome was written to the controller's state.
    Applied(Result<T, E>),
    /// The operation was superseded or the controller was disposed.
    Discarded(Result<T, E>),
}

impl<T, E> Completion<T, E> {
    pub fn was_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn outcome(&self) -> &Result<T, E> {
        match self {
            Self::Applied(outcome) | Self::Discarded(outcome) => outcome,
        }
    }

    pub fn into_outcome(self) -> Result<T, E> {
        match self {
            Self::Applied(outcome) | Self::Discarded(outcome) => outcome,
        }
    }
}

struct Inner<T, E> {
    generation: u64,
    disposed: bool,
    state: watch::Sender<AsyncState<T, E>>,
}

impl<T, E> Inner<T, E> {
    fn publish(&self, next: AsyncState<T, E>, reason: &'static str) {
        debug!(
            generation = self.generation,
            status = next.status().as_str(),
            reason,
            "async controller transition"
        );
        self.state.send_replace(next);
    }
}

fn lock_inner<T, E>(shared: &Mutex<Inner<T, E>>) -> MutexGuard<'_, Inner<T, E>> {
    // State is only ever replaced wholesale, so a poisoned lock still holds a valid record.
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply_completion<T: Clone, E: Clone>(
    shared: &Mutex<Inner<T, E>>,
    generation: u64,
    outcome: &Result<T, E>,
) -> bool {
    let inner = lock_inner(shared);
    if inner.disposed {
        debug!(generation, "discarding completion: controller disposed");
        return false;
    }
    if inner.generation != generation {
        debug!(
            generation,
            current = inner.generation,
            "discarding completion: operation superseded"
        );
        return false;
    }

    let next = match outcome {
        Ok(data) => AsyncState::resolved(data.clone()),
        Err(error) => AsyncState::rejected(error.clone()),
    };
    inner.publish(next, "completed");
    true
}

/// Shared handle to a single [`AsyncState`]. Clones observe and mutate the
/// same state.
pub struct AsyncController<T, E> {
    shared: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> Clone for AsyncController<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Default for AsyncController<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> AsyncController<T, E> {
    pub fn new() -> Self {
        Self::with_initial_state(AsyncState::idle())
    }

    pub fn with_initial_state(initial: AsyncState<T, E>) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            shared: Arc::new(Mutex::new(Inner {
                generation: 0,
                disposed: false,
                state,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T, E>> {
        lock_inner(&self.shared)
    }

    pub fn status(&self) -> AsyncStatus {
        self.lock().state.borrow().status()
    }

    pub fn is_idle(&self) -> bool {
        self.status() == AsyncStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status() == AsyncStatus::Pending
    }

    pub fn is_error(&self) -> bool {
        self.status() == AsyncStatus::Rejected
    }

    pub fn is_success(&self) -> bool {
        self.status() == AsyncStatus::Resolved
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Receiver that is notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<AsyncState<T, E>> {
        self.lock().state.subscribe()
    }

    /// Forces `resolved` with `data`. An operation that is still current
    /// keeps its right to write when it completes.
    pub fn set_data(&self, data: T) {
        self.overwrite(AsyncState::resolved(data), "set_data");
    }

    /// Forces `rejected` with `error`. See [`Self::set_data`].
    pub fn set_error(&self, error: E) {
        self.overwrite(AsyncState::rejected(error), "set_error");
    }

    /// Returns to `idle` and supersedes any operation in flight.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            debug!("ignoring reset on disposed controller");
            return;
        }
        inner.generation = inner.generation.wrapping_add(1);
        inner.publish(AsyncState::idle(), "reset");
    }

    /// Marks the controller as torn down. Later mutator calls and completions
    /// are silent no-ops. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        inner.generation = inner.generation.wrapping_add(1);
        debug!(generation = inner.generation, "async controller disposed");
    }

    /// Disposes the controller when the returned guard is dropped, including
    /// during unwinding.
    pub fn dispose_guard(&self) -> DisposeGuard<T, E> {
        DisposeGuard {
            controller: self.clone(),
        }
    }

    fn overwrite(&self, next: AsyncState<T, E>, reason: &'static str) {
        let inner = self.lock();
        if inner.disposed {
            debug!(reason, "ignoring write on disposed controller");
            return;
        }
        inner.publish(next, reason);
    }
}

impl<T: Clone, E: Clone> AsyncController<T, E> {
    pub fn state(&self) -> AsyncState<T, E> {
        self.lock().state.borrow().clone()
    }
}

impl<T, E> AsyncController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Moves to `pending` immediately and tracks `operation` as the current
    /// one. The operation is spawned on the ambient tokio runtime and runs to
    /// completion even if the returned handle is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run<F>(&self, operation: F) -> RunHandle<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let generation = {
            let mut inner = self.lock();
            if inner.disposed {
                debug!("run on disposed controller; outcome will be discarded");
                None
            } else {
                inner.generation = inner.generation.wrapping_add(1);
                inner.publish(AsyncState::pending(), "run");
                Some(inner.generation)
            }
        };

        let shared: Weak<Mutex<Inner<T, E>>> = Arc::downgrade(&self.shared);
        let task = tokio::spawn(async move {
            let outcome = operation.await;
            let applied = match (generation, shared.upgrade()) {
                (Some(generation), Some(shared)) => {
                    apply_completion(&shared, generation, &outcome)
                }
                (Some(generation), None) => {
                    debug!(generation, "discarding completion: controller dropped");
                    false
                }
                (None, _) => false,
            };

            if applied {
                Completion::Applied(outcome)
            } else {
                Completion::Discarded(outcome)
            }
        });

        RunHandle { task }
    }
}

impl<T, E> fmt::Debug for AsyncController<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        let status = inner.state.borrow().status();
        f.debug_struct("AsyncController")
            .field("status", &status)
            .field("generation", &inner.generation)
            .field("disposed", &inner.disposed)
            .finish()
    }
}

/// Resolves once the operation passed to [`AsyncController::run`] finishes
/// and its outcome has been applied or discarded.
#[must_use = "dropping the handle detaches the operation; it still runs"]
pub struct RunHandle<T, E> {
    task: JoinHandle<Completion<T, E>>,
}

impl<T, E> RunHandle<T, E> {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T, E> Future for RunHandle<T, E> {
    type Output = Result<Completion<T, E>, ControllerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| {
            joined.map_err(|err| {
                if err.is_panic() {
                    ControllerError::OperationPanicked
                } else {
                    ControllerError::OperationCancelled
                }
            })
        })
    }
}

pub struct DisposeGuard<T, E> {
    controller: AsyncController<T, E>,
}

impl<T, E> Deref for DisposeGuard<T, E> {
    type Target = AsyncController<T, E>;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

impl<T, E> Drop for DisposeGuard<T, E> {
    fn drop(&mut self) {
        self.controller.dispose();
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
