//! Execution scopes: one deadline and one cancellation signal per operation.
//!
//! An [`ExecutionScope`] bounds exactly one enumeration or mutation. It is
//! owned by the caller, passed by reference into the core, and released
//! when dropped -- on every exit path, including early returns and
//! abandonment by the caller. Release cancels the scope's token, which is
//! what stops any producer task still bound to it.
//!
//! ```text
//! Created ─► Active ─┬─► Completed
//!    │               ├─► Failed
//!    └───────────────┴─► Cancelled
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Budget used when the caller does not pick one.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(100);

/// Lifecycle state of an [`ExecutionScope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeState {
    /// Constructed, no work started yet.
    Created,
    /// Work is in progress.
    Active,
    /// The operation finished successfully.
    Completed,
    /// The operation failed or ran out of time.
    Failed,
    /// The scope was cancelled or abandoned before a result was reached.
    Cancelled,
}

impl ScopeState {
    /// Returns `true` once the scope can no longer change state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Returns `true` if a scope may move from `from` to `to`.
#[must_use]
pub fn can_transition(from: ScopeState, to: ScopeState) -> bool {
    matches!(
        (from, to),
        (ScopeState::Created, ScopeState::Active)
            | (
                ScopeState::Created | ScopeState::Active,
                ScopeState::Completed | ScopeState::Failed | ScopeState::Cancelled
            )
    )
}

/// Why work bound to a scope stopped before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// The scope's deadline elapsed.
    #[error("deadline of {budget:?} exceeded")]
    DeadlineExceeded {
        /// The budget the scope was created with.
        budget: Duration,
    },

    /// The scope was cancelled explicitly or by its parent.
    #[error("scope cancelled")]
    Cancelled,
}

#[derive(Debug)]
struct Shared {
    label: String,
    state: Mutex<ScopeState>,
    released: AtomicBool,
}

impl Shared {
    fn transition(&self, to: ScopeState) -> bool {
        let mut state = self.state.lock();
        if can_transition(*state, to) {
            *state = to;
            true
        } else {
            false
        }
    }

    fn release(&self) -> ScopeState {
        let mut state = self.state.lock();
        if !state.is_terminal() {
            *state = ScopeState::Cancelled;
        }
        let already = self.released.swap(true, Ordering::AcqRel);
        debug_assert!(!already, "execution scope released twice");
        *state
    }
}

/// Deadline and cancellation context owning one core invocation.
///
/// Not `Clone`: a scope belongs to a single enumeration or mutation.
/// Work that must outlive a borrow (the enumeration producer) holds a
/// [`ScopeBinding`] instead, which observes the same token and deadline.
#[derive(Debug)]
pub struct ExecutionScope {
    token: CancellationToken,
    deadline: Instant,
    budget: Duration,
    shared: Arc<Shared>,
}

impl ExecutionScope {
    /// Create a scope that expires `budget` from now.
    pub fn new(label: impl Into<String>, budget: Duration) -> Self {
        Self::with_token(CancellationToken::new(), label.into(), budget)
    }

    /// Create a scope that is also cancelled when `parent` is.
    ///
    /// Use this to tie a scope to the caller's own request lifetime.
    pub fn child_of(parent: &CancellationToken, label: impl Into<String>, budget: Duration) -> Self {
        Self::with_token(parent.child_token(), label.into(), budget)
    }

    fn with_token(token: CancellationToken, label: String, budget: Duration) -> Self {
        Self {
            token,
            deadline: Instant::now() + budget,
            budget,
            shared: Arc::new(Shared {
                label,
                state: Mutex::new(ScopeState::Created),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Label used in log fields.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// The budget this scope was created with.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Absolute deadline.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Returns `true` once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Returns `true` once the scope has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel all work bound to this scope.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ScopeState {
        *self.shared.state.lock()
    }

    /// A handle that keeps reporting state after the scope is released.
    #[must_use]
    pub fn observer(&self) -> ScopeObserver {
        ScopeObserver {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Bind background work to this scope's token and deadline.
    #[must_use]
    pub fn bind(&self) -> ScopeBinding {
        ScopeBinding {
            token: self.token.clone(),
            deadline: self.deadline,
            budget: self.budget,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run `future` to completion unless the scope is cancelled or its
    /// deadline passes first. Marks the scope active.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, ScopeError> {
        self.shared.transition(ScopeState::Active);
        guard(&self.token, self.deadline, self.budget, future).await
    }

    /// Record the outcome of the work. Ignored once the scope is terminal.
    pub fn settle(&self, outcome: ScopeState) -> bool {
        self.shared.transition(outcome)
    }
}

impl Drop for ExecutionScope {
    fn drop(&mut self) {
        let state = self.shared.release();
        self.token.cancel();
        tracing::debug!(scope = %self.shared.label, %state, "execution scope released");
    }
}

/// Background work's view of an [`ExecutionScope`].
///
/// Shares the scope's cancellation token, deadline and state, but does
/// not release the scope when dropped.
#[derive(Debug, Clone)]
pub struct ScopeBinding {
    token: CancellationToken,
    deadline: Instant,
    budget: Duration,
    shared: Arc<Shared>,
}

impl ScopeBinding {
    /// Label of the bound scope.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Budget of the bound scope.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Returns `true` once the bound scope is cancelled or released.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Same as [`ExecutionScope::run`], without touching the state.
    pub async fn guard<F: Future>(&self, future: F) -> Result<F::Output, ScopeError> {
        guard(&self.token, self.deadline, self.budget, future).await
    }

    /// Move the bound scope to `to` if the transition is allowed.
    pub fn transition(&self, to: ScopeState) -> bool {
        self.shared.transition(to)
    }
}

/// Read-only view of a scope's state that outlives the scope.
#[derive(Debug, Clone)]
pub struct ScopeObserver {
    shared: Arc<Shared>,
}

impl ScopeObserver {
    /// Current (or final) state.
    #[must_use]
    pub fn state(&self) -> ScopeState {
        *self.shared.state.lock()
    }

    /// Returns `true` once the scope has been dropped.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.shared.released.load(Ordering::Acquire)
    }
}

async fn guard<F: Future>(
    token: &CancellationToken,
    deadline: Instant,
    budget: Duration,
    future: F,
) -> Result<F::Output, ScopeError> {
    tokio::select! {
        biased;
        () = token.cancelled() => Err(ScopeError::Cancelled),
        () = tokio::time::sleep_until(deadline) => Err(ScopeError::DeadlineExceeded { budget }),
        output = future => Ok(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(ScopeState::Created, ScopeState::Active, true)]
    #[case(ScopeState::Created, ScopeState::Completed, true)]
    #[case(ScopeState::Active, ScopeState::Completed, true)]
    #[case(ScopeState::Active, ScopeState::Failed, true)]
    #[case(ScopeState::Active, ScopeState::Cancelled, true)]
    #[case(ScopeState::Active, ScopeState::Active, false)]
    #[case(ScopeState::Completed, ScopeState::Failed, false)]
    #[case(ScopeState::Failed, ScopeState::Cancelled, false)]
    #[case(ScopeState::Cancelled, ScopeState::Active, false)]
    fn transitions(#[case] from: ScopeState, #[case] to: ScopeState, #[case] allowed: bool) {
        assert_eq!(can_transition(from, to), allowed);
    }

    #[test]
    fn terminal_states() {
        assert!(ScopeState::Completed.is_terminal());
        assert!(ScopeState::Failed.is_terminal());
        assert!(ScopeState::Cancelled.is_terminal());
        assert!(!ScopeState::Created.is_terminal());
        assert!(!ScopeState::Active.is_terminal());
    }

    #[test]
    fn state_serde_snake_case() {
        let json = serde_json::to_string(&ScopeState::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[tokio::test(start_paused = true)]
    async fn run_returns_output_and_marks_active() {
        let scope = ExecutionScope::new("test", Duration::from_secs(1));
        assert_eq!(scope.state(), ScopeState::Created);
        let out = scope.run(async { 7 }).await;
        assert_eq!(out, Ok(7));
        assert_eq!(scope.state(), ScopeState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_at_deadline() {
        let scope = ExecutionScope::new("slow", Duration::from_millis(50));
        let out = scope.run(std::future::pending::<()>()).await;
        assert_eq!(
            out,
            Err(ScopeError::DeadlineExceeded {
                budget: Duration::from_millis(50)
            })
        );
        assert!(scope.is_expired());
        assert_eq!(scope.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn run_observes_cancellation() {
        let scope = ExecutionScope::new("cancel", Duration::from_secs(60));
        scope.cancel();
        let out = scope.run(std::future::pending::<()>()).await;
        assert_eq!(out, Err(ScopeError::Cancelled));
    }

    #[tokio::test]
    async fn parent_cancellation_propagates() {
        let parent = CancellationToken::new();
        let scope = ExecutionScope::child_of(&parent, "child", Duration::from_secs(60));
        parent.cancel();
        assert!(scope.is_cancelled());
    }

    #[test]
    fn release_cancels_unsettled_scope() {
        let parent = CancellationToken::new();
        let scope = ExecutionScope::child_of(&parent, "drop", Duration::from_secs(60));
        let binding = scope.bind();
        let observer = scope.observer();
        assert!(!observer.is_released());

        drop(scope);

        assert!(observer.is_released());
        assert_eq!(observer.state(), ScopeState::Cancelled);
        assert!(binding.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn release_keeps_settled_outcome() {
        let scope = ExecutionScope::new("done", Duration::from_secs(60));
        let observer = scope.observer();
        assert!(scope.settle(ScopeState::Completed));
        assert!(!scope.settle(ScopeState::Failed));
        drop(scope);
        assert_eq!(observer.state(), ScopeState::Completed);
        assert!(observer.is_released());
    }

    #[test]
    fn binding_shares_state() {
        let scope = ExecutionScope::new("bound", DEFAULT_BUDGET);
        let binding = scope.bind();
        assert_eq!(binding.label(), "bound");
        assert_eq!(binding.budget(), DEFAULT_BUDGET);
        assert!(binding.transition(ScopeState::Active));
        assert_eq!(scope.state(), ScopeState::Active);
    }
}
