//! Request-scoped cancellation and deadlines.
//!
//! Every driver call takes a [`Context`]. Cancellation is cooperative: the
//! driver and the walk loop call [`Context::check`] before each I/O step, so
//! an in-flight enumeration stops at the next boundary once the context is
//! cancelled or its deadline passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{DriverError, DriverResult};

#[derive(Debug)]
struct ContextState {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
}

/// Cancellation handle threaded through every storage call.
///
/// Cloning is cheap; clones share the same cancellation state. A child
/// context is cancelled whenever its parent is.
#[derive(Clone, Debug)]
pub struct Context {
    state: Arc<ContextState>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::build(None, None)
    }

    /// A root context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(None, Some(Instant::now() + timeout))
    }

    /// A child context that can be cancelled independently of `self`.
    pub fn child(&self) -> Self {
        Self::build(Some(self.clone()), None)
    }

    /// A child context with its own deadline.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        Self::build(Some(self.clone()), Some(Instant::now() + timeout))
    }

    fn build(parent: Option<Context>, deadline: Option<Instant>) -> Self {
        Self {
            state: Arc::new(ContextState {
                cancelled: AtomicBool::new(false),
                deadline,
                parent,
            }),
        }
    }

    /// Request cancellation of this context and all of its children.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
    }

    /// The earliest deadline along the parent chain.
    pub fn deadline(&self) -> Option<Instant> {
        let parent = self.state.parent.as_ref().and_then(Context::deadline);
        match (self.state.deadline, parent) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Returns `true` once cancelled (here or on an ancestor) or past deadline.
    pub fn is_cancelled(&self) -> bool {
        if self.state.cancelled.load(Ordering::Acquire) {
            return true;
        }
        if matches!(self.state.deadline, Some(d) if Instant::now() >= d) {
            return true;
        }
        self.state
            .parent
            .as_ref()
            .is_some_and(Context::is_cancelled)
    }

    /// Fail with [`DriverError::Canceled`] if the context is done.
    pub fn check(&self) -> DriverResult<()> {
        if self.is_cancelled() {
            Err(DriverError::Canceled)
        } else {
            Ok(())
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
