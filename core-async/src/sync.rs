//! Synchronization primitives.
//!
//! Async-aware primitives are re-exported from `tokio::sync`. On top of those
//! this module provides [`CompletionSlot`], a write-once cell that any number
//! of threads or tasks can wait on, with or without a timeout.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CompletionSlot, Outcome};
//! use std::sync::Arc;
//!
//! let slot = Arc::new(CompletionSlot::<&str, String>::new());
//! let writer = slot.clone();
//!
//! std::thread::spawn(move || {
//!     writer.fulfill("done").unwrap();
//! });
//!
//! assert_eq!(slot.wait(), Outcome::Fulfilled("done"));
//! // Reads never consume the value.
//! assert_eq!(slot.wait(), Outcome::Fulfilled("done"));
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Barrier, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard, Semaphore, SemaphorePermit,
};

use std::fmt;
use std::time::Duration;

use parking_lot::{Condvar, Mutex as SyncMutex};

use crate::time::deadline_after;

/// The resolved state of a [`CompletionSlot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The producer completed normally.
    Fulfilled(T),
    /// The producer failed.
    Failed(E),
}

impl<T, E> Outcome<T, E> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Converts the outcome into a `Result`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Fulfilled(value) => Ok(value),
            Self::Failed(error) => Err(error),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled(value),
            Err(error) => Self::Failed(error),
        }
    }
}

/// A single-write, multi-read synchronization cell.
///
/// The slot starts pending and transitions exactly once to
/// [`Outcome::Fulfilled`] or [`Outcome::Failed`]. After that it never changes.
/// Readers clone the stored outcome, so any number of them can observe it any
/// number of times.
///
/// Blocking readers park on a condition variable and may bound the wait.
/// Async readers ([`CompletionSlot::resolved`]) park on a `Notify` and never
/// block a runtime worker. A timed-out read leaves the slot untouched.
pub struct CompletionSlot<T, E> {
    state: SyncMutex<Option<Outcome<T, E>>>,
    ready: Condvar,
    notify: Notify,
}

impl<T, E> CompletionSlot<T, E> {
    /// Creates a pending slot.
    pub fn new() -> Self {
        Self {
            state: SyncMutex::new(None),
            ready: Condvar::new(),
            notify: Notify::new(),
        }
    }

    /// Writes the outcome if the slot is still pending.
    ///
    /// Returns the outcome back in `Err` when the slot was already resolved;
    /// the first write always wins.
    pub fn resolve(&self, outcome: Outcome<T, E>) -> Result<(), Outcome<T, E>> {
        {
            let mut state = self.state.lock();
            if state.is_some() {
                return Err(outcome);
            }
            *state = Some(outcome);
        }

        self.ready.notify_all();
        self.notify.notify_waiters();
        Ok(())
    }

    /// Shorthand for `resolve(Outcome::Fulfilled(value))`.
    pub fn fulfill(&self, value: T) -> Result<(), Outcome<T, E>> {
        self.resolve(Outcome::Fulfilled(value))
    }

    /// Shorthand for `resolve(Outcome::Failed(error))`.
    pub fn fail(&self, error: E) -> Result<(), Outcome<T, E>> {
        self.resolve(Outcome::Failed(error))
    }

    /// Whether the slot has left the pending state.
    pub fn is_resolved(&self) -> bool {
        self.state.lock().is_some()
    }
}

impl<T: Clone, E: Clone> CompletionSlot<T, E> {
    /// Returns the outcome without blocking, or `None` while pending.
    pub fn peek(&self) -> Option<Outcome<T, E>> {
        self.state.lock().clone()
    }

    /// Blocks the calling thread until the slot resolves.
    pub fn wait(&self) -> Outcome<T, E> {
        let mut state = self.state.lock();
        loop {
            if let Some(outcome) = state.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut state);
        }
    }

    /// Blocks the calling thread until the slot resolves or `timeout` elapses.
    ///
    /// Returns `None` on timeout. A later call can still observe the value.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome<T, E>> {
        let Some(deadline) = deadline_after(timeout) else {
            return Some(self.wait());
        };

        let mut state = self.state.lock();
        loop {
            if let Some(outcome) = state.as_ref() {
                return Some(outcome.clone());
            }
            if self.ready.wait_until(&mut state, deadline).timed_out() {
                return state.clone();
            }
        }
    }

    /// Waits asynchronously until the slot resolves.
    pub async fn resolved(&self) -> Outcome<T, E> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a write between the check and the
            // await is not missed.
            notified.as_mut().enable();

            if let Some(outcome) = self.peek() {
                return outcome;
            }
            notified.await;
        }
    }
}

impl<T, E> Default for CompletionSlot<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for CompletionSlot<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_lock() {
            Some(state) => f.debug_struct("CompletionSlot").field("state", &*state).finish(),
            None => f.debug_struct("CompletionSlot").finish_non_exhaustive(),
        }
    }
}
