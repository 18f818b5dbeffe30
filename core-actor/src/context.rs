//! Process-wide dispatch defaults.
//!
//! A [`DispatchContext`] pairs the scheduler that runs drain passes with the
//! default read timeout of message handles. Mailboxes created without an
//! explicit context pick up the installed default the first time they
//! enqueue. When nothing was installed, an owned thread pool is used.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bridge_desktop::{PoolScheduler, ThreadScheduler};
use bridge_traits::TaskScheduler;
use tracing::{info, warn};

/// Default timeout of [`Message::get`](crate::Message::get).
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

static DEFAULT_CONTEXT: OnceLock<DispatchContext> = OnceLock::new();

/// Scheduler plus read defaults shared by a set of mailboxes.
#[derive(Clone)]
pub struct DispatchContext {
    scheduler: Arc<dyn TaskScheduler>,
    default_timeout: Duration,
}

impl DispatchContext {
    pub fn new(scheduler: Arc<dyn TaskScheduler>) -> Self {
        Self {
            scheduler,
            default_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn scheduler(&self) -> &Arc<dyn TaskScheduler> {
        &self.scheduler
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("scheduler", &self.scheduler.name())
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

/// Installs the process-wide default context.
///
/// Only the first call succeeds; later calls, or calls made after a mailbox
/// already fell back to the built-in pool, get their context back in `Err`.
pub fn install(context: DispatchContext) -> Result<(), DispatchContext> {
    let backend = context.scheduler.name();
    DEFAULT_CONTEXT.set(context)?;
    info!(backend, "Installed default dispatch context");
    Ok(())
}

/// Whether a default context is already in place.
pub fn is_installed() -> bool {
    DEFAULT_CONTEXT.get().is_some()
}

/// The default context, creating the built-in pool on first use.
pub fn current() -> DispatchContext {
    DEFAULT_CONTEXT.get_or_init(fallback).clone()
}

fn fallback() -> DispatchContext {
    let scheduler: Arc<dyn TaskScheduler> = match PoolScheduler::new() {
        Ok(pool) => Arc::new(pool),
        Err(error) => {
            warn!(%error, "Default pool unavailable, using one thread per drain pass");
            Arc::new(ThreadScheduler::new())
        }
    };
    info!(backend = scheduler.name(), "Using built-in dispatch context");
    DispatchContext::new(scheduler)
}
