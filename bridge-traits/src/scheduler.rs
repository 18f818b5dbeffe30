//! Task Scheduler contract
//!
//! Background execution of zero-argument closures.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use core_async::sync::{CompletionSlot, Outcome};

use crate::error::Result;

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Failure recorded for a job that panicked.
pub type TaskFailure = String;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Background task scheduler trait
///
/// Implementations must:
/// - never block the submitter beyond handing the job over;
/// - run the job on an execution context distinct from the submitter;
/// - return a [`TaskHandle`] that resolves once the job has finished.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::scheduler::TaskScheduler;
///
/// fn run_later(scheduler: &dyn TaskScheduler) -> bridge_traits::error::Result<()> {
///     let handle = scheduler.submit(Box::new(|| tracing::info!("in background")))?;
///     handle.join().expect("job panicked");
///     Ok(())
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait TaskScheduler: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Hands `job` to the backend.
    ///
    /// An `Err` means the job was not accepted and will never run. A backend
    /// that accepts a job and then discards it (for example after its runtime
    /// shut down) must drop the job rather than leak it.
    fn submit(&self, job: Job) -> Result<TaskHandle>;
}

/// Completion handle of a submitted job.
///
/// Backed by a [`CompletionSlot`], so it supports the same bounded,
/// non-consuming waits as message handles.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    slot: Arc<CompletionSlot<(), TaskFailure>>,
}

impl TaskHandle {
    /// Wraps `job` so that the returned handle resolves when it finishes.
    ///
    /// Panics inside the job are caught and recorded as a [`TaskFailure`];
    /// they never unwind into the backend's worker.
    pub fn track(job: Job) -> (Self, Job) {
        let handle = Self {
            id: TaskId::next(),
            slot: Arc::new(CompletionSlot::new()),
        };

        let slot = handle.slot.clone();
        let tracked: Job = Box::new(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(job)) {
                Ok(()) => Outcome::Fulfilled(()),
                Err(payload) => Outcome::Failed(panic_message(payload.as_ref())),
            };
            let _ = slot.resolve(outcome);
        });

        (handle, tracked)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.slot.is_resolved()
    }

    /// Waits up to `timeout`; `None` means the job is still running.
    pub fn wait(&self, timeout: Duration) -> Option<std::result::Result<(), TaskFailure>> {
        self.slot.wait_timeout(timeout).map(Outcome::into_result)
    }

    /// Blocks until the job has finished.
    pub fn join(&self) -> std::result::Result<(), TaskFailure> {
        self.slot.wait().into_result()
    }

    /// Waits asynchronously until the job has finished.
    pub async fn finished(&self) -> std::result::Result<(), TaskFailure> {
        self.slot.resolved().await.into_result()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
