//! Background Task Execution Implementation

use bridge_traits::{
    error::{BridgeError, Result},
    scheduler::{Job, TaskHandle, TaskScheduler},
};
use core_async::runtime::{self, Builder, Handle, Runtime};
use tracing::{debug, info, warn};

const DEFAULT_THREAD_NAME: &str = "procedure-async";

/// Sizing for [`PoolScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    /// Async worker threads of the owned runtime.
    pub worker_threads: usize,
    /// Upper bound on threads running drain passes concurrently.
    pub max_blocking_threads: usize,
    /// Name given to every pool thread.
    pub thread_name: String,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2),
            max_blocking_threads: 64,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

/// Owned-pool scheduler for desktop.
///
/// Builds a dedicated multi-thread Tokio runtime and runs every job on its
/// blocking pool, since drain passes execute synchronous operation bodies.
pub struct PoolScheduler {
    runtime: Option<Runtime>,
    options: PoolOptions,
}

impl PoolScheduler {
    /// Create a pool with default sizing.
    pub fn new() -> Result<Self> {
        Self::with_options(PoolOptions::default())
    }

    /// Create a pool with explicit sizing.
    pub fn with_options(options: PoolOptions) -> Result<Self> {
        if options.worker_threads == 0 || options.max_blocking_threads == 0 {
            return Err(BridgeError::OperationFailed(
                "PoolScheduler needs at least one worker and one blocking thread".to_string(),
            ));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(options.worker_threads)
            .max_blocking_threads(options.max_blocking_threads)
            .thread_name(options.thread_name.clone())
            .enable_all()
            .build()
            .map_err(|e| {
                BridgeError::NotAvailable(format!("failed to build scheduler pool: {}", e))
            })?;

        info!(
            workers = options.worker_threads,
            max_blocking = options.max_blocking_threads,
            "Pool scheduler started"
        );

        Ok(Self {
            runtime: Some(runtime),
            options,
        })
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }
}

impl TaskScheduler for PoolScheduler {
    fn name(&self) -> &'static str {
        "pool"
    }

    fn submit(&self, job: Job) -> Result<TaskHandle> {
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(BridgeError::Rejected("pool is shut down".to_string()));
        };

        let (handle, job) = TaskHandle::track(job);
        runtime.spawn_blocking(job);
        debug!(task_id = %handle.id(), "Submitted job to pool");
        Ok(handle)
    }
}

impl Drop for PoolScheduler {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Safe to call from async contexts, unlike dropping the runtime.
            runtime.shutdown_background();
        }
    }
}

/// Scheduler coordinated with the host application's own Tokio runtime.
pub struct HostedScheduler {
    handle: Handle,
}

impl HostedScheduler {
    /// Attach to the runtime driving the current thread.
    ///
    /// Fails immediately when no runtime is present, so a misconfigured host
    /// is reported at construction rather than on the first message.
    pub fn try_current() -> Result<Self> {
        runtime::current_handle()
            .map(Self::from_handle)
            .ok_or_else(|| {
                BridgeError::NotAvailable(
                    "HostedScheduler requires an ambient Tokio runtime. \
                     Construct it from inside the host application's runtime \
                     or select the pool backend."
                        .to_string(),
                )
            })
    }

    /// Attach to an explicit runtime handle.
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl TaskScheduler for HostedScheduler {
    fn name(&self) -> &'static str {
        "hosted"
    }

    fn submit(&self, job: Job) -> Result<TaskHandle> {
        let (handle, job) = TaskHandle::track(job);
        self.handle.spawn_blocking(job);
        debug!(task_id = %handle.id(), "Submitted job to host runtime");
        Ok(handle)
    }
}

/// Scheduler that runs every job on a fresh, named OS thread.
pub struct ThreadScheduler {
    thread_name: String,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::with_thread_name(DEFAULT_THREAD_NAME)
    }

    pub fn with_thread_name(name: impl Into<String>) -> Self {
        Self {
            thread_name: name.into(),
        }
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler for ThreadScheduler {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn submit(&self, job: Job) -> Result<TaskHandle> {
        let (handle, job) = TaskHandle::track(job);
        std::thread::Builder::new()
            .name(format!("{}-{}", self.thread_name, handle.id().0))
            .spawn(job)
            .map_err(|e| {
                warn!("Failed to spawn scheduler thread: {}", e);
                BridgeError::Rejected(format!("failed to spawn thread: {}", e))
            })?;
        Ok(handle)
    }
}
