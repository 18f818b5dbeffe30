//! # Runtime Configuration
//!
//! Selects the scheduling backend that runs mailbox drain passes and the
//! defaults applied to message handles.
//!
//! ## Overview
//!
//! The configuration uses a builder that validates eagerly: an invalid
//! setting is reported by [`RuntimeConfigBuilder::build`], never by the first
//! message sent afterwards.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::{RuntimeConfig, SchedulerBackend};
//! use std::time::Duration;
//!
//! let config = RuntimeConfig::builder()
//!     .backend(SchedulerBackend::Pool)
//!     .pool_workers(2)
//!     .thread_name("workers")
//!     .default_wait_timeout(Duration::from_secs(5))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.pool_options().worker_threads, 2);
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::RuntimeConfig;
//!
//! // Zero workers is rejected with a message naming the setter.
//! let config = RuntimeConfig::builder()
//!     .pool_workers(0)
//!     .build()
//!     .expect("Should fail - zero workers");
//! ```

use std::fmt;
use std::time::Duration;

use bridge_desktop::PoolOptions;
use core_actor::DEFAULT_WAIT_TIMEOUT;

use crate::error::{Error, Result};

/// Execution strategy for drain passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchedulerBackend {
    /// Dedicated thread pool owned by this library.
    #[default]
    Pool,
    /// The host application's own Tokio runtime.
    Hosted,
    /// One OS thread per drain pass.
    Thread,
}

impl SchedulerBackend {
    /// `Hosted` when called from inside a Tokio runtime, otherwise `Pool`.
    pub fn detect() -> Self {
        if core_async::runtime::in_runtime() {
            Self::Hosted
        } else {
            Self::Pool
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pool => "pool",
            Self::Hosted => "hosted",
            Self::Thread => "thread",
        }
    }
}

impl fmt::Display for SchedulerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime configuration.
///
/// Use [`RuntimeConfig::builder`] to construct validated instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Backend that runs drain passes
    pub backend: SchedulerBackend,

    /// Async worker threads of the owned pool (`Pool` only)
    pub pool_workers: usize,

    /// Upper bound on concurrently running drain passes (`Pool` only)
    pub max_blocking_threads: usize,

    /// Name given to scheduler threads (`Pool` and `Thread`)
    pub thread_name: String,

    /// Timeout applied by `Message::get` and `Message::wait`
    pub default_wait_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let pool = PoolOptions::default();
        Self {
            backend: SchedulerBackend::default(),
            pool_workers: pool.worker_threads,
            max_blocking_threads: pool.max_blocking_threads,
            thread_name: pool.thread_name,
            default_wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

impl RuntimeConfig {
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.pool_workers == 0 {
            return Err(Error::Config(
                "pool_workers must be greater than 0".to_string(),
            ));
        }

        if self.max_blocking_threads == 0 {
            return Err(Error::Config(
                "max_blocking_threads must be greater than 0".to_string(),
            ));
        }

        if self.thread_name.trim().is_empty() {
            return Err(Error::Config("thread_name cannot be empty".to_string()));
        }

        if self.default_wait_timeout.is_zero() {
            return Err(Error::Config(
                "default_wait_timeout must be greater than 0. \
                 Use Message::try_value for non-blocking reads."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Sizing handed to the owned pool.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            worker_threads: self.pool_workers,
            max_blocking_threads: self.max_blocking_threads,
            thread_name: self.thread_name.clone(),
        }
    }
}

/// Builder for [`RuntimeConfig`].
///
/// Unset fields keep their [`RuntimeConfig::default`] values.
#[derive(Debug, Default)]
pub struct RuntimeConfigBuilder {
    backend: Option<SchedulerBackend>,
    pool_workers: Option<usize>,
    max_blocking_threads: Option<usize>,
    thread_name: Option<String>,
    default_wait_timeout: Option<Duration>,
}

impl RuntimeConfigBuilder {
    pub fn backend(mut self, backend: SchedulerBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Picks the backend with [`SchedulerBackend::detect`].
    pub fn detect_backend(mut self) -> Self {
        self.backend = Some(SchedulerBackend::detect());
        self
    }

    pub fn pool_workers(mut self, workers: usize) -> Self {
        self.pool_workers = Some(workers);
        self
    }

    pub fn max_blocking_threads(mut self, threads: usize) -> Self {
        self.max_blocking_threads = Some(threads);
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    pub fn default_wait_timeout(mut self, timeout: Duration) -> Self {
        self.default_wait_timeout = Some(timeout);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid setting.
    pub fn build(self) -> Result<RuntimeConfig> {
        let defaults = RuntimeConfig::default();
        let config = RuntimeConfig {
            backend: self.backend.unwrap_or(defaults.backend),
            pool_workers: self.pool_workers.unwrap_or(defaults.pool_workers),
            max_blocking_threads: self
                .max_blocking_threads
                .unwrap_or(defaults.max_blocking_threads),
            thread_name: self.thread_name.unwrap_or(defaults.thread_name),
            default_wait_timeout: self
                .default_wait_timeout
                .unwrap_or(defaults.default_wait_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}
