//! # Core Runtime Module
//!
//! Provides the runtime infrastructure around actor mailboxes:
//! - Scheduling backend selection and construction
//! - Configuration management
//! - Logging and tracing initialization
//!
//! ## Overview
//!
//! The backend is chosen once, from [`RuntimeConfig`], and installed as the
//! process-wide default with [`init`]. Mailboxes created afterwards submit
//! their drain passes to it. Hosts that need finer control can call
//! [`build_scheduler`] and hand the result to individual mailboxes.
//!
//! ```ignore
//! use core_runtime::{config::RuntimeConfig, init};
//!
//! let config = RuntimeConfig::builder().detect_backend().build()?;
//! init(config)?;
//! ```

pub mod config;
pub mod error;
pub mod logging;

use std::sync::Arc;

use bridge_desktop::{HostedScheduler, PoolScheduler, ThreadScheduler};
use bridge_traits::{BridgeError, TaskScheduler};
use core_actor::{context, DispatchContext};
use tracing::info;

pub use config::{RuntimeConfig, RuntimeConfigBuilder, SchedulerBackend};
pub use error::{Error, Result};

/// Constructs the scheduler selected by `config`.
///
/// # Errors
///
/// - [`Error::CapabilityMissing`] when `Hosted` is selected outside a Tokio
///   runtime
/// - [`Error::Bridge`] when the owned pool cannot be created
pub fn build_scheduler(config: &RuntimeConfig) -> Result<Arc<dyn TaskScheduler>> {
    config.validate()?;

    let scheduler: Arc<dyn TaskScheduler> = match config.backend {
        SchedulerBackend::Pool => Arc::new(PoolScheduler::with_options(config.pool_options())?),
        SchedulerBackend::Hosted => {
            let hosted = HostedScheduler::try_current().map_err(|e| match e {
                BridgeError::NotAvailable(message) => Error::CapabilityMissing {
                    capability: "HostedScheduler".to_string(),
                    message,
                },
                other => Error::Bridge(other),
            })?;
            Arc::new(hosted)
        }
        SchedulerBackend::Thread => {
            Arc::new(ThreadScheduler::with_thread_name(config.thread_name.clone()))
        }
    };

    info!(backend = %config.backend, "Scheduler constructed");
    Ok(scheduler)
}

/// Builds a dispatch context without installing it.
pub fn dispatch_context(config: &RuntimeConfig) -> Result<DispatchContext> {
    let scheduler = build_scheduler(config)?;
    Ok(DispatchContext::new(scheduler).with_default_timeout(config.default_wait_timeout))
}

/// Builds the configured scheduler and installs it as the process default.
///
/// Must run before the first message is sent through a mailbox without an
/// explicit context.
///
/// # Errors
///
/// Returns [`Error::Config`] if a default was already installed, including
/// the built-in pool a mailbox falls back to when `init` was never called.
pub fn init(config: RuntimeConfig) -> Result<DispatchContext> {
    let installed = dispatch_context(&config)?;

    context::install(installed.clone()).map_err(|_| {
        Error::Config(
            "A default dispatch context is already installed. \
             Call init once, before any mailbox is used."
                .to_string(),
        )
    })?;

    Ok(installed)
}
