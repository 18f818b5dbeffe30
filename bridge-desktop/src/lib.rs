//! # Desktop Bridge Implementations
//!
//! Task scheduler backends for native platforms (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - [`PoolScheduler`]: owns a Tokio multi-thread runtime and runs jobs on its
//!   blocking pool. The default backend.
//! - [`HostedScheduler`]: shares the host application's ambient Tokio runtime.
//!   Construction fails outside of a runtime.
//! - [`ThreadScheduler`]: one named OS thread per job.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::PoolScheduler;
//! use bridge_traits::TaskScheduler;
//!
//! let scheduler = PoolScheduler::new()?;
//! let handle = scheduler.submit(Box::new(|| println!("in the background")))?;
//! handle.join().expect("job panicked");
//! ```

mod background;

pub use background::{HostedScheduler, PoolOptions, PoolScheduler, ThreadScheduler};
