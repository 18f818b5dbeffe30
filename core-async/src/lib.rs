//! Runtime abstraction layer for procedure-async.
//!
//! This crate provides the runtime and synchronization building blocks that the
//! rest of the workspace is written against, so that no other crate needs to
//! reach into Tokio directly.
//!
//! # Modules
//!
//! - `runtime`: Runtime construction, ambient-runtime detection, `block_on`
//! - `task`: Task spawning and execution
//! - `time`: Time-related operations (sleep, timeout, duration, instant)
//! - `sync`: Synchronization primitives, including the write-once
//!   [`CompletionSlot`](sync::CompletionSlot) used for message results
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CompletionSlot, Outcome};
//! use core_async::time::Duration;
//!
//! let slot: CompletionSlot<u32, String> = CompletionSlot::new();
//! assert!(slot.wait_timeout(Duration::from_millis(5)).is_none());
//!
//! slot.fulfill(42).unwrap();
//! assert_eq!(slot.wait(), Outcome::Fulfilled(42));
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use sync::{CompletionSlot, Outcome};
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
