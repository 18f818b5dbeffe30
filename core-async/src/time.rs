//! Time-related abstractions.
//!
//! `sleep`, `timeout` and `interval` integrate with Tokio's timer wheel and
//! must be awaited inside a runtime. `Duration` and `Instant` are the standard
//! library types and are used for the blocking waits on completion slots.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(10)).await;
//!     println!("Took {:?}", start.elapsed());
//! }
//! ```

pub use tokio::time::{error::Elapsed, interval, sleep, timeout, Interval, Sleep, Timeout};

pub use std::time::{Duration, Instant};

/// Computes the instant `timeout` from now.
///
/// Returns `None` when the deadline is not representable (for example
/// `Duration::MAX`), which callers treat as "wait without a bound".
pub fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}
