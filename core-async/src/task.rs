//! Task spawning and execution abstractions.
//!
//! - `spawn`: Returns a `JoinHandle<T>` that can be awaited
//! - `spawn_blocking`: For synchronous or CPU-intensive work; runs on the
//!   runtime's blocking thread pool
//!
//! Actor operation bodies are synchronous and may block, so scheduler
//! backends hand drain passes to `spawn_blocking` rather than `spawn`.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! async fn example() {
//!     let handle = task::spawn(async { 42 });
//!     assert_eq!(handle.await.unwrap(), 42);
//!
//!     let blocking = task::spawn_blocking(|| std::thread::current().id());
//!     let _worker = blocking.await.unwrap();
//! }
//! ```

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task using the Tokio runtime.
///
/// The spawned task may run on a different thread.
///
/// # Panics
///
/// Panics when called outside of a runtime context.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
