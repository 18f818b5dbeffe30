//! Runtime utilities that abstract over the underlying async executor.
//!
//! We wrap Tokio's runtime primitives so that downstream crates never need to
//! depend on Tokio directly. Scheduler backends use [`Builder`] to own a pool
//! and [`current_handle`] to detect a runtime provided by the host application.

pub use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

/// Runs the provided future to completion using a lightweight runtime.
///
/// # Panics
///
/// Panics if the current-thread runtime cannot be built, or if called from
/// inside another runtime (Tokio forbids nested `block_on`).
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Returns a handle to the runtime driving the current thread, if any.
///
/// This is how callers detect that a host application already runs its own
/// executor and that background work should be coordinated with it.
pub fn current_handle() -> Option<Handle> {
    Handle::try_current().ok()
}

/// Whether the current thread is inside a runtime context.
pub fn in_runtime() -> bool {
    current_handle().is_some()
}
