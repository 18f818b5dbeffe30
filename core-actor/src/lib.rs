//! # Core Actor Module
//!
//! Lets any type expose operations that run in the background yet execute
//! strictly one at a time per instance.
//!
//! ## Overview
//!
//! Calling an operation enqueues a message on the instance's [`Mailbox`] and
//! returns a [`Message`] handle immediately. Whenever a mailbox goes from idle
//! to non-empty, exactly one drain pass is submitted to the configured
//! [`TaskScheduler`](bridge_traits::TaskScheduler); that pass runs queued
//! messages in enqueue order until the queue is empty, writing each message's
//! result exactly once. Callers read results from any thread, optionally with
//! a timeout, and failures are re-raised only at read time.
//!
//! ## Usage
//!
//! ```ignore
//! use core_actor::{actor, Mailbox};
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Counter {
//!     mailbox: Mailbox<Counter>,
//!     total: AtomicU64,
//! }
//!
//! #[actor]
//! impl Counter {
//!     #[operation]
//!     pub fn add(&self, amount: u64) -> u64 {
//!         self.total.fetch_add(amount, Ordering::SeqCst) + amount
//!     }
//! }
//!
//! let counter = Arc::new(Counter::default());
//! let handle = counter.add(5);
//! assert_eq!(handle.get()?, 5);
//! ```

mod combinator;
pub mod context;
mod dispatcher;
mod envelope;
pub mod mailbox;
pub mod message;
pub mod operation;

pub use core_async_macros::actor;

pub use combinator::{await_result, await_within};
pub use context::{DispatchContext, DEFAULT_WAIT_TIMEOUT};
pub use mailbox::Mailbox;
pub use message::{Continuation, Message, MessageError};
pub use operation::{
    dispatch, dispatch_with, Actor, DispatchToken, Operation, OperationError, OperationId,
    OperationResult,
};
