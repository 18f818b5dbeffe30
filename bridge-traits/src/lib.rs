//! # Host Bridge Traits
//!
//! Execution-engine abstraction that the actor core is written against.
//!
//! ## Overview
//!
//! The mailbox dispatcher never manages threads itself. Whenever a mailbox
//! transitions from empty to non-empty it hands a drain pass to a
//! [`TaskScheduler`](scheduler::TaskScheduler), which runs the closure on an
//! execution context distinct from the submitter. The contract is deliberately
//! narrow so it can be satisfied by an owned thread pool, a host application's
//! own runtime, or plain managed threads.
//!
//! Concrete backends live in `bridge-desktop`; `core-runtime` selects one at
//! initialization.
//!
//! ## Fail-Fast Strategy
//!
//! Backends must fail at construction when a prerequisite is missing (for
//! example a hosted backend created outside of the host runtime), never on the
//! first submitted job:
//!
//! ```ignore
//! let scheduler = HostedScheduler::try_current()
//!     .map_err(|e| Error::CapabilityMissing {
//!         capability: "HostedScheduler".to_string(),
//!         message: e.to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! `TaskScheduler` requires `Send + Sync` so a single scheduler can be shared
//! by every mailbox in the process.

pub mod error;
pub mod scheduler;

pub use error::BridgeError;

pub use scheduler::{panic_message, Job, TaskFailure, TaskHandle, TaskId, TaskScheduler};
