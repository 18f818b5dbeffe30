//! Workspace facade crate.
//!
//! Re-exports the public surface of the workspace crates so host
//! applications can depend on a single crate:
//!
//! - [`core_actor`]: mailboxes, message handles and the `#[actor]` registrar
//! - [`core_runtime`]: backend selection, configuration and logging
//! - [`bridge_traits`]: the scheduler contract for custom backends
//!
//! The `desktop-schedulers` feature (on by default) also exposes the built-in
//! scheduler implementations. Code using `#[actor]` must depend on
//! `core-actor` directly, since the generated impls refer to it by name.

pub use core_actor::{
    actor, await_result, await_within, Actor, DispatchContext, Mailbox, Message, MessageError,
    OperationId, DEFAULT_WAIT_TIMEOUT,
};
pub use core_runtime::{
    build_scheduler, init, logging, Error, Result, RuntimeConfig, SchedulerBackend,
};

pub use bridge_traits::{BridgeError, TaskHandle, TaskScheduler};

#[cfg(feature = "desktop-schedulers")]
pub use bridge_desktop::{HostedScheduler, PoolOptions, PoolScheduler, ThreadScheduler};
