//! Operation registration surface.
//!
//! `#[actor]` generates one [`Operation`] implementation per registered
//! method. The trait binds the method's body to an [`OperationId`]; the body
//! itself is only reachable through [`Operation::invoke`], which requires a
//! [`DispatchToken`] that only this crate can create.

use std::fmt;
use std::sync::Arc;

use crate::mailbox::Mailbox;
use crate::message::{Continuation, Message};

/// Failure type recorded for operation bodies.
pub type OperationError = anyhow::Error;

pub type OperationResult<T> = std::result::Result<T, OperationError>;

/// Identifier of a registered operation: the actor type and method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId {
    actor: &'static str,
    name: &'static str,
}

impl OperationId {
    pub const fn new(actor: &'static str, name: &'static str) -> Self {
        Self { actor, name }
    }

    pub const fn actor(&self) -> &'static str {
        self.actor
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.actor, self.name)
    }
}

/// Proof that the caller is the mailbox dispatcher.
///
/// Internal operation bodies take a token by value. Since it cannot be
/// constructed outside this crate, nothing but a drain pass can run them.
pub struct DispatchToken {
    _private: (),
}

impl DispatchToken {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

impl fmt::Debug for DispatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DispatchToken")
    }
}

/// A registered operation on actor type `A`.
pub trait Operation<A>: 'static {
    /// Captured call arguments, as a tuple.
    type Args: Send + 'static;

    /// Value stored in the message on success.
    type Output: Clone + Send + 'static;

    const ID: OperationId;

    /// Runs the synchronous body against `target`.
    fn invoke(target: &A, args: Self::Args, token: DispatchToken) -> OperationResult<Self::Output>;
}

/// A type that owns a mailbox and exposes registered operations.
///
/// Implemented by `#[actor]`.
pub trait Actor: Send + Sync + Sized + 'static {
    /// Every operation registered on this type, in declaration order.
    const OPERATIONS: &'static [OperationId];

    fn mailbox(&self) -> &Mailbox<Self>;

    /// Whether an operation called `name` is registered.
    fn responds_to(name: &str) -> bool {
        Self::OPERATIONS.iter().any(|id| id.name() == name)
    }
}

/// Enqueues operation `O` on `target` and returns its handle immediately.
pub fn dispatch<A, O>(target: &Arc<A>, args: O::Args) -> Message<O::Output>
where
    A: Actor,
    O: Operation<A>,
{
    target.mailbox().dispatch::<O>(target, args, None)
}

/// Like [`dispatch`], with a continuation run by the dispatcher right after
/// the result is written.
pub fn dispatch_with<A, O>(
    target: &Arc<A>,
    args: O::Args,
    continuation: Continuation<O::Output>,
) -> Message<O::Output>
where
    A: Actor,
    O: Operation<A>,
{
    target
        .mailbox()
        .dispatch::<O>(target, args, Some(continuation))
}
