use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use bridge_traits::panic_message;
use core_async::sync::CompletionSlot;
use tracing::warn;

use crate::message::{Continuation, MessageError};
use crate::operation::{DispatchToken, Operation, OperationId};

/// One queued call: its target, captured arguments and result slot.
///
/// The target is held weakly so a queued message never keeps its actor
/// alive. An envelope dropped without running resolves its message with
/// [`MessageError::TargetDropped`], so no handle is left pending forever.
pub(crate) struct Envelope<A> {
    operation: OperationId,
    sequence: u64,
    target: Weak<A>,
    call: Option<Box<dyn Deliver<A>>>,
}

impl<A: Send + Sync + 'static> Envelope<A> {
    pub(crate) fn new<O: Operation<A>>(
        target: &Arc<A>,
        args: O::Args,
        slot: Arc<CompletionSlot<O::Output, MessageError>>,
        continuation: Option<Continuation<O::Output>>,
    ) -> Self {
        Self {
            operation: O::ID,
            sequence: 0,
            target: Arc::downgrade(target),
            call: Some(Box::new(Delivery::<A, O> {
                args,
                slot,
                continuation,
                _target: PhantomData,
            })),
        }
    }
}

impl<A> Envelope<A> {
    pub(crate) fn operation(&self) -> OperationId {
        self.operation
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// Runs the operation against its target and records the result.
    pub(crate) fn run(mut self, token: DispatchToken) {
        let Some(call) = self.call.take() else {
            return;
        };

        match self.target.upgrade() {
            Some(target) => call.deliver(&target, token),
            None => call.abandon(MessageError::TargetDropped {
                operation: self.operation,
            }),
        }
    }

    /// Resolves the message with `error` without running it.
    pub(crate) fn fail(mut self, error: MessageError) {
        if let Some(call) = self.call.take() {
            call.abandon(error);
        }
    }
}

impl<A> Drop for Envelope<A> {
    fn drop(&mut self) {
        if let Some(call) = self.call.take() {
            call.abandon(MessageError::TargetDropped {
                operation: self.operation,
            });
        }
    }
}

trait Deliver<A>: Send {
    fn deliver(self: Box<Self>, target: &A, token: DispatchToken);

    fn abandon(self: Box<Self>, error: MessageError);
}

struct Delivery<A, O: Operation<A>> {
    args: O::Args,
    slot: Arc<CompletionSlot<O::Output, MessageError>>,
    continuation: Option<Continuation<O::Output>>,
    _target: PhantomData<fn(&A)>,
}

impl<A, O> Deliver<A> for Delivery<A, O>
where
    A: Send + Sync + 'static,
    O: Operation<A>,
{
    fn deliver(self: Box<Self>, target: &A, token: DispatchToken) {
        let Delivery {
            args,
            slot,
            continuation,
            ..
        } = *self;

        let result = match panic::catch_unwind(AssertUnwindSafe(|| O::invoke(target, args, token))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => {
                warn!(operation = %O::ID, error = %format!("{error:#}"), "Operation failed");
                Err(MessageError::Failed {
                    operation: O::ID,
                    error: Arc::new(error),
                })
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(operation = %O::ID, %message, "Operation panicked");
                Err(MessageError::Panicked {
                    operation: O::ID,
                    message,
                })
            }
        };

        complete(O::ID, &slot, continuation, result);
    }

    fn abandon(self: Box<Self>, error: MessageError) {
        let Delivery {
            slot, continuation, ..
        } = *self;
        complete(O::ID, &slot, continuation, Err(error));
    }
}

/// Writes the result, then runs the continuation with a copy of it.
fn complete<T: Clone>(
    operation: OperationId,
    slot: &CompletionSlot<T, MessageError>,
    continuation: Option<Continuation<T>>,
    result: Result<T, MessageError>,
) {
    let Some(continuation) = continuation else {
        let _ = slot.resolve(result.into());
        return;
    };

    let _ = slot.resolve(result.clone().into());
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| continuation(&result))) {
        warn!(
            %operation,
            message = %panic_message(payload.as_ref()),
            "Continuation panicked"
        );
    }
}
