//! Result handles returned by operation calls.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use core_async::sync::{CompletionSlot, Outcome};
use core_async::time;
use thiserror::Error;

use crate::operation::OperationId;

/// Callback run by the dispatcher immediately after a message resolves.
///
/// Runs on the dispatcher's thread, before the next queued message starts.
pub type Continuation<T> = Box<dyn FnOnce(&Result<T, MessageError>) + Send + 'static>;

/// Why a message handle could not produce a value.
///
/// [`MessageError::TimedOut`] is the only variant raised by the reader
/// itself; everything else is the recorded outcome of the message and is
/// observed identically by every read.
#[derive(Debug, Clone, Error)]
pub enum MessageError {
    #[error("timed out after {0:?} waiting for the result")]
    TimedOut(Duration),

    #[error("operation {operation} failed: {error:#}")]
    Failed {
        operation: OperationId,
        error: Arc<anyhow::Error>,
    },

    #[error("operation {operation} panicked: {message}")]
    Panicked {
        operation: OperationId,
        message: String,
    },

    #[error("operation {operation} was dropped because its target no longer exists")]
    TargetDropped { operation: OperationId },

    #[error("operation {operation} was rejected by the scheduler: {reason}")]
    Rejected {
        operation: OperationId,
        reason: String,
    },
}

impl MessageError {
    /// True for a read that gave up waiting; the message may still resolve.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    /// The operation the failure belongs to, if it is a recorded outcome.
    pub fn operation(&self) -> Option<OperationId> {
        match self {
            Self::TimedOut(_) => None,
            Self::Failed { operation, .. }
            | Self::Panicked { operation, .. }
            | Self::TargetDropped { operation }
            | Self::Rejected { operation, .. } => Some(*operation),
        }
    }

    /// The error returned by the operation body, if any.
    pub fn body_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Failed { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }

    /// Downcasts the body's error to a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.body_error().and_then(|error| error.downcast_ref::<E>())
    }
}

/// Handle to the eventual result of one operation call.
///
/// Cloning is cheap and every clone observes the same result. Reads never
/// consume the value, so a read that times out can be retried and later
/// reads see exactly what earlier ones saw.
pub struct Message<T> {
    operation: OperationId,
    sequence: u64,
    slot: Arc<CompletionSlot<T, MessageError>>,
    default_timeout: Duration,
}

impl<T> Message<T> {
    pub(crate) fn new(
        operation: OperationId,
        sequence: u64,
        slot: Arc<CompletionSlot<T, MessageError>>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            operation,
            sequence,
            slot,
            default_timeout,
        }
    }

    pub fn operation(&self) -> OperationId {
        self.operation
    }

    /// Position of this message in its mailbox, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Timeout used by [`Message::get`] and [`Message::wait`].
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.is_resolved()
    }
}

impl<T: Clone> Message<T> {
    /// Blocks up to `timeout` for the result.
    ///
    /// Returns [`MessageError::TimedOut`] if the message is still pending at
    /// the deadline. That error is never confused with a recorded failure.
    pub fn value(&self, timeout: Duration) -> Result<T, MessageError> {
        match self.slot.wait_timeout(timeout) {
            Some(outcome) => outcome.into_result(),
            None => Err(MessageError::TimedOut(timeout)),
        }
    }

    /// [`Message::value`] with the default timeout.
    pub fn get(&self) -> Result<T, MessageError> {
        self.value(self.default_timeout)
    }

    /// Alias of [`Message::get`].
    pub fn wait(&self) -> Result<T, MessageError> {
        self.get()
    }

    /// Blocks without a timeout, then runs `handler` on the calling thread.
    ///
    /// A failed message returns its error and skips the handler.
    pub fn then<U, F>(&self, handler: F) -> Result<U, MessageError>
    where
        F: FnOnce(T) -> U,
    {
        self.slot.wait().into_result().map(handler)
    }

    /// The result if already resolved, without blocking.
    pub fn try_value(&self) -> Option<Result<T, MessageError>> {
        self.slot.peek().map(Outcome::into_result)
    }

    /// Waits asynchronously, without blocking a runtime worker.
    pub async fn resolved(&self) -> Result<T, MessageError> {
        self.slot.resolved().await.into_result()
    }

    /// [`Message::resolved`] bounded by `timeout`.
    pub async fn resolved_within(&self, timeout: Duration) -> Result<T, MessageError> {
        match time::timeout(timeout, self.slot.resolved()).await {
            Ok(outcome) => outcome.into_result(),
            Err(_) => Err(MessageError::TimedOut(timeout)),
        }
    }
}

impl<T> Clone for Message<T> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation,
            sequence: self.sequence,
            slot: self.slot.clone(),
            default_timeout: self.default_timeout,
        }
    }
}

impl<T> fmt::Debug for Message<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("operation", &self.operation)
            .field("sequence", &self.sequence)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
