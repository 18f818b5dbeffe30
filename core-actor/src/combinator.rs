use std::time::Duration;

use crate::message::{Message, MessageError};

/// Calls `producer` and blocks for the value of the message it returns.
///
/// Uses the message's default timeout.
///
/// ```ignore
/// let total = core_actor::await_result(|| counter.add(5))?;
/// ```
pub fn await_result<T, F>(producer: F) -> Result<T, MessageError>
where
    T: Clone,
    F: FnOnce() -> Message<T>,
{
    producer().get()
}

/// [`await_result`] with an explicit timeout.
pub fn await_within<T, F>(timeout: Duration, producer: F) -> Result<T, MessageError>
where
    T: Clone,
    F: FnOnce() -> Message<T>,
{
    producer().value(timeout)
}
