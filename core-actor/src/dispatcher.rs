//! Drain passes.

use std::any::type_name;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use bridge_traits::Job;
use tracing::{debug, debug_span, error, trace, warn};

use crate::mailbox::MailboxCore;
use crate::operation::DispatchToken;

const DROPPED_REASON: &str = "drain pass dropped by scheduler";

const SUBMITTING: u8 = 0;
const ACCEPTED: u8 = 1;
const ABANDONED: u8 = 2;

/// Submits one drain pass for `core` to its scheduler.
///
/// If the scheduler refuses the job, or accepts it and then drops it without
/// running it, every queued message is resolved with a rejection instead of
/// waiting for a pass that will never run.
pub(crate) fn start<A>(core: &Arc<MailboxCore<A>>)
where
    A: Send + Sync + 'static,
{
    let state = Arc::new(AtomicU8::new(SUBMITTING));
    let pass = DrainPass {
        core: Some(core.clone()),
        state: state.clone(),
    };
    let job: Job = Box::new(move || pass.run());

    let scheduler = core.context.scheduler();
    match scheduler.submit(job) {
        Ok(handle) => {
            // A job dropped during `submit` leaves the rejection to us.
            if state
                .compare_exchange(SUBMITTING, ACCEPTED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                abandon(core, scheduler.name());
            } else {
                trace!(backend = scheduler.name(), task_id = %handle.id(), "Drain pass scheduled");
            }
        }
        Err(e) => {
            let reason = e.to_string();
            let rejected = core.reject_all(&reason);
            error!(
                actor = type_name::<A>(),
                backend = scheduler.name(),
                rejected,
                "Scheduler refused drain pass: {}",
                reason
            );
        }
    }
}

fn abandon<A>(core: &MailboxCore<A>, backend: &str) {
    let rejected = core.reject_all(DROPPED_REASON);
    warn!(
        actor = type_name::<A>(),
        backend, rejected, "Scheduler dropped drain pass without running it"
    );
}

/// The submitted job. Resets the mailbox if dropped unrun.
struct DrainPass<A> {
    core: Option<Arc<MailboxCore<A>>>,
    state: Arc<AtomicU8>,
}

impl<A> DrainPass<A> {
    fn run(mut self) {
        if let Some(core) = self.core.take() {
            drain(&core);
        }
    }
}

impl<A> Drop for DrainPass<A> {
    fn drop(&mut self) {
        let Some(core) = self.core.take() else {
            return;
        };

        // While `submit` is still on the stack, `start` sees the outcome.
        let dropped_during_submit = self
            .state
            .compare_exchange(SUBMITTING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !dropped_during_submit {
            abandon(&core, core.context.scheduler().name());
        }
    }
}

/// Runs queued messages in FIFO order until the mailbox is empty.
fn drain<A>(core: &MailboxCore<A>) {
    let span = debug_span!("drain", actor = type_name::<A>());
    let _guard = span.enter();

    debug!("Drain pass started");
    let mut processed = 0_usize;
    while let Some(envelope) = core.pop() {
        trace!(
            operation = %envelope.operation(),
            sequence = envelope.sequence(),
            "Running message"
        );
        envelope.run(DispatchToken::new());
        processed += 1;
    }
    debug!(processed, "Drain pass finished");
}
