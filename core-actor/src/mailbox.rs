//! Per-instance FIFO mailbox.
//!
//! The queue and the `draining` flag live under one lock. Enqueueing onto a
//! mailbox that is not draining flips the flag and asks the caller to start
//! a drain pass; the pass clears the flag in the same critical section that
//! finds the queue empty. At most one pass per mailbox can therefore exist,
//! even when a message is enqueued while the last one is still running.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, OnceLock};

use bridge_traits::TaskScheduler;
use core_async::sync::CompletionSlot;
use parking_lot::Mutex;
use tracing::trace;

use crate::context::{self, DispatchContext};
use crate::dispatcher;
use crate::envelope::Envelope;
use crate::message::{Continuation, Message, MessageError};
use crate::operation::Operation;

/// Queue of pending operation calls owned by one actor instance.
///
/// The queue itself is created on first use, picking up either the context
/// passed to [`Mailbox::with_context`] or the process default.
pub struct Mailbox<A> {
    core: OnceLock<Arc<MailboxCore<A>>>,
    context: Option<DispatchContext>,
}

impl<A> Mailbox<A> {
    /// Mailbox using the process-wide default context.
    pub fn new() -> Self {
        Self {
            core: OnceLock::new(),
            context: None,
        }
    }

    /// Mailbox bound to an explicit context.
    pub fn with_context(context: DispatchContext) -> Self {
        Self {
            core: OnceLock::new(),
            context: Some(context),
        }
    }

    /// Mailbox bound to `scheduler` with the default read timeout.
    pub fn with_scheduler(scheduler: Arc<dyn TaskScheduler>) -> Self {
        Self::with_context(DispatchContext::new(scheduler))
    }

    /// Messages waiting to run, excluding one currently executing.
    pub fn len(&self) -> usize {
        self.core.get().map_or(0, |core| core.state.lock().queue.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a drain pass is scheduled or running.
    pub fn is_draining(&self) -> bool {
        self.core.get().is_some_and(|core| core.state.lock().draining)
    }

    /// Number of messages ever enqueued.
    pub fn enqueued_total(&self) -> u64 {
        self.core.get().map_or(0, |core| core.state.lock().next_sequence)
    }

    fn core(&self) -> &Arc<MailboxCore<A>> {
        self.core.get_or_init(|| {
            let context = self.context.clone().unwrap_or_else(context::current);
            Arc::new(MailboxCore::new(context))
        })
    }
}

impl<A: Send + Sync + 'static> Mailbox<A> {
    /// Enqueues operation `O` against `target`.
    ///
    /// Returns immediately. A drain pass is submitted only when this call
    /// moved the mailbox from idle to busy.
    pub fn dispatch<O: Operation<A>>(
        &self,
        target: &Arc<A>,
        args: O::Args,
        continuation: Option<Continuation<O::Output>>,
    ) -> Message<O::Output> {
        let core = self.core();
        let slot = Arc::new(CompletionSlot::new());
        let envelope = Envelope::new::<O>(target, args, slot.clone(), continuation);

        let enqueued = core.enqueue(envelope);
        trace!(
            operation = %O::ID,
            sequence = enqueued.sequence,
            queued = enqueued.len,
            "Enqueued message"
        );
        if enqueued.start_drainer {
            dispatcher::start(core);
        }

        Message::new(O::ID, enqueued.sequence, slot, core.context.default_timeout())
    }
}

impl<A> Default for Mailbox<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Mailbox<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("len", &self.len())
            .field("draining", &self.is_draining())
            .field("enqueued_total", &self.enqueued_total())
            .finish()
    }
}

pub(crate) struct MailboxCore<A> {
    state: Mutex<QueueState<A>>,
    pub(crate) context: DispatchContext,
}

struct QueueState<A> {
    queue: VecDeque<Envelope<A>>,
    draining: bool,
    next_sequence: u64,
}

/// Result of appending to a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Enqueued {
    pub sequence: u64,
    pub len: usize,
    pub start_drainer: bool,
}

impl<A> MailboxCore<A> {
    fn new(context: DispatchContext) -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                draining: false,
                next_sequence: 0,
            }),
            context,
        }
    }

    pub(crate) fn enqueue(&self, mut envelope: Envelope<A>) -> Enqueued {
        let mut state = self.state.lock();
        state.next_sequence += 1;
        let sequence = state.next_sequence;
        envelope.set_sequence(sequence);
        state.queue.push_back(envelope);

        let start_drainer = !state.draining;
        state.draining = true;

        Enqueued {
            sequence,
            len: state.queue.len(),
            start_drainer,
        }
    }

    /// Next message in FIFO order; `None` also ends the drain pass.
    pub(crate) fn pop(&self) -> Option<Envelope<A>> {
        let mut state = self.state.lock();
        let envelope = state.queue.pop_front();
        if envelope.is_none() {
            state.draining = false;
        }
        envelope
    }

    /// Ends the pending drain pass and fails every queued message.
    pub(crate) fn reject_all(&self, reason: &str) -> usize {
        let rejected: Vec<Envelope<A>> = {
            let mut state = self.state.lock();
            state.draining = false;
            state.queue.drain(..).collect()
        };

        let count = rejected.len();
        for envelope in rejected {
            let operation = envelope.operation();
            envelope.fail(MessageError::Rejected {
                operation,
                reason: reason.to_string(),
            });
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Actor, DispatchToken, OperationId, OperationResult};
    use crate::{dispatch, dispatch_with};
    use bridge_traits::{BridgeError, Job, TaskHandle};
    use mockall::mock;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    mock! {
        pub Scheduler {}

        impl TaskScheduler for Scheduler {
            fn name(&self) -> &'static str;
            fn submit(&self, job: Job) -> bridge_traits::error::Result<TaskHandle>;
        }
    }

    struct Counter {
        mailbox: Mailbox<Counter>,
        total: AtomicU64,
    }

    impl Actor for Counter {
        const OPERATIONS: &'static [OperationId] = &[Add::ID, Fail::ID, Hold::ID];

        fn mailbox(&self) -> &Mailbox<Self> {
            &self.mailbox
        }
    }

    struct Add;

    impl Operation<Counter> for Add {
        type Args = (u64,);
        type Output = u64;
        const ID: OperationId = OperationId::new("Counter", "add");

        fn invoke(target: &Counter, (amount,): (u64,), _: DispatchToken) -> OperationResult<u64> {
            Ok(target.total.fetch_add(amount, Ordering::SeqCst) + amount)
        }
    }

    struct Fail;

    impl Operation<Counter> for Fail {
        type Args = ();
        type Output = ();
        const ID: OperationId = OperationId::new("Counter", "fail");

        fn invoke(_: &Counter, _: (), _: DispatchToken) -> OperationResult<()> {
            anyhow::bail!("refused")
        }
    }

    /// Signals that it started, then waits for release before reading the total.
    struct Hold;

    impl Operation<Counter> for Hold {
        type Args = (mpsc::Sender<()>, mpsc::Receiver<()>);
        type Output = u64;
        const ID: OperationId = OperationId::new("Counter", "hold");

        fn invoke(
            target: &Counter,
            (started, release): Self::Args,
            _: DispatchToken,
        ) -> OperationResult<u64> {
            started.send(())?;
            release.recv()?;
            Ok(target.total.load(Ordering::SeqCst))
        }
    }

    /// Scheduler that holds jobs until the test runs them.
    fn manual_scheduler(expected_submits: usize) -> (Arc<MockScheduler>, Arc<Mutex<Vec<Job>>>) {
        let jobs: Arc<Mutex<Vec<Job>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = jobs.clone();

        let mut scheduler = MockScheduler::new();
        scheduler.expect_name().return_const("manual");
        scheduler
            .expect_submit()
            .times(expected_submits)
            .returning(move |job| {
                let (handle, job) = TaskHandle::track(job);
                captured.lock().push(job);
                Ok(handle)
            });

        (Arc::new(scheduler), jobs)
    }

    fn run_pending(jobs: &Mutex<Vec<Job>>) {
        let pending: Vec<Job> = jobs.lock().drain(..).collect();
        for job in pending {
            job();
        }
    }

    fn counter(scheduler: Arc<MockScheduler>) -> Arc<Counter> {
        Arc::new(Counter {
            mailbox: Mailbox::with_scheduler(scheduler),
            total: AtomicU64::new(0),
        })
    }

    #[test]
    fn test_one_submit_per_idle_to_busy_transition() {
        let (scheduler, jobs) = manual_scheduler(2);
        let counter = counter(scheduler);

        let first = dispatch::<Counter, Add>(&counter, (1,));
        let second = dispatch::<Counter, Add>(&counter, (2,));
        let third = dispatch::<Counter, Add>(&counter, (3,));

        assert_eq!(jobs.lock().len(), 1);
        assert_eq!(counter.mailbox.len(), 3);
        assert!(counter.mailbox.is_draining());
        assert!(!first.is_resolved());

        run_pending(&jobs);

        assert_eq!(first.get().unwrap(), 1);
        assert_eq!(second.get().unwrap(), 3);
        assert_eq!(third.get().unwrap(), 6);
        assert!(counter.mailbox.is_empty());
        assert!(!counter.mailbox.is_draining());

        let fourth = dispatch::<Counter, Add>(&counter, (4,));
        run_pending(&jobs);
        assert_eq!(fourth.get().unwrap(), 10);
        assert_eq!(fourth.sequence(), 4);
        assert_eq!(counter.mailbox.enqueued_total(), 4);
    }

    #[test]
    fn test_enqueue_during_running_pass_does_not_resubmit() {
        let (scheduler, jobs) = manual_scheduler(2);
        let counter = counter(scheduler);

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let held = dispatch::<Counter, Hold>(&counter, (started_tx, release_rx));

        let job = jobs.lock().pop().unwrap();
        let pass = thread::spawn(job);
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // The running message has been popped but the pass is still live.
        assert!(counter.mailbox.is_empty());
        assert!(counter.mailbox.is_draining());

        let queued = dispatch::<Counter, Add>(&counter, (5,));
        assert!(jobs.lock().is_empty());
        assert_eq!(counter.mailbox.len(), 1);

        release_tx.send(()).unwrap();
        pass.join().unwrap();

        // `Hold` read the total before `Add` ran on the same pass.
        assert_eq!(held.get().unwrap(), 0);
        assert_eq!(queued.get().unwrap(), 5);
        assert!(!counter.mailbox.is_draining());

        let next = dispatch::<Counter, Add>(&counter, (1,));
        assert_eq!(jobs.lock().len(), 1);
        run_pending(&jobs);
        assert_eq!(next.get().unwrap(), 6);
    }

    #[test]
    fn test_job_dropped_during_submit_rejects_queue() {
        let mut scheduler = MockScheduler::new();
        scheduler.expect_name().return_const("lossy");
        scheduler.expect_submit().times(2).returning(|job| {
            let (handle, _) = TaskHandle::track(job);
            Ok(handle)
        });
        let counter = counter(Arc::new(scheduler));

        let message = dispatch::<Counter, Add>(&counter, (1,));
        assert!(matches!(
            message.value(Duration::from_secs(1)),
            Err(MessageError::Rejected { reason, .. }) if reason == "drain pass dropped by scheduler"
        ));
        assert!(!counter.mailbox.is_draining());

        let retry = dispatch::<Counter, Add>(&counter, (1,));
        assert!(matches!(retry.get(), Err(MessageError::Rejected { .. })));
        assert_eq!(counter.total.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_job_dropped_after_submit_rejects_queue() {
        let (scheduler, jobs) = manual_scheduler(2);
        let counter = counter(scheduler);

        let first = dispatch::<Counter, Add>(&counter, (1,));
        let second = dispatch::<Counter, Add>(&counter, (2,));
        assert!(!first.is_resolved());

        jobs.lock().clear();

        assert!(matches!(first.get(), Err(MessageError::Rejected { .. })));
        assert!(matches!(second.get(), Err(MessageError::Rejected { .. })));
        assert!(!counter.mailbox.is_draining());

        let third = dispatch::<Counter, Add>(&counter, (3,));
        run_pending(&jobs);
        assert_eq!(third.get().unwrap(), 3);
    }

    #[test]
    fn test_rejected_drain_fails_queued_messages() {
        let mut scheduler = MockScheduler::new();
        scheduler.expect_name().return_const("closed");
        scheduler
            .expect_submit()
            .times(2)
            .returning(|_| Err(BridgeError::Rejected("shutting down".to_string())));
        let counter = counter(Arc::new(scheduler));

        let message = dispatch::<Counter, Add>(&counter, (1,));
        let error = message.get().unwrap_err();
        assert!(matches!(
            &error,
            MessageError::Rejected { operation, reason }
                if *operation == Add::ID && reason.contains("shutting down")
        ));
        assert!(!counter.mailbox.is_draining());

        // The mailbox stays usable and retries scheduling on the next call.
        let retry = dispatch::<Counter, Add>(&counter, (1,));
        assert!(matches!(retry.get(), Err(MessageError::Rejected { .. })));
        assert_eq!(counter.total.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failure_is_deferred_to_read() {
        let (scheduler, jobs) = manual_scheduler(1);
        let counter = counter(scheduler);

        let failed = dispatch::<Counter, Fail>(&counter, ());
        let after = dispatch::<Counter, Add>(&counter, (5,));
        run_pending(&jobs);

        let error = failed.get().unwrap_err();
        assert_eq!(error.body_error().map(|e| e.to_string()), Some("refused".into()));
        assert_eq!(after.get().unwrap(), 5);
    }

    #[test]
    fn test_dropped_target_resolves_queued_messages() {
        let (scheduler, jobs) = manual_scheduler(1);
        let counter = counter(scheduler);

        let message = dispatch::<Counter, Add>(&counter, (1,));
        drop(counter);
        run_pending(&jobs);

        assert!(matches!(
            message.value(Duration::from_secs(1)),
            Err(MessageError::TargetDropped { operation }) if operation == Add::ID
        ));
    }

    #[test]
    fn test_continuation_runs_after_result_is_written() {
        let (scheduler, jobs) = manual_scheduler(1);
        let counter = counter(scheduler);

        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let message = dispatch_with::<Counter, Add>(
            &counter,
            (7,),
            Box::new(move |result| {
                *sink.lock() = Some(result.as_ref().ok().copied());
            }),
        );
        run_pending(&jobs);

        assert_eq!(message.get().unwrap(), 7);
        assert_eq!(*seen.lock(), Some(Some(7)));
    }

    #[test]
    fn test_direct_invoke_matches_dispatched_result() {
        let (scheduler, jobs) = manual_scheduler(1);
        let queued = counter(scheduler);
        let (direct_scheduler, _) = manual_scheduler(0);
        let direct = counter(direct_scheduler);

        let message = dispatch::<Counter, Add>(&queued, (11,));
        run_pending(&jobs);

        let value = Add::invoke(&direct, (11,), DispatchToken::new()).unwrap();
        assert_eq!(message.get().unwrap(), value);
    }

    #[test]
    fn test_enqueue_reports_position() {
        let (scheduler, _jobs) = manual_scheduler(0);
        let counter = counter(scheduler);
        let core = MailboxCore::<Counter>::new(counter.mailbox.core().context.clone());

        let first = core.enqueue(Envelope::new::<Add>(&counter, (1,), Arc::default(), None));
        let second = core.enqueue(Envelope::new::<Add>(&counter, (2,), Arc::default(), None));

        assert_eq!(first, Enqueued { sequence: 1, len: 1, start_drainer: true });
        assert_eq!(second, Enqueued { sequence: 2, len: 2, start_drainer: false });
        assert_eq!(core.reject_all("test"), 2);
        assert!(core.pop().is_none());
    }

    #[test]
    fn test_responds_to_registered_operations() {
        assert!(Counter::responds_to("add"));
        assert!(Counter::responds_to("fail"));
        assert!(Counter::responds_to("hold"));
        assert!(!Counter::responds_to("total"));
    }
}
