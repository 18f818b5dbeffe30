//! End-to-end behaviour of `#[actor]` types on the default pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use core_actor::{actor, await_result, await_within, Actor, Mailbox, MessageError};
use rand::Rng;

const LONG: Duration = Duration::from_secs(10);

#[derive(Default)]
struct Recorder {
    mailbox: Mailbox<Recorder>,
    log: Mutex<Vec<usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[actor]
impl Recorder {
    /// Appends `index` after a short random delay.
    #[operation]
    pub fn record(&self, index: usize) -> usize {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let jitter = rand::thread_rng().gen_range(1..10);
        thread::sleep(Duration::from_millis(jitter));
        self.log.lock().unwrap().push(index);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        index
    }

    #[operation]
    pub fn worker_thread(&self) -> ThreadId {
        thread::current().id()
    }

    #[operation]
    pub fn slow(&self, delay: Duration) -> &'static str {
        thread::sleep(delay);
        "done"
    }

    #[operation]
    pub fn parse(&self, input: String) -> Result<u32, std::num::ParseIntError> {
        input.parse()
    }

    #[operation]
    pub fn checked(&self, value: i64) -> anyhow::Result<i64> {
        anyhow::ensure!(value >= 0, "negative value {}", value);
        Ok(value * 2)
    }

    #[operation]
    pub fn explode(&self) {
        panic!("recorder exploded");
    }

    #[operation]
    pub fn sum(&self, (a, b): (u32, u32)) -> u32 {
        a + b
    }

    #[operation]
    pub fn rendezvous(&self, barrier: Arc<Barrier>) -> bool {
        barrier.wait();
        true
    }

    /// Plain methods are left untouched.
    pub fn entries(&self) -> Vec<usize> {
        self.log.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct Inbox {
    inbox: Mailbox<Inbox>,
}

#[actor(mailbox = inbox)]
impl Inbox {
    #[operation]
    fn echo(&self, text: &'static str) -> &'static str {
        text
    }
}

#[test]
fn test_messages_run_in_enqueue_order() {
    let recorder = Arc::new(Recorder::default());

    let handles: Vec<_> = (0..20).map(|i| recorder.record(i)).collect();
    for (i, handle) in handles.iter().enumerate() {
        assert_eq!(handle.value(LONG).unwrap(), i);
    }

    assert_eq!(recorder.entries(), (0..20).collect::<Vec<_>>());
    assert_eq!(recorder.max_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_callers_never_overlap_on_one_instance() {
    let recorder = Arc::new(Recorder::default());

    let callers: Vec<_> = (0..4)
        .map(|caller| {
            let recorder = recorder.clone();
            thread::spawn(move || {
                (0..5)
                    .map(|i| recorder.record(caller * 5 + i))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for caller in callers {
        for handle in caller.join().unwrap() {
            handle.value(LONG).unwrap();
        }
    }

    assert_eq!(recorder.entries().len(), 20);
    assert_eq!(recorder.max_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn test_separate_instances_run_in_parallel() {
    let barrier = Arc::new(Barrier::new(2));
    let left = Arc::new(Recorder::default());
    let right = Arc::new(Recorder::default());

    let first = left.rendezvous(barrier.clone());
    let second = right.rendezvous(barrier);

    // Both bodies must be inside the barrier at the same time to finish.
    assert!(first.value(LONG).unwrap());
    assert!(second.value(LONG).unwrap());
}

#[test]
fn test_call_returns_before_body_runs() {
    let recorder = Arc::new(Recorder::default());

    let slow = recorder.slow(Duration::from_millis(200));
    assert!(!slow.is_resolved());
    assert!(recorder.mailbox().is_draining());

    assert_eq!(slow.value(LONG).unwrap(), "done");
}

#[test]
fn test_timed_out_read_can_be_retried() {
    let recorder = Arc::new(Recorder::default());
    let slow = recorder.slow(Duration::from_millis(200));

    let error = slow.value(Duration::from_millis(10)).unwrap_err();
    assert!(matches!(error, MessageError::TimedOut(d) if d == Duration::from_millis(10)));

    assert_eq!(slow.value(LONG).unwrap(), "done");
    assert_eq!(slow.value(Duration::from_millis(1)).unwrap(), "done");
    assert_eq!(slow.try_value().unwrap().unwrap(), "done");
}

#[test]
fn test_body_runs_off_the_calling_thread() {
    let recorder = Arc::new(Recorder::default());
    let caller = thread::current().id();

    let worker = recorder.worker_thread().value(LONG).unwrap();
    assert_ne!(worker, caller);
}

#[test]
fn test_then_runs_on_the_reading_thread() {
    let recorder = Arc::new(Recorder::default());
    let caller = thread::current().id();

    let (worker, reader) = recorder
        .worker_thread()
        .then(|worker| (worker, thread::current().id()))
        .unwrap();

    assert_ne!(worker, caller);
    assert_eq!(reader, caller);
}

#[test]
fn test_failures_surface_only_on_read() {
    let recorder = Arc::new(Recorder::default());

    let bad = recorder.parse("forty".to_string());
    let good = recorder.parse("42".to_string());

    assert_eq!(good.value(LONG).unwrap(), 42);

    let error = bad.value(LONG).unwrap_err();
    assert!(!error.is_timeout());
    assert!(error.downcast_ref::<std::num::ParseIntError>().is_some());
    assert_eq!(error.operation().map(|op| op.to_string()).as_deref(), Some("Recorder::parse"));

    // Every later read re-raises the same recorded failure.
    assert_eq!(bad.get().unwrap_err().to_string(), error.to_string());
}

#[test]
fn test_anyhow_bodies() {
    let recorder = Arc::new(Recorder::default());

    assert_eq!(recorder.checked(4).value(LONG).unwrap(), 8);
    let error = recorder.checked(-1).value(LONG).unwrap_err();
    assert!(error.to_string().contains("negative value -1"));
}

#[test]
fn test_panicking_body_is_contained() {
    let recorder = Arc::new(Recorder::default());

    let exploded = recorder.explode();
    let after = recorder.sum((2, 3));

    assert!(matches!(
        exploded.value(LONG),
        Err(MessageError::Panicked { message, .. }) if message == "recorder exploded"
    ));
    assert_eq!(after.value(LONG).unwrap(), 5);
}

#[test]
fn test_get_and_wait_use_default_timeout() {
    let recorder = Arc::new(Recorder::default());
    let message = recorder.sum((1, 1));

    assert_eq!(message.default_timeout(), core_actor::DEFAULT_WAIT_TIMEOUT);
    assert_eq!(message.get().unwrap(), 2);
    assert_eq!(message.wait().unwrap(), 2);
}

#[test]
fn test_registered_operations_are_listed() {
    let names: Vec<_> = Recorder::OPERATIONS.iter().map(|op| op.name()).collect();
    assert_eq!(
        names,
        ["record", "worker_thread", "slow", "parse", "checked", "explode", "sum", "rendezvous"]
    );
    assert!(Recorder::OPERATIONS.iter().all(|op| op.actor() == "Recorder"));
    assert!(!Recorder::responds_to("entries"));
    assert_eq!(Inbox::OPERATIONS.len(), 1);
}

#[test]
fn test_custom_mailbox_field() {
    let inbox = Arc::new(Inbox::default());
    assert_eq!(inbox.echo("hi").value(LONG).unwrap(), "hi");
    assert_eq!(inbox.inbox.enqueued_total(), 1);
}

#[test]
fn test_await_combinators() {
    let recorder = Arc::new(Recorder::default());

    assert_eq!(await_result(|| recorder.sum((20, 22))).unwrap(), 42);

    let error = await_within(Duration::from_millis(10), || {
        recorder.slow(Duration::from_millis(200))
    })
    .unwrap_err();
    assert!(error.is_timeout());
}

#[test]
fn test_handle_outlives_dropped_actor() {
    let recorder = Arc::new(Recorder::default());
    let message = recorder.sum((4, 4));
    drop(recorder);

    // Either the body ran before the drop or the message reports the drop.
    match message.value(LONG) {
        Ok(value) => assert_eq!(value, 8),
        Err(error) => assert!(matches!(error, MessageError::TargetDropped { .. })),
    }
}
