use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::time::Instant;

/// A deferred invocation: the captured arguments plus when they were queued
#[derive(Debug)]
pub(crate) struct PendingCall<A> {
    pub(crate) args: A,
    pub(crate) enqueued_at: Instant,
}

/// Unbounded FIFO of deferred calls owned by a single throttle
#[derive(Debug)]
pub(crate) struct CallQueue<A> {
    calls: VecDeque<PendingCall<A>>,
}

impl<A> CallQueue<A> {
    pub(crate) fn new() -> Self {
        CallQueue {
            calls: VecDeque::new(),
        }
    }

    /// Append a call stamped with the owning throttle's clock
    pub(crate) fn push(&mut self, args: A, enqueued_at: Instant) {
        self.calls.push_back(PendingCall { args, enqueued_at });
    }

    pub(crate) fn pop(&mut self) -> Option<PendingCall<A>> {
        self.calls.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Run a dequeued call from inside a timer callback
///
/// A panic here has no caller to unwind into, so it is logged and swallowed
/// and the drain keeps going.
pub(crate) fn run_deferred<A, F>(f: &F, call: PendingCall<A>, now: Instant)
where
    F: Fn(A) + ?Sized,
{
    let waited = now.saturating_duration_since(call.enqueued_at);
    tracing::trace!(waited_ms = waited.as_millis() as u64, "running deferred call");

    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| f(call.args))) {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!("Deferred call panicked: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_queue_is_fifo() {
        let now = Instant::now();
        let mut queue = CallQueue::new();
        for i in 0..5 {
            queue.push(i, now);
        }
        assert_eq!(queue.len(), 5);

        let drained: Vec<i32> = std::iter::from_fn(|| queue.pop().map(|c| c.args)).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_run_deferred_swallows_panic() {
        let seen = Mutex::new(Vec::new());
        let f = |n: i32| {
            if n == 1 {
                panic!("boom");
            }
            seen.lock().unwrap().push(n);
        };

        let now = Instant::now();
        let mut queue = CallQueue::new();
        for i in 0..3 {
            queue.push(i, now);
        }
        while let Some(call) = queue.pop() {
            run_deferred(&f, call, now);
        }

        assert_eq!(*seen.lock().unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_push_keeps_given_timestamp() {
        let base = Instant::now();
        let later = base + Duration::from_secs(30);

        let mut queue = CallQueue::new();
        queue.push('a', later);
        queue.push('b', base);

        assert_eq!(queue.pop().map(|c| c.enqueued_at), Some(later));
        assert_eq!(queue.pop().map(|c| c.enqueued_at), Some(base));
    }
}
