use super::queue::{CallQueue, run_deferred};
use super::timer::{TimerHandle, Timers};
use super::{Limiter, ThrottleError, non_zero};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Fixed-interval throttle
///
/// The first call runs immediately. After every execution a drain timer is
/// armed for `interval`; calls arriving while it is pending are queued and
/// released one per interval, oldest first. Nothing is ever dropped.
///
/// # Example
///
/// ```
/// use throttle_queue::Throttle;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let log = Throttle::new(|line: String| println!("{line}"), Duration::from_millis(100)).unwrap();
///
/// log.call("runs now".to_string());
/// let timer = log.call("runs in 100ms".to_string());
/// assert_eq!(log.queued(), 1);
///
/// // The returned timer can be cancelled to pause the drain
/// timer.unwrap().cancel();
/// # }
/// ```
pub struct Throttle<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    f: Box<dyn Fn(A) + Send + Sync>,
    interval: Duration,
    timers: Timers,
    state: Mutex<State<A>>,
}

struct State<A> {
    timer: Option<TimerHandle>,
    /// Bumped on every arm; a drain only acts if it still matches
    generation: u64,
    queue: CallQueue<A>,
}

impl<A: Send + 'static> Throttle<A> {
    /// Wrap `f` so it runs at most once per `interval`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<F>(f: F, interval: Duration) -> Result<Self, ThrottleError>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_timers(Timers::tokio()?, f, interval)
    }

    /// Same as [`Throttle::new`] with an explicit scheduler and clock
    pub fn with_timers<F>(timers: Timers, f: F, interval: Duration) -> Result<Self, ThrottleError>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        let interval = non_zero(interval, ThrottleError::InvalidInterval)?;

        Ok(Throttle {
            inner: Arc::new(Inner {
                f: Box::new(f),
                interval,
                timers,
                state: Mutex::new(State {
                    timer: None,
                    generation: 0,
                    queue: CallQueue::new(),
                }),
            }),
        })
    }

    /// Invoke the throttled function
    ///
    /// Runs `f` synchronously when no drain is pending, otherwise queues the
    /// call. Returns the drain timer active after this call.
    pub fn call(&self, args: A) -> Option<TimerHandle> {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if state.timer.as_ref().is_some_and(TimerHandle::is_pending) {
            state.queue.push(args, inner.timers.now());
            tracing::trace!(queued = state.queue.len(), "throttle busy, call queued");
            return state.timer.clone();
        }

        if !state.queue.is_empty() {
            // Drain was cancelled with calls still waiting
            state.queue.push(args, inner.timers.now());
            let timer = Inner::arm(inner, &mut state);
            tracing::warn!(
                queued = state.queue.len(),
                timer = timer.id(),
                "resuming paused throttle drain"
            );
            return Some(timer);
        }

        // Armed before running so re-entrant calls from `f` get queued
        let timer = Inner::arm(inner, &mut state);
        drop(state);

        (inner.f)(args);
        Some(timer)
    }

    /// Number of calls waiting to be drained
    pub fn queued(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Nothing is queued and no drain timer is pending
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.queue.is_empty() && !state.timer.as_ref().is_some_and(TimerHandle::is_pending)
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl<A: Send + 'static> Inner<A> {
    /// Schedule the next drain and make it the current timer
    fn arm(this: &Arc<Self>, state: &mut State<A>) -> TimerHandle {
        state.generation += 1;
        let generation = state.generation;
        let inner = Arc::clone(this);
        let timer = this
            .timers
            .schedule(this.interval, move || Inner::drain(&inner, generation));
        state.timer = Some(timer.clone());
        timer
    }

    fn drain(this: &Arc<Self>, generation: u64) {
        let mut state = this.state.lock();
        if state.generation != generation {
            // A call re-armed between this timer firing and taking the lock
            tracing::trace!(generation, current = state.generation, "stale throttle drain ignored");
            return;
        }

        let Some(call) = state.queue.pop() else {
            state.timer = None;
            return;
        };

        let timer = Inner::arm(this, &mut state);
        tracing::debug!(
            remaining = state.queue.len(),
            timer = timer.id(),
            "throttle drained one call"
        );
        drop(state);

        run_deferred(&*this.f, call, this.timers.now());
    }
}

impl<A> Clone for Throttle<A> {
    fn clone(&self) -> Self {
        Throttle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Send + 'static> Limiter<A> for Throttle<A> {
    fn call(&self, args: A) -> Option<TimerHandle> {
        Throttle::call(self, args)
    }

    fn queued(&self) -> usize {
        Throttle::queued(self)
    }

    fn is_idle(&self) -> bool {
        Throttle::is_idle(self)
    }
}
