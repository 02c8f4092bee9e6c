use super::queue::{CallQueue, run_deferred};
use super::timer::{TimerHandle, Timers};
use super::{Limiter, ThrottleError, non_zero};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Throttle that lets short bursts through before falling back to a steady rate
///
/// Up to `burst_size` calls run immediately within a burst window. Once the
/// allowance is used up, further calls are queued and drained one per
/// `interval`. The allowance is restored `burst_window` after the first call
/// of each window, independently of the drain.
///
/// # Example
///
/// ```
/// use throttle_queue::BurstThrottle;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let redraw = BurstThrottle::new(
///     |frame: u32| println!("frame {frame}"),
///     3,                          // burst size
///     Duration::from_secs(1),     // burst window
///     Duration::from_millis(200), // drain interval
/// )
/// .unwrap();
///
/// for frame in 0..5 {
///     redraw.call(frame);
/// }
/// assert_eq!(redraw.queued(), 2);
/// # }
/// ```
pub struct BurstThrottle<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    f: Box<dyn Fn(A) + Send + Sync>,
    burst_size: usize,
    burst_window: Duration,
    interval: Duration,
    timers: Timers,
    state: Mutex<State<A>>,
}

struct State<A> {
    timer: Option<TimerHandle>,
    reset_timer: Option<TimerHandle>,
    /// Arm counters; a fired timer only acts if its counter still matches
    generation: u64,
    reset_generation: u64,
    burst: usize,
    queue: CallQueue<A>,
}

impl<A: Send + 'static> BurstThrottle<A> {
    /// Wrap `f` with a burst allowance of `burst_size` per `burst_window`,
    /// draining overflow every `interval`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<F>(
        f: F,
        burst_size: usize,
        burst_window: Duration,
        interval: Duration,
    ) -> Result<Self, ThrottleError>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_timers(Timers::tokio()?, f, burst_size, burst_window, interval)
    }

    /// Same as [`BurstThrottle::new`] with an explicit scheduler and clock
    pub fn with_timers<F>(
        timers: Timers,
        f: F,
        burst_size: usize,
        burst_window: Duration,
        interval: Duration,
    ) -> Result<Self, ThrottleError>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        if burst_size == 0 {
            return Err(ThrottleError::InvalidBurstSize);
        }
        let burst_window = non_zero(burst_window, ThrottleError::InvalidBurstWindow)?;
        let interval = non_zero(interval, ThrottleError::InvalidInterval)?;

        Ok(BurstThrottle {
            inner: Arc::new(Inner {
                f: Box::new(f),
                burst_size,
                burst_window,
                interval,
                timers,
                state: Mutex::new(State {
                    timer: None,
                    reset_timer: None,
                    generation: 0,
                    reset_generation: 0,
                    burst: 0,
                    queue: CallQueue::new(),
                }),
            }),
        })
    }

    /// Invoke the throttled function
    ///
    /// Returns the drain timer active after this call, or `None` while calls
    /// are running straight out of the burst allowance.
    pub fn call(&self, args: A) -> Option<TimerHandle> {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if state.timer.as_ref().is_some_and(TimerHandle::is_pending) {
            state.queue.push(args, inner.timers.now());
            tracing::trace!(queued = state.queue.len(), "burst throttle draining, call queued");
            return state.timer.clone();
        }

        if !state.queue.is_empty() {
            // Drain was cancelled with calls still waiting
            state.queue.push(args, inner.timers.now());
            let timer = Inner::arm(inner, &mut state);
            tracing::warn!(
                queued = state.queue.len(),
                timer = timer.id(),
                "resuming paused burst drain"
            );
            return Some(timer);
        }

        state.burst += 1;
        if !state.reset_timer.as_ref().is_some_and(TimerHandle::is_pending) {
            Inner::arm_reset(inner, &mut state);
        }

        if state.burst > inner.burst_size {
            let timer = Inner::arm(inner, &mut state);
            tracing::debug!(
                burst = state.burst,
                limit = inner.burst_size,
                timer = timer.id(),
                "burst allowance exhausted, falling back to interval drain"
            );
            state.queue.push(args, inner.timers.now());
            return Some(timer);
        }

        let timer = state.timer.clone();
        drop(state);

        (inner.f)(args);
        timer
    }

    /// Number of calls waiting to be drained
    pub fn queued(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Calls counted against the current burst window
    pub fn burst_count(&self) -> usize {
        self.inner.state.lock().burst
    }

    /// Nothing is queued and no drain timer is pending
    ///
    /// The burst reset timer is not a drain and does not count.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.queue.is_empty() && !state.timer.as_ref().is_some_and(TimerHandle::is_pending)
    }
}

impl<A: Send + 'static> Inner<A> {
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

    fn arm_reset(this: &Arc<Self>, state: &mut State<A>) {
        state.reset_generation += 1;
        let generation = state.reset_generation;
        let inner = Arc::clone(this);
        let timer = this.timers.schedule(this.burst_window, move || {
            let mut state = inner.state.lock();
            if state.reset_generation != generation {
                tracing::trace!(generation, "stale burst reset ignored");
                return;
            }
            tracing::debug!(burst = state.burst, "burst window elapsed, allowance restored");
            state.burst = 0;
            state.reset_timer = None;
        });
        state.reset_timer = Some(timer);
    }

    fn drain(this: &Arc<Self>, generation: u64) {
        let mut state = this.state.lock();
        if state.generation != generation {
            tracing::trace!(generation, current = state.generation, "stale burst drain ignored");
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
            "burst throttle drained one call"
        );
        drop(state);

        run_deferred(&*this.f, call, this.timers.now());
    }
}

impl<A> Clone for BurstThrottle<A> {
    fn clone(&self) -> Self {
        BurstThrottle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Send + 'static> Limiter<A> for BurstThrottle<A> {
    fn call(&self, args: A) -> Option<TimerHandle> {
        BurstThrottle::call(self, args)
    }

    fn queued(&self) -> usize {
        BurstThrottle::queued(self)
    }

    fn is_idle(&self) -> bool {
        BurstThrottle::is_idle(self)
    }
}
