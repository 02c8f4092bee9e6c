use super::queue::{CallQueue, run_deferred};
use super::timer::{TimerHandle, Timers};
use super::{Limiter, ThrottleError, non_zero};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Sliding-window throttle: at most `count` executions per rolling `window`
///
/// Execution timestamps are kept in a history that is trimmed from the front
/// as entries age out. A call that would push the history over `count` is
/// queued and a drain is armed; the drain releases up to `count` queued calls
/// at once and re-arms for a full window while anything is left.
///
/// The drain starts from an empty history rather than keeping entries that
/// are still inside the window, so right after a drain the window can admit
/// slightly more than `count` calls.
///
/// # Example
///
/// ```
/// use throttle_queue::CapacityThrottle;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let send = CapacityThrottle::new(|n: u32| println!("request {n}"), 5, Duration::from_secs(1)).unwrap();
///
/// for n in 0..20 {
///     send.call(n);
/// }
/// // Five went out, the rest leave five per second
/// assert_eq!(send.queued(), 15);
/// # }
/// ```
pub struct CapacityThrottle<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    f: Box<dyn Fn(A) + Send + Sync>,
    count: usize,
    window: Duration,
    timers: Timers,
    state: Mutex<State<A>>,
}

struct State<A> {
    timer: Option<TimerHandle>,
    /// Bumped on every arm; a drain only acts if it still matches
    generation: u64,
    queue: CallQueue<A>,
    history: VecDeque<Instant>,
    draining: bool,
}

impl<A> State<A> {
    fn busy(&self) -> bool {
        self.draining || self.timer.as_ref().is_some_and(TimerHandle::is_pending)
    }
}

impl<A: Send + 'static> CapacityThrottle<A> {
    /// Wrap `f` so it runs at most `count` times in any `window`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<F>(f: F, count: usize, window: Duration) -> Result<Self, ThrottleError>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_timers(Timers::tokio()?, f, count, window)
    }

    /// Same as [`CapacityThrottle::new`] with an explicit scheduler and clock
    pub fn with_timers<F>(
        timers: Timers,
        f: F,
        count: usize,
        window: Duration,
    ) -> Result<Self, ThrottleError>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        if count == 0 {
            return Err(ThrottleError::InvalidCapacity);
        }
        let window = non_zero(window, ThrottleError::InvalidWindow)?;

        Ok(CapacityThrottle {
            inner: Arc::new(Inner {
                f: Box::new(f),
                count,
                window,
                timers,
                state: Mutex::new(State {
                    timer: None,
                    generation: 0,
                    queue: CallQueue::new(),
                    history: VecDeque::new(),
                    draining: false,
                }),
            }),
        })
    }

    /// Invoke the throttled function
    ///
    /// Returns the drain timer active after this call, if any.
    pub fn call(&self, args: A) -> Option<TimerHandle> {
        let inner = &self.inner;
        let mut state = inner.state.lock();

        if state.busy() {
            state.queue.push(args, inner.timers.now());
            tracing::trace!(queued = state.queue.len(), "capacity throttle busy, call queued");
            return state.timer.clone();
        }

        if !state.queue.is_empty() {
            // Drain was cancelled with calls still waiting
            state.queue.push(args, inner.timers.now());
            let timer = Inner::arm(inner, &mut state, inner.window);
            tracing::warn!(
                queued = state.queue.len(),
                timer = timer.id(),
                "resuming paused capacity drain"
            );
            return Some(timer);
        }

        let now = inner.timers.now();
        state.history.push_back(now);
        while let Some(&oldest) = state.history.front() {
            if now.saturating_duration_since(oldest) >= inner.window {
                state.history.pop_front();
            } else {
                break;
            }
        }

        if state.history.len() > inner.count {
            // This call is already counted in the history even though it only
            // runs once the drain fires; the drain resets the history anyway.
            let last_run = state.history[state.history.len() - 2];
            let elapsed = now.saturating_duration_since(last_run);
            let delay = inner.window.saturating_sub(elapsed);
            let timer = Inner::arm(inner, &mut state, delay);
            tracing::debug!(
                history = state.history.len(),
                limit = inner.count,
                delay_ms = delay.as_millis() as u64,
                timer = timer.id(),
                "capacity exceeded, call deferred"
            );
            state.queue.push(args, now);
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

    /// Nothing is queued, no drain is pending and no batch is running
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.queue.is_empty() && !state.busy()
    }

    /// Executions currently recorded in the window history
    pub fn history_len(&self) -> usize {
        self.inner.state.lock().history.len()
    }
}

impl<A: Send + 'static> Inner<A> {
    fn arm(this: &Arc<Self>, state: &mut State<A>, delay: Duration) -> TimerHandle {
        state.generation += 1;
        let generation = state.generation;
        let inner = Arc::clone(this);
        let timer = this
            .timers
            .schedule(delay, move || Inner::drain(&inner, generation));
        state.timer = Some(timer.clone());
        timer
    }

    fn drain(this: &Arc<Self>, generation: u64) {
        {
            let mut state = this.state.lock();
            if state.generation != generation {
                tracing::trace!(generation, current = state.generation, "stale capacity drain ignored");
                return;
            }
            state.history.clear();
            state.draining = true;
        }

        let mut released = 0usize;
        loop {
            let mut state = this.state.lock();
            if state.history.len() >= this.count {
                break;
            }
            let Some(call) = state.queue.pop() else {
                break;
            };
            let now = this.timers.now();
            state.history.push_back(now);
            drop(state);

            run_deferred(&*this.f, call, now);
            released += 1;
        }

        let mut state = this.state.lock();
        state.draining = false;
        if state.queue.is_empty() {
            state.timer = None;
        } else {
            Inner::arm(this, &mut state, this.window);
        }
        tracing::debug!(
            released,
            remaining = state.queue.len(),
            "capacity window drained"
        );
    }
}

impl<A> Clone for CapacityThrottle<A> {
    fn clone(&self) -> Self {
        CapacityThrottle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Send + 'static> Limiter<A> for CapacityThrottle<A> {
    fn call(&self, args: A) -> Option<TimerHandle> {
        CapacityThrottle::call(self, args)
    }

    fn queued(&self) -> usize {
        CapacityThrottle::queued(self)
    }

    fn is_idle(&self) -> bool {
        CapacityThrottle::is_idle(self)
    }
}
