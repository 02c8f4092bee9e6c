use super::ThrottleError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to a callback scheduled to run after a delay
///
/// The handle owns an explicit pending flag: it is set when the timer is
/// created and cleared exactly once, either when the callback fires or when
/// the timer is cancelled. Clones share the same flag.
///
/// # Example
///
/// ```
/// use throttle_queue::{Scheduler, TokioScheduler};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let scheduler = TokioScheduler::current().unwrap();
/// let timer = scheduler.schedule(Duration::from_secs(60), Box::new(|| println!("fired")));
///
/// assert!(timer.is_pending());
/// assert!(timer.cancel());
/// assert!(!timer.is_pending());
/// # }
/// ```
#[derive(Clone)]
pub struct TimerHandle {
    inner: Arc<TimerState>,
}

struct TimerState {
    id: u64,
    pending: AtomicBool,
    task: Mutex<Option<AbortHandle>>,
}

impl TimerHandle {
    /// Create a pending handle that is not yet bound to a task
    ///
    /// Custom [`Scheduler`] implementations create one of these, arrange for
    /// [`TimerHandle::fire`] to be called after the delay, and only run the
    /// callback when `fire` returns `true`.
    pub fn new() -> Self {
        TimerHandle {
            inner: Arc::new(TimerState {
                id: NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed),
                pending: AtomicBool::new(true),
                task: Mutex::new(None),
            }),
        }
    }

    /// Whether the callback has neither fired nor been cancelled
    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Cancel the timer
    ///
    /// Returns `true` if the timer was still pending. Cancelling a timer that
    /// already fired is a no-op.
    pub fn cancel(&self) -> bool {
        let was_pending = self.inner.pending.swap(false, Ordering::AcqRel);
        if let Some(task) = self.inner.task.lock().take() {
            task.abort();
        }
        was_pending
    }

    /// Mark the timer as fired
    ///
    /// Returns `true` if the caller should run the callback, which happens at
    /// most once per timer and never after a cancel.
    pub fn fire(&self) -> bool {
        self.inner.pending.swap(false, Ordering::AcqRel)
    }

    /// Process-unique identifier, for logging
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    fn bind(&self, task: AbortHandle) {
        let mut slot = self.inner.task.lock();
        if self.is_pending() {
            *slot = Some(task);
        } else {
            // Cancelled between spawn and bind
            task.abort();
        }
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TimerHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TimerHandle {}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.inner.id)
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Schedules delayed callbacks
pub trait Scheduler: Send + Sync + 'static {
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce() + Send + 'static>) -> TimerHandle;
}

/// Monotonic time source
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// [`Scheduler`] backed by tokio tasks and `tokio::time`
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// Schedule on the given runtime
    pub fn new(runtime: Handle) -> Self {
        TokioScheduler { runtime }
    }

    /// Schedule on the runtime the caller is running in
    pub fn current() -> Result<Self, ThrottleError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| ThrottleError::NoRuntime)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce() + Send + 'static>) -> TimerHandle {
        let timer = TimerHandle::new();
        // Deadline is fixed now, not when the task first gets polled
        let deadline = Instant::now() + delay;

        let fired = timer.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if fired.fire() {
                callback();
            }
        });

        timer.bind(task.abort_handle());
        timer
    }
}

/// [`Clock`] reading `tokio::time::Instant`, which honours paused test time
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Scheduler and clock shared by a throttle
#[derive(Clone)]
pub struct Timers {
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
}

impl Timers {
    pub fn new(scheduler: Arc<dyn Scheduler>, clock: Arc<dyn Clock>) -> Self {
        Timers { scheduler, clock }
    }

    /// Tokio scheduler on the current runtime plus the tokio clock
    pub fn tokio() -> Result<Self, ThrottleError> {
        Ok(Timers::new(
            Arc::new(TokioScheduler::current()?),
            Arc::new(TokioClock),
        ))
    }

    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.scheduler.schedule(delay, Box::new(callback))
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }
}

impl fmt::Debug for Timers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timers").finish_non_exhaustive()
    }
}
