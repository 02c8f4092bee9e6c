//! Hand-driven scheduler and clock for tests that need to interleave timer
//! callbacks with calls deterministically

use super::timer::{Clock, Scheduler, TimerHandle, Timers};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Records every scheduled timer; nothing fires until a test says so
#[derive(Clone, Default)]
pub(crate) struct ManualScheduler {
    timers: Arc<Mutex<Vec<(TimerHandle, Duration, Option<Callback>)>>>,
}

impl ManualScheduler {
    /// Mark timer `index` as fired and return its callback without running it
    ///
    /// Panics if the timer was already fired or cancelled.
    pub(crate) fn fire(&self, index: usize) -> Callback {
        let mut timers = self.timers.lock();
        let (timer, _, callback) = &mut timers[index];
        assert!(timer.fire(), "timer {index} is not pending");
        callback.take().expect("callback already taken")
    }

    /// Fire timer `index` and run its callback
    pub(crate) fn run(&self, index: usize) {
        let callback = self.fire(index);
        callback();
    }

    /// Number of timers scheduled so far
    pub(crate) fn scheduled(&self) -> usize {
        self.timers.lock().len()
    }

    /// Number of timers that are still pending
    pub(crate) fn pending(&self) -> usize {
        self.timers
            .lock()
            .iter()
            .filter(|(timer, _, _)| timer.is_pending())
            .count()
    }

    pub(crate) fn delay(&self, index: usize) -> Duration {
        self.timers.lock()[index].1
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, callback: Callback) -> TimerHandle {
        let timer = TimerHandle::new();
        self.timers
            .lock()
            .push((timer.clone(), delay, Some(callback)));
        timer
    }
}

/// Clock that only moves when advanced
#[derive(Clone)]
pub(crate) struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        ManualClock {
            now: Arc::new(Mutex::new(Instant::from_std(std::time::Instant::now()))),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Timers backed by a fresh manual scheduler and clock
pub(crate) fn manual_timers() -> (Timers, ManualScheduler, ManualClock) {
    let scheduler = ManualScheduler::default();
    let clock = ManualClock::new();
    let timers = Timers::new(Arc::new(scheduler.clone()), Arc::new(clock.clone()));
    (timers, scheduler, clock)
}
