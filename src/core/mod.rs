//! Core components of the throttle-queue library
//!
//! This module contains the building blocks every throttle is made of:
//! - [`timer`]: cancellable timer handles, the scheduler and the clock
//! - `queue`: the FIFO of deferred calls and the drain-side call runner
//! - [`throttle`]: fixed-interval throttle
//! - [`burst`]: burst-allowance throttle
//! - [`capacity`]: sliding-window (capacity) throttle

pub mod burst;
pub mod capacity;
mod queue;
pub mod throttle;
pub mod timer;
#[cfg(test)]
mod testing;

pub use burst::BurstThrottle;
pub use capacity::CapacityThrottle;
pub use throttle::Throttle;
pub use timer::{Clock, Scheduler, TimerHandle, Timers, TokioClock, TokioScheduler};

use std::time::Duration;

/// Errors raised while constructing a throttle
///
/// All of these are configuration errors: they are reported by the
/// constructors so a misconfigured throttle never ends up with a queue that
/// silently never drains.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ThrottleError {
    #[error("interval must be greater than zero")]
    InvalidInterval,

    #[error("burst size must be greater than zero")]
    InvalidBurstSize,

    #[error("burst window must be greater than zero")]
    InvalidBurstWindow,

    #[error("capacity must be greater than zero")]
    InvalidCapacity,

    #[error("window must be greater than zero")]
    InvalidWindow,

    #[error("no tokio runtime is available to schedule timers")]
    NoRuntime,

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// A rate-limited wrapper around a callback taking `A`
///
/// Every call either runs the callback right away or appends it to the
/// limiter's queue. The returned handle is the drain timer that is active
/// after the call, if any; cancelling it pauses draining.
pub trait Limiter<A> {
    fn call(&self, args: A) -> Option<TimerHandle>;

    /// Number of calls waiting to be drained
    fn queued(&self) -> usize;

    /// Nothing is queued and no drain timer is pending
    fn is_idle(&self) -> bool;
}

pub(crate) fn non_zero(value: Duration, err: ThrottleError) -> Result<Duration, ThrottleError> {
    if value.is_zero() { Err(err) } else { Ok(value) }
}
