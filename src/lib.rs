//! # throttle-queue
//!
//! Client-side call throttles that defer excess calls instead of dropping them.
//!
//! ## Overview
//!
//! Each throttle wraps a callback and hands back a rate-limited version of it.
//! A call either runs the callback immediately or is appended to a FIFO queue
//! that a timer drains as capacity allows. Every call runs exactly once, in
//! the order it was made.
//!
//! - [`Throttle`]: at most one execution per fixed interval
//! - [`BurstThrottle`]: a burst allowance per window, then a fixed interval
//! - [`CapacityThrottle`]: at most `count` executions in any rolling window
//!
//! Every call returns the drain [`TimerHandle`] that is active afterwards.
//! Cancelling it pauses draining; queued calls stay queued and resume on the
//! next call.
//!
//! ## Quick Start
//!
//! ```
//! use throttle_queue::{Throttle, CapacityThrottle};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // One status update every 250ms at most
//! let status = Throttle::new(|msg: &'static str| println!("{msg}"), Duration::from_millis(250)).unwrap();
//! status.call("starting");
//! status.call("connected"); // runs 250ms later
//!
//! // Five requests per rolling second
//! let fetch = CapacityThrottle::new(|id: u64| println!("fetch {id}"), 5, Duration::from_secs(1)).unwrap();
//! for id in 0..8 {
//!     fetch.call(id);
//! }
//! assert_eq!(fetch.queued(), 3);
//! # }
//! ```
//!
//! ## Runtime
//!
//! Timers run on tokio. The `new` constructors pick up the current runtime
//! and fail with [`ThrottleError::NoRuntime`] outside one; `with_timers`
//! accepts any [`Scheduler`] and [`Clock`].
//!
//! ## Utilities
//!
//! The [`util`] module carries small helpers that are commonly used alongside
//! the throttles: id generators, shuffling, delayed iteration, string
//! splitting, run grouping and a completion latch.

pub mod config;
pub mod core;
pub mod util;

pub use config::{AnyThrottle, ThrottleConfig};
pub use core::{
    BurstThrottle, CapacityThrottle, Clock, Limiter, Scheduler, Throttle, ThrottleError,
    TimerHandle, Timers, TokioClock, TokioScheduler,
};
