//! Declarative throttle configuration
//!
//! A [`ThrottleConfig`] describes one of the three throttles with plain
//! millisecond values, so limits can live in a JSON file or be assembled from
//! CLI arguments and turned into a working throttle with [`ThrottleConfig::build`].
//!
//! ```
//! use throttle_queue::{Limiter, ThrottleConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = ThrottleConfig::from_json(
//!     r#"{ "kind": "burst", "burst_size": 3, "burst_window_ms": 1000, "interval_ms": 200 }"#,
//! )
//! .unwrap();
//!
//! let throttle = config.build(|n: u32| println!("{n}")).unwrap();
//! throttle.call(1);
//! # }
//! ```

use crate::core::{
    BurstThrottle, CapacityThrottle, Limiter, Throttle, ThrottleError, TimerHandle, Timers,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for one throttle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ThrottleConfig {
    /// One execution per `interval_ms`
    Fixed { interval_ms: u64 },
    /// `burst_size` immediate executions per `burst_window_ms`, then one per `interval_ms`
    Burst {
        burst_size: usize,
        burst_window_ms: u64,
        interval_ms: u64,
    },
    /// At most `count` executions in any rolling `window_ms`
    Capacity { count: usize, window_ms: u64 },
}

impl ThrottleConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ThrottleError> {
        let config: ThrottleConfig =
            serde_json::from_str(json).map_err(|e| ThrottleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter is usable
    pub fn validate(&self) -> Result<(), ThrottleError> {
        match *self {
            ThrottleConfig::Fixed { interval_ms } => {
                if interval_ms == 0 {
                    return Err(ThrottleError::InvalidInterval);
                }
            }
            ThrottleConfig::Burst {
                burst_size,
                burst_window_ms,
                interval_ms,
            } => {
                if burst_size == 0 {
                    return Err(ThrottleError::InvalidBurstSize);
                }
                if burst_window_ms == 0 {
                    return Err(ThrottleError::InvalidBurstWindow);
                }
                if interval_ms == 0 {
                    return Err(ThrottleError::InvalidInterval);
                }
            }
            ThrottleConfig::Capacity { count, window_ms } => {
                if count == 0 {
                    return Err(ThrottleError::InvalidCapacity);
                }
                if window_ms == 0 {
                    return Err(ThrottleError::InvalidWindow);
                }
            }
        }
        Ok(())
    }

    /// Build the configured throttle on the current tokio runtime
    pub fn build<A, F>(&self, f: F) -> Result<AnyThrottle<A>, ThrottleError>
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        self.build_with_timers(Timers::tokio()?, f)
    }

    /// Build the configured throttle with an explicit scheduler and clock
    pub fn build_with_timers<A, F>(&self, timers: Timers, f: F) -> Result<AnyThrottle<A>, ThrottleError>
    where
        A: Send + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        self.validate()?;
        let throttle = match *self {
            ThrottleConfig::Fixed { interval_ms } => {
                AnyThrottle::Fixed(Throttle::with_timers(timers, f, ms(interval_ms))?)
            }
            ThrottleConfig::Burst {
                burst_size,
                burst_window_ms,
                interval_ms,
            } => AnyThrottle::Burst(BurstThrottle::with_timers(
                timers,
                f,
                burst_size,
                ms(burst_window_ms),
                ms(interval_ms),
            )?),
            ThrottleConfig::Capacity { count, window_ms } => AnyThrottle::Capacity(
                CapacityThrottle::with_timers(timers, f, count, ms(window_ms))?,
            ),
        };
        Ok(throttle)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ThrottleConfig::Fixed { .. } => "fixed",
            ThrottleConfig::Burst { .. } => "burst",
            ThrottleConfig::Capacity { .. } => "capacity",
        }
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// A throttle built from a [`ThrottleConfig`]
pub enum AnyThrottle<A> {
    Fixed(Throttle<A>),
    Burst(BurstThrottle<A>),
    Capacity(CapacityThrottle<A>),
}

impl<A> Clone for AnyThrottle<A> {
    fn clone(&self) -> Self {
        match self {
            AnyThrottle::Fixed(t) => AnyThrottle::Fixed(t.clone()),
            AnyThrottle::Burst(t) => AnyThrottle::Burst(t.clone()),
            AnyThrottle::Capacity(t) => AnyThrottle::Capacity(t.clone()),
        }
    }
}

impl<A: Send + 'static> Limiter<A> for AnyThrottle<A> {
    fn call(&self, args: A) -> Option<TimerHandle> {
        match self {
            AnyThrottle::Fixed(t) => t.call(args),
            AnyThrottle::Burst(t) => t.call(args),
            AnyThrottle::Capacity(t) => t.call(args),
        }
    }

    fn queued(&self) -> usize {
        match self {
            AnyThrottle::Fixed(t) => t.queued(),
            AnyThrottle::Burst(t) => t.queued(),
            AnyThrottle::Capacity(t) => t.queued(),
        }
    }

    fn is_idle(&self) -> bool {
        match self {
            AnyThrottle::Fixed(t) => t.is_idle(),
            AnyThrottle::Burst(t) => t.is_idle(),
            AnyThrottle::Capacity(t) => t.is_idle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_kind() {
        let fixed = ThrottleConfig::from_json(r#"{"kind":"fixed","interval_ms":100}"#).unwrap();
        assert_eq!(fixed, ThrottleConfig::Fixed { interval_ms: 100 });

        let burst = ThrottleConfig::from_json(
            r#"{"kind":"burst","burst_size":3,"burst_window_ms":1000,"interval_ms":2000}"#,
        )
        .unwrap();
        assert_eq!(burst.kind(), "burst");

        let capacity =
            ThrottleConfig::from_json(r#"{"kind":"capacity","count":5,"window_ms":1000}"#).unwrap();
        assert_eq!(
            capacity,
            ThrottleConfig::Capacity {
                count: 5,
                window_ms: 1000
            }
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert_eq!(
            ThrottleConfig::from_json(r#"{"kind":"fixed","interval_ms":0}"#),
            Err(ThrottleError::InvalidInterval)
        );
        assert_eq!(
            ThrottleConfig::from_json(r#"{"kind":"capacity","count":0,"window_ms":10}"#),
            Err(ThrottleError::InvalidCapacity)
        );
        assert!(matches!(
            ThrottleConfig::from_json(r#"{"kind":"leaky","rate":1}"#),
            Err(ThrottleError::Config(_))
        ));
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = ThrottleConfig::Burst {
            burst_size: 2,
            burst_window_ms: 500,
            interval_ms: 50,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""kind":"burst""#));
        assert_eq!(ThrottleConfig::from_json(&json).unwrap(), config);
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_dispatches() {
        let config = ThrottleConfig::Capacity {
            count: 1,
            window_ms: 100,
        };
        let throttle = config.build(|_: u8| {}).unwrap();
        assert!(matches!(throttle, AnyThrottle::Capacity(_)));

        assert!(throttle.call(1).is_none());
        assert!(throttle.call(2).is_some());
        assert_eq!(throttle.queued(), 1);
    }
}
