use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id counter starting at 0
///
/// Each generator owns its own counter; share one through an `Arc` or a
/// `static` when ids must be unique across a process.
///
/// ```
/// use throttle_queue::util::IdGenerator;
///
/// let ids = IdGenerator::new();
/// assert_eq!(ids.next_id(), 0);
/// assert_eq!(ids.next_id(), 1);
///
/// // Reset hands out 0 again and continues from 1
/// assert_eq!(ids.reset(), 0);
/// assert_eq!(ids.next_id(), 1);
/// ```
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub const fn new() -> Self {
        IdGenerator {
            next: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Restart the sequence, returning id 0 as if it was the first call
    pub fn reset(&self) -> u64 {
        self.next.store(1, Ordering::Relaxed);
        0
    }
}

/// Per-prefix id counters producing ids like `"job0"`, `"job1"`
#[derive(Debug, Default)]
pub struct PrefixIdGenerator {
    counters: Mutex<HashMap<String, u64>>,
}

impl PrefixIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self, prefix: &str) -> String {
        let mut counters = self.counters.lock();
        let counter = counters.entry(prefix.to_string()).or_insert(0);
        let id = *counter;
        *counter += 1;
        format!("{prefix}{id}")
    }

    /// Restart the sequence for `prefix` only
    pub fn reset(&self, prefix: &str) -> String {
        self.counters.lock().insert(prefix.to_string(), 1);
        format!("{prefix}0")
    }
}
