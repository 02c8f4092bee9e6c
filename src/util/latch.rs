use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Runs a callback once `count` actions have reported completion
///
/// Clones share the same countdown. The callback receives the value passed
/// by whichever action finished last and never runs more than once.
///
/// ```
/// use throttle_queue::util::Latch;
/// use std::sync::{Arc, Mutex};
///
/// let result = Arc::new(Mutex::new(None));
/// let out = result.clone();
/// let latch = Latch::new(2, move |last: &str| *out.lock().unwrap() = Some(last.to_string()));
///
/// latch.done("first");
/// assert!(result.lock().unwrap().is_none());
/// latch.done("second");
/// assert_eq!(result.lock().unwrap().as_deref(), Some("second"));
/// ```
pub struct Latch<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    remaining: AtomicUsize,
    callback: Mutex<Option<Box<dyn FnOnce(T) + Send>>>,
}

impl<T> Latch<T> {
    /// A `count` of zero can never complete through [`Latch::done`]; use
    /// [`Latch::run`] to have the callback fire immediately for no actions.
    pub fn new<F>(count: usize, callback: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        Latch {
            inner: Arc::new(Inner {
                remaining: AtomicUsize::new(count),
                callback: Mutex::new(Some(Box::new(callback))),
            }),
        }
    }

    /// Report one completed action
    ///
    /// Returns `true` if this completion released the latch.
    pub fn done(&self, value: T) -> bool {
        let previous = self
            .inner
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => {
                let callback = self.inner.callback.lock().take();
                if let Some(callback) = callback {
                    callback(value);
                    return true;
                }
                false
            }
            Ok(_) => false,
            Err(_) => {
                tracing::warn!("latch completed more times than it was created for");
                false
            }
        }
    }

    /// Actions not yet reported
    pub fn remaining(&self) -> usize {
        self.inner.remaining.load(Ordering::Acquire)
    }

    /// Start every action, handing each a clone of the latch to report back on
    ///
    /// With no actions the callback runs immediately with `T::default()`.
    pub fn run<A, F>(actions: Vec<A>, callback: F) -> Self
    where
        A: FnOnce(Latch<T>),
        F: FnOnce(T) + Send + 'static,
        T: Default,
    {
        if actions.is_empty() {
            callback(T::default());
            return Latch::new(0, |_| {});
        }

        let latch = Latch::new(actions.len(), callback);
        for action in actions {
            action(latch.clone());
        }
        latch
    }
}

impl<T> Clone for Latch<T> {
    fn clone(&self) -> Self {
        Latch {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fires_once_after_count() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let out = fired.clone();
        let latch = Latch::new(3, move |v: u32| out.lock().push(v));

        assert!(!latch.done(1));
        assert!(!latch.done(2));
        assert_eq!(latch.remaining(), 1);
        assert!(latch.done(3));
        assert!(!latch.done(4));

        assert_eq!(*fired.lock(), vec![3]);
    }

    #[test]
    fn test_run_without_actions_fires_immediately() {
        let fired = Arc::new(Mutex::new(false));
        let out = fired.clone();
        let actions: Vec<fn(Latch<()>)> = Vec::new();
        Latch::run(actions, move |_| *out.lock() = true);
        assert!(*fired.lock());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_async_actions() {
        let (tx, rx) = tokio::sync::oneshot::channel();

        let actions: Vec<Box<dyn FnOnce(Latch<u64>)>> = (1..=3u64)
            .map(|n| {
                Box::new(move |latch: Latch<u64>| {
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(n * 10)).await;
                        latch.done(n);
                    });
                }) as Box<dyn FnOnce(Latch<u64>)>
            })
            .collect();

        Latch::run(actions, move |last| {
            let _ = tx.send(last);
        });

        assert_eq!(rx.await.unwrap(), 3);
    }
}
