use crate::core::ThrottleError;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Handle to a running [`delay_map`]
#[derive(Debug)]
pub struct DelayMap {
    task: Option<JoinHandle<()>>,
}

impl DelayMap {
    /// Stop before the next item; the item in flight, if any, is not interrupted
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the remaining items (and `last`) to be processed
    pub async fn finished(self) {
        if let Some(task) = self.task {
            // Cancelled maps just end early
            let _ = task.await;
        }
    }
}

/// Apply `callback` to each item with `delay` between consecutive calls
///
/// The first item is handled synchronously. Each later item runs `delay`
/// after the previous one returned, so a slow callback stretches the whole
/// sequence. `last` runs one `delay` after the final item. An empty `items`
/// runs `last` right away.
pub fn delay_map<T, F, L>(
    items: Vec<T>,
    mut callback: F,
    delay: Duration,
    last: Option<L>,
) -> Result<DelayMap, ThrottleError>
where
    T: Send + 'static,
    F: FnMut(T) + Send + 'static,
    L: FnOnce() + Send + 'static,
{
    let runtime = Handle::try_current().map_err(|_| ThrottleError::NoRuntime)?;
    let mut items = items.into_iter();

    let Some(first) = items.next() else {
        if let Some(last) = last {
            last();
        }
        return Ok(DelayMap { task: None });
    };
    callback(first);

    let task = runtime.spawn(async move {
        for item in items {
            tokio::time::sleep(delay).await;
            callback(item);
        }
        tokio::time::sleep(delay).await;
        if let Some(last) = last {
            last();
        }
    });

    Ok(DelayMap { task: Some(task) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::time::{Instant, sleep};

    #[tokio::test(start_paused = true)]
    async fn test_items_spaced_by_delay() {
        let start = Instant::now();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let done = Arc::new(Mutex::new(None));
        let done_at = done.clone();

        let map = delay_map(
            vec![1, 2, 3],
            move |n| sink.lock().push((n, start.elapsed())),
            Duration::from_millis(100),
            Some(move || *done_at.lock() = Some(start.elapsed())),
        )
        .unwrap();

        // First item runs before delay_map returns
        assert_eq!(seen.lock().len(), 1);

        map.finished().await;
        let seen = seen.lock();
        assert_eq!(seen.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(seen[2].1 >= Duration::from_millis(200));
        assert!(done.lock().unwrap() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_iteration() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let map = delay_map(
            vec!['a', 'b', 'c'],
            move |c| sink.lock().push(c),
            Duration::from_millis(100),
            None::<fn()>,
        )
        .unwrap();

        sleep(Duration::from_millis(150)).await;
        map.cancel();
        sleep(Duration::from_millis(500)).await;

        assert_eq!(*seen.lock(), vec!['a', 'b']);
        assert!(map.is_finished());
    }

    #[tokio::test]
    async fn test_empty_runs_last_immediately() {
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        let map = delay_map(
            Vec::<u8>::new(),
            |_| {},
            Duration::from_secs(1),
            Some(move || *flag.lock() = true),
        )
        .unwrap();

        assert!(*ran.lock());
        assert!(map.is_finished());
    }
}
