//! Interval polling for long-running backend jobs.
//!
//! A poll loop re-runs an async check on a fixed interval until the check
//! reports completion. Check errors are transient by assumption: they are
//! logged and the loop keeps going. The loop lives in its own tokio task and
//! is aborted when its [`PollHandle`] is dropped.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// One check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    /// Still running; carries the number of outstanding jobs.
    Pending(u32),
    Done(T),
}

/// Handle to a running poll loop.
///
/// Await it to get the completed value (`None` if the loop was cancelled).
/// Dropping the handle aborts the loop.
pub struct PollHandle<T> {
    task: JoinHandle<T>,
    progress: watch::Receiver<Option<u32>>,
}

impl<T> PollHandle<T> {
    /// Latest outstanding-job count, `None` before the first observation.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<Option<u32>> {
        self.progress.clone()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T> Future for PollHandle<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(Result::ok)
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Starts polling. The first check runs one `interval` after the call, since
/// callers have always just made the same request themselves.
///
/// Must be called from within a tokio runtime.
pub fn poll_until<T, E, F, Fut>(interval: Duration, mut check: F) -> PollHandle<T>
where
    T: Send + 'static,
    E: Display + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<PollStep<T>, E>> + Send + 'static,
{
    let (progress_tx, progress_rx) = watch::channel(None);

    let task = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match check().await {
                Ok(PollStep::Done(value)) => {
                    progress_tx.send_replace(Some(0));
                    return value;
                }
                Ok(PollStep::Pending(remaining)) => {
                    tracing::debug!(remaining, "poll: still pending");
                    progress_tx.send_replace(Some(remaining));
                }
                Err(e) => {
                    tracing::debug!(error = %e, "poll check failed, retrying next tick");
                }
            }
        }
    });

    PollHandle {
        task,
        progress: progress_rx,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn completes_once_with_the_checked_value() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let handle = poll_until(Duration::from_secs(2), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Ok::<_, String>(PollStep::Pending(2 - n))
                } else {
                    Ok(PollStep::Done("ready"))
                }
            }
        });
        let progress = handle.progress();

        assert_eq!(handle.await, Some("ready"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*progress.borrow(), Some(0));

        // The loop is gone; no further checks happen.
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn check_errors_do_not_stop_the_loop() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let handle = poll_until(Duration::from_millis(500), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    0 | 1 => Err("backend unavailable"),
                    _ => Ok(PollStep::Done(n)),
                }
            }
        });
        assert_eq!(handle.await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn first_check_waits_one_interval() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let _handle = poll_until(Duration::from_secs(2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<PollStep<()>, String>(PollStep::Pending(1)) }
        });

        time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let handle = poll_until(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<PollStep<()>, String>(PollStep::Pending(5)) }
        });

        time::sleep(Duration::from_millis(2500)).await;
        let seen = calls.load(Ordering::SeqCst);
        assert_eq!(seen, 2);
        assert_eq!(*handle.progress().borrow(), Some(5));

        drop(handle);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_handle_resolves_to_none() {
        let handle = poll_until(Duration::from_secs(1), || async {
            Ok::<PollStep<()>, String>(PollStep::Pending(1))
        });
        handle.cancel();
        assert_eq!(handle.await, None);
    }
}
