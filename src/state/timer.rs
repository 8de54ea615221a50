//! Cancellable countdown task driving per-question time limits.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Opaque handle to a running countdown.
///
/// Dropping the handle does not stop the countdown; only [`TimerHandle::cancel`]
/// does.
pub struct TimerHandle {
    task: JoinHandle<()>,
    completed: Arc<AtomicBool>,
}

impl TimerHandle {
    /// Stop ticking and suppress the pending on-end callback.
    ///
    /// Idempotent, and safe to call after the countdown has already run to
    /// completion (it becomes a no-op).
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Whether the countdown reached zero and ran its on-end callback.
    pub fn is_done(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

/// Spawn a countdown that calls `on_tick` once per `tick` with the remaining
/// count, starting immediately with `count`, then runs `on_end` exactly once
/// when the count reaches zero.
pub fn start_countdown<Tick, End, EndFut>(
    tick: Duration,
    count: u32,
    mut on_tick: Tick,
    on_end: End,
) -> TimerHandle
where
    Tick: FnMut(u32) + Send + 'static,
    End: FnOnce() -> EndFut + Send + 'static,
    EndFut: Future<Output = ()> + Send,
{
    let completed = Arc::new(AtomicBool::new(false));
    let completed_flag = completed.clone();

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut remaining = count;
        on_tick(remaining);
        while remaining > 1 {
            ticker.tick().await;
            remaining -= 1;
            on_tick(remaining);
        }
        if remaining > 0 {
            ticker.tick().await;
        }

        // Set before awaiting on_end so a late cancel() observes completion.
        completed_flag.store(true, Ordering::SeqCst);
        on_end().await;
    });

    TimerHandle { task, completed }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::sync::oneshot;
    use tokio::time::sleep;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_down_then_fires_on_end_once() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let ends = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = oneshot::channel();

        let recorded = ticks.clone();
        let ended = ends.clone();
        let handle = start_countdown(
            Duration::from_secs(1),
            5,
            move |remaining| recorded.lock().unwrap().push(remaining),
            move || async move {
                assert!(!ended.swap(true, Ordering::SeqCst));
                let _ = done_tx.send(());
            },
        );

        done_rx.await.unwrap();
        assert_eq!(*ticks.lock().unwrap(), vec![5, 4, 3, 2, 1]);
        assert!(ends.load(Ordering::SeqCst));
        assert!(handle.is_done());

        // A cancel after natural completion is a harmless no-op.
        handle.cancel();
        assert!(handle.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_remaining_ticks_and_on_end() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let ends = Arc::new(AtomicBool::new(false));

        let recorded = ticks.clone();
        let ended = ends.clone();
        let handle = start_countdown(
            Duration::from_secs(1),
            60,
            move |remaining| recorded.lock().unwrap().push(remaining),
            move || async move {
                ended.store(true, Ordering::SeqCst);
            },
        );

        // Let a couple of ticks land, then cancel mid-countdown.
        sleep(Duration::from_millis(2500)).await;
        handle.cancel();
        handle.cancel();

        sleep(Duration::from_secs(120)).await;
        assert_eq!(*ticks.lock().unwrap(), vec![60, 59, 58]);
        assert!(!ends.load(Ordering::SeqCst));
        assert!(!handle.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_count_ticks_zero_then_ends_immediately() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();

        let recorded = ticks.clone();
        start_countdown(
            Duration::from_secs(1),
            0,
            move |remaining| recorded.lock().unwrap().push(remaining),
            move || async move {
                let _ = done_tx.send(());
            },
        );

        // The starting count is always reported, even when it is zero; the
        // countdown then concludes without waiting a tick interval.
        done_rx.await.unwrap();
        assert_eq!(*ticks.lock().unwrap(), vec![0]);
    }
}
