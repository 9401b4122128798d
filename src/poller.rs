// src/poller.rs

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::EmelocError;

/// Refresh period of the fleet map screen.
pub const AMBULANCE_MAP_PERIOD: Duration = Duration::from_secs(30);

/// Refresh period of the operator's ambulance board.
pub const AMBULANCE_BOARD_PERIOD: Duration = Duration::from_secs(60);

/// Refresh period of the single-ambulance live tracker.
pub const TRACKER_PERIOD: Duration = Duration::from_secs(5);

/// Spawns repeating fetch tasks that keep an entity snapshot fresh.
///
/// The poller owns a simple Idle → Polling → Idle lifecycle: spawning
/// issues one immediate fetch and then repeats on a fixed period until the
/// returned [`PollerHandle`] is stopped or dropped. Each successful fetch
/// replaces the snapshot wholesale; there is no partial merging. A failed
/// fetch is logged and the previous snapshot stays visible; the schedule
/// keeps running at the same period regardless of consecutive failures.
pub struct PositionPoller;

impl PositionPoller {
    /// Starts polling with `fetch` every `period`, beginning immediately.
    pub fn spawn<T, F, Fut>(period: Duration, fetch: F) -> PollerHandle<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<T>, EmelocError>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(Arc::new(Vec::new()));
        let alive = Arc::new(AtomicBool::new(true));
        let stop = Arc::new(Notify::new());

        let task_alive = Arc::clone(&alive);
        let task_stop = Arc::clone(&stop);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = task_stop.notified() => break,
                }

                // The fetch itself is not raced against stop: a fetch in
                // flight when the handle stops runs to completion, and the
                // liveness check below discards its result.
                let outcome = fetch().await;
                if !task_alive.load(Ordering::Acquire) {
                    break;
                }

                match outcome {
                    Ok(items) => {
                        let _ = tx.send(Arc::new(items));
                    }
                    Err(e) => {
                        log::warn!("poll tick failed, keeping previous snapshot: {}", e);
                    }
                }
            }
        });

        PollerHandle {
            alive,
            stop,
            task,
            rx,
        }
    }
}

/// Handle to a running poller. Stopping (or dropping) it cancels the
/// schedule; no snapshot update is published afterwards.
pub struct PollerHandle<T> {
    alive: Arc<AtomicBool>,
    stop: Arc<Notify>,
    task: JoinHandle<()>,
    rx: watch::Receiver<Arc<Vec<T>>>,
}

impl<T> PollerHandle<T> {
    /// Returns the current snapshot. Empty until the first fetch succeeds.
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.rx.borrow().clone()
    }

    /// Returns a receiver that observes every snapshot replacement, for
    /// push-style consumers such as a map renderer.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<T>>> {
        self.rx.clone()
    }

    /// True while the polling task has not finished winding down.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancels the schedule. Idempotent.
    pub fn stop(&self) {
        self.alive.store(false, Ordering::Release);
        self.stop.notify_one();
    }
}

impl<T> Drop for PollerHandle<T> {
    fn drop(&mut self) {
        self.stop();
    }
}
