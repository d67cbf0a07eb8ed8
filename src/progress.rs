use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

/// State shared between the progress reporter task and whoever starts /
/// stops it. `tick()` is the only piece of container state the reporter
/// needs; the caller passes in a closure that snapshots the names of
/// components currently under construction.
pub struct ProgressReporter {
    stop: Arc<AtomicBool>,
    stop_notify: Arc<tokio::sync::Notify>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressReporter {
    /// Spawns the reporter task. `snapshot` is invoked under the caller's
    /// own lock on every tick and must not itself await the container
    /// mutex recursively — it's expected to briefly lock, clone, unlock.
    pub fn spawn<F, Fut>(interval: Duration, snapshot: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Vec<String>> + Send,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_notify = Arc::new(tokio::sync::Notify::new());

        let task_stop = stop.clone();
        let task_stop_notify = stop_notify.clone();
        let handle = tokio::spawn(async move {
            loop {
                let sleep = tokio::time::sleep(interval);
                tokio::select! {
                    _ = sleep => {}
                    _ = task_stop_notify.notified() => {}
                }
                if task_stop.load(Ordering::Acquire) {
                    break;
                }
                let building = snapshot().await;
                if !building.is_empty() {
                    info!(components = ?building, "still adding components");
                }
            }
        });

        Self {
            stop,
            stop_notify,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signals the reporter to exit and joins it. Safe to call more than
    /// once: a second call finds no handle left and is a no-op, matching
    /// the spec's "stopped before `on_all_components_loaded` and again
    /// (defensively) before `clear_components`" requirement.
    pub async fn stop_and_join(&self) {
        self.stop.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();

        let handle = { self.handle.lock().await.take() };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
