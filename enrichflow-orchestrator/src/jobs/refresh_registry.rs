use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

/// Periodic background refreshes (credit balance, job list) that can be
/// paused as a group.
///
/// Only tasks started here (periodic or one-shot) are affected by a pause;
/// timers owned by anything else keep running. Pauses nest: the tasks resume
/// when the last [`PauseGuard`] is dropped.
pub struct RefreshRegistry {
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
    deferred: std::sync::Mutex<HashMap<String, AbortHandle>>,
    /// Open pauses. `paused` is only written while this lock is held.
    pause_count: std::sync::Mutex<usize>,
    paused: watch::Sender<bool>,
    shutting_down: AtomicBool,
}

impl RefreshRegistry {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            tasks: Mutex::new(HashMap::new()),
            deferred: std::sync::Mutex::new(HashMap::new()),
            pause_count: std::sync::Mutex::new(0),
            paused,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Runs `refresh` every `period`, starting immediately. A task already
    /// registered under `name` is replaced.
    ///
    /// While paused, ticks are skipped and a refresh that is in flight when
    /// the pause starts is dropped. The first tick after resuming runs at once.
    pub async fn register<F, Fut>(self: &Arc<Self>, name: &str, period: Duration, refresh: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let registry = self.clone();
        let mut paused = self.paused.subscribe();
        let task_name = name.to_string();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                if registry.is_shutting_down() {
                    break;
                }

                if *paused.borrow_and_update() {
                    tracing::debug!("Refresh {} waiting for resume", task_name);
                    if paused.wait_for(|is_paused| !*is_paused).await.is_err() {
                        break;
                    }
                    interval.reset();
                    if registry.is_shutting_down() {
                        break;
                    }
                }

                tokio::select! {
                    result = refresh() => {
                        if let Err(e) = result {
                            tracing::warn!("Refresh {} failed: {}", task_name, e);
                        }
                    }
                    _ = paused.wait_for(|is_paused| *is_paused) => {
                        tracing::debug!("Refresh {} interrupted by pause", task_name);
                    }
                }
            }
        });

        let mut tasks = self.tasks.lock().await;
        if let Some(previous) = tasks.insert(name.to_string(), handle) {
            previous.abort();
        }
        drop(tasks);

        tracing::info!("Registered background refresh {} every {:?}", name, period);
    }

    /// Runs `refresh` once, `delay` from now, under the same pause rules as
    /// the periodic tasks. When it falls due during a pause it waits for the
    /// resume instead of being dropped; when a pause interrupts it, it runs
    /// again after the resume. A pending task under the same `name` is replaced.
    pub fn run_once<F, Fut>(self: &Arc<Self>, name: &str, delay: Duration, refresh: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let registry = self.clone();
        let mut paused = self.paused.subscribe();
        let task_name = name.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            loop {
                if registry.is_shutting_down() {
                    return;
                }

                if *paused.borrow_and_update() {
                    tracing::debug!("Refresh {} deferred until resume", task_name);
                    if paused.wait_for(|is_paused| !*is_paused).await.is_err() {
                        return;
                    }
                    continue;
                }

                tokio::select! {
                    result = refresh() => {
                        if let Err(e) = result {
                            tracing::warn!("Refresh {} failed: {}", task_name, e);
                        }
                        return;
                    }
                    _ = paused.wait_for(|is_paused| *is_paused) => {
                        tracing::debug!("Refresh {} interrupted by pause, retrying after resume", task_name);
                    }
                }
            }
        });

        let previous = self
            .deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), handle.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }

        handle
    }

    pub async fn unregister(&self, name: &str) -> bool {
        let mut tasks = self.tasks.lock().await;
        match tasks.remove(name) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub async fn registered(&self) -> Vec<String> {
        let tasks = self.tasks.lock().await;
        let mut names: Vec<String> = tasks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Suspends every registered refresh until the returned guard is dropped.
    pub fn pause(self: &Arc<Self>) -> PauseGuard {
        let mut count = self.pause_count.lock().unwrap_or_else(PoisonError::into_inner);
        if *count == 0 {
            tracing::debug!("Pausing background refresh");
            self.paused.send_replace(true);
        }
        *count += 1;
        drop(count);

        PauseGuard {
            registry: self.clone(),
        }
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    fn resume(&self) {
        let mut count = self.pause_count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            tracing::debug!("Resuming background refresh");
            self.paused.send_replace(false);
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);

        let mut tasks = self.tasks.lock().await;
        for (name, handle) in tasks.drain() {
            tracing::debug!("Stopping background refresh {}", name);
            handle.abort();
        }
        drop(tasks);

        let mut deferred = self.deferred.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in deferred.drain() {
            handle.abort();
        }
    }
}

impl Default for RefreshRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps background refresh paused while alive
#[must_use = "background refresh resumes as soon as the guard is dropped"]
pub struct PauseGuard {
    registry: Arc<RefreshRegistry>,
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        self.registry.resume();
    }
}
