//! Periodic tree state saving.
//!
//! A background task wakes every save interval and, when the tracked state changed since
//! the last successful save, sends the whole document to the store and reads the stored
//! document back. Failures are logged and retried on the next tick.

use super::store::StateStore;
use super::tracker::TreeStateTracker;
use crate::error::TreeError;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Save interval from the `browser_tree_state_save_interval` preference (seconds).
/// Zero, negative or absent disables persistence.
pub fn save_interval(seconds: Option<i64>) -> Option<Duration> {
    match seconds {
        Some(s) if s > 0 => Some(Duration::from_secs(s as u64)),
        _ => None,
    }
}

#[derive(Clone)]
struct StateSync {
    tracker: Arc<Mutex<TreeStateTracker>>,
    store: Arc<dyn StateStore>,
    last_saved: Arc<Mutex<Option<String>>>,
}

impl StateSync {
    async fn save(&self) -> Result<bool, TreeError> {
        let snapshot = self.tracker.lock().current().clone();
        let serialized = serde_json::to_string(&snapshot)?;
        if self.last_saved.lock().as_deref() == Some(serialized.as_str()) {
            return Ok(false);
        }

        self.store.save(&snapshot).await?;
        *self.last_saved.lock() = Some(serialized);
        info!(servers = snapshot.len(), "Tree state saved");

        if let Err(e) = self.fetch().await {
            warn!(error = %e, "Error fetching the tree state after save");
        }
        Ok(true)
    }

    async fn fetch(&self) -> Result<(), TreeError> {
        let stored = self.store.fetch().await?;
        debug!(servers = stored.len(), "Fetched stored tree state");
        self.tracker.lock().set_stored(stored);
        Ok(())
    }
}

/// Owns the save loop for one tracker.
pub struct TreeStatePersistence {
    sync: StateSync,
    interval: Option<Duration>,
    running: Arc<RwLock<bool>>,
    stop: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TreeStatePersistence {
    pub fn new(
        tracker: Arc<Mutex<TreeStateTracker>>,
        store: Arc<dyn StateStore>,
        interval: Option<Duration>,
    ) -> Self {
        TreeStatePersistence {
            sync: StateSync {
                tracker,
                store,
                last_saved: Arc::new(Mutex::new(None)),
            },
            interval,
            running: Arc::new(RwLock::new(false)),
            stop: Arc::new(Notify::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    pub fn tracker(&self) -> &Arc<Mutex<TreeStateTracker>> {
        &self.sync.tracker
    }

    /// Load the stored state and start saving, or clear the store when disabled.
    pub async fn init(&self) {
        if !self.is_enabled() {
            info!("Tree state persistence disabled, resetting stored state");
            if let Err(e) = self.sync.store.reset().await {
                warn!(error = %e, "Error resetting the tree saved state");
            }
            return;
        }

        if let Err(e) = self.fetch_state().await {
            warn!(error = %e, "Error fetching the tree state");
        }
        self.start();
    }

    /// Spawn the save loop. Must be called within a tokio runtime.
    pub fn start(&self) {
        let Some(period) = self.interval else {
            return;
        };
        {
            let mut running = self.running.write();
            if *running {
                return;
            }
            *running = true;
        }

        let sync = self.sync.clone();
        let running = Arc::clone(&self.running);
        let stop = Arc::clone(&self.stop);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !*running.read() {
                            break;
                        }
                        if let Err(e) = sync.save().await {
                            warn!(error = %e, "Error saving the tree state");
                        }
                    }
                    _ = stop.notified() => break,
                }
            }
            debug!("Tree state save loop exited");
        });

        *self.worker.lock() = Some(handle);
        info!(interval_secs = period.as_secs(), "Started tree state save loop");
    }

    /// Stop scheduling saves. A save already in flight completes.
    pub async fn stop(&self) {
        {
            let mut running = self.running.write();
            if !*running {
                return;
            }
            *running = false;
        }
        self.stop.notify_one();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!("Stopped tree state save loop");
    }

    /// Save now if the state changed. Returns whether a save was sent.
    pub async fn save_state(&self) -> Result<bool, TreeError> {
        self.sync.save().await
    }

    /// Replace the tracker's stored mirror with the store's document.
    pub async fn fetch_state(&self) -> Result<(), TreeError> {
        self.sync.fetch().await
    }

    /// Stop the loop and make a last best-effort save.
    pub async fn shutdown(&self) {
        self.stop().await;
        if self.is_enabled() {
            if let Err(e) = self.save_state().await {
                warn!(error = %e, "Error saving the tree state on shutdown");
            }
        }
    }
}
