//! Restoring the layers after the map style is replaced.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::engine::{MapEngine, SharedEngine, StyleStatus};
use crate::error::SyncError;
use crate::render::FeatureFetcher;
use crate::sync::ProjectLayerSynchronizer;

/// What the guard does about a style status change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GuardDecision {
    /// The style is still loading.
    Wait,
    /// Nothing changed since the last observed status.
    Skip,
    /// The same style was rebuilt. Layers are restored only if some of them are gone.
    Verify,
    /// A different style was loaded. Layers are restored.
    Resync,
}

/// Watches the engine style and re-runs the last synchronization when a style switch drops the
/// generated layers.
///
/// Style events come in bursts (a base map switch emits several loading/loaded transitions), so
/// the guard waits for [`SyncConfig::lifecycle_debounce`] after every change and acts on the
/// latest status only.
pub struct StyleLifecycleGuard {
    receiver: watch::Receiver<StyleStatus>,
    debounce: Duration,
    last_key: Option<String>,
    last_generation: Option<u64>,
}

impl StyleLifecycleGuard {
    /// Creates a guard for the engine. The current style, if loaded, is considered synchronized.
    pub fn new<E: MapEngine>(engine: &SharedEngine<E>, config: &SyncConfig) -> Self {
        let receiver = engine.lock().subscribe_style();
        let current = receiver.borrow().clone();

        let mut guard = Self {
            receiver,
            debounce: config.lifecycle_debounce(),
            last_key: None,
            last_generation: None,
        };
        if current.loaded {
            guard.last_key = Some(current.key);
            guard.last_generation = Some(current.generation);
        }

        guard
    }

    /// Decides what to do about the status and remembers it.
    pub fn observe(&mut self, status: &StyleStatus) -> GuardDecision {
        if !status.loaded {
            return GuardDecision::Wait;
        }

        if self.last_key.as_deref() != Some(status.key.as_str()) {
            self.last_key = Some(status.key.clone());
            self.last_generation = Some(status.generation);
            return GuardDecision::Resync;
        }

        if self.last_generation != Some(status.generation) {
            self.last_generation = Some(status.generation);
            return GuardDecision::Verify;
        }

        GuardDecision::Skip
    }

    /// Watches the style until the engine drops the status channel.
    pub async fn run<E, F>(mut self, synchronizer: Arc<ProjectLayerSynchronizer<E, F>>)
    where
        E: MapEngine,
        F: FeatureFetcher,
    {
        while self.receiver.changed().await.is_ok() {
            if !self.debounce.is_zero() {
                tokio::time::sleep(self.debounce).await;
            }

            let status = self.receiver.borrow_and_update().clone();
            match self.observe(&status) {
                GuardDecision::Wait => trace!("Style {} is loading", status.key),
                GuardDecision::Skip => trace!("Style {} did not change", status.key),
                GuardDecision::Verify => {
                    if synchronizer.is_intact() {
                        debug!("Style {} was rebuilt, all layers survived", status.key);
                    } else {
                        info!("Style {} was rebuilt, restoring layers", status.key);
                        restore(&synchronizer).await;
                    }
                }
                GuardDecision::Resync => {
                    info!("Style changed to {}, restoring layers", status.key);
                    restore(&synchronizer).await;
                }
            }
        }

        debug!("Style status channel closed, lifecycle guard stopped");
    }

    /// Runs the guard on the tokio runtime.
    pub fn spawn<E, F>(self, synchronizer: Arc<ProjectLayerSynchronizer<E, F>>) -> JoinHandle<()>
    where
        E: MapEngine,
        F: FeatureFetcher + 'static,
    {
        tokio::spawn(self.run(synchronizer))
    }
}

async fn restore<E: MapEngine, F: FeatureFetcher>(synchronizer: &ProjectLayerSynchronizer<E, F>) {
    match synchronizer.resync().await {
        Ok(Some(report)) => debug!(
            "Restored {}/{} layers of project {}",
            report.materialized, report.attempted, report.project
        ),
        Ok(None) => trace!("No project to restore"),
        Err(SyncError::Superseded) => debug!("Restoring layers was superseded"),
        Err(err) => warn!("Failed to restore layers after a style change: {err}"),
    }
}
