use std::time::Duration;

use crate::error::SyncError;
use crate::render::RenderStrategy;

/// Stage of a synchronization run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SyncPhase {
    /// Nothing was synchronized yet, or the map was cleared.
    #[default]
    Idle,
    /// Waiting for the style and materializing layers.
    Syncing,
    /// Layers were added. Waiting to confirm a concurrent style rebuild did not drop them.
    AwaitingRebuildConfirmation,
    /// The run finished.
    Settled,
}

/// Layer that could not be added to the map.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerFailure {
    /// QGIS id of the layer.
    pub qgis_id: String,
    /// QGIS name of the layer.
    pub name: String,
    /// Strategy the layer was drawn with.
    pub strategy: RenderStrategy,
    /// Reason of the failure.
    pub error: SyncError,
}

/// Outcome of a synchronization run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Project name.
    pub project: String,
    /// Number of layers visible by the project defaults.
    pub attempted: usize,
    /// Number of those layers present on the map when the run settled.
    pub materialized: usize,
    /// Layers that failed in the last attempt.
    pub failures: Vec<LayerFailure>,
    /// How many times layers lost to a style rebuild were re-added.
    pub rebuild_retries: u32,
    /// Phase the run finished in.
    pub phase: SyncPhase,
    /// Wall time of the run.
    pub elapsed: Duration,
}

impl SyncReport {
    pub(crate) fn new(project: &str, attempted: usize) -> Self {
        Self {
            project: project.to_string(),
            attempted,
            materialized: 0,
            failures: vec![],
            rebuild_retries: 0,
            phase: SyncPhase::Syncing,
            elapsed: Duration::ZERO,
        }
    }

    /// Returns true if every attempted layer is on the map.
    pub fn is_complete(&self) -> bool {
        self.materialized == self.attempted
    }
}
