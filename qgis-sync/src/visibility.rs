//! Applying the application layer tree to the map.

use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::Mutex;
use qgis_sync_types::{LayerTree, LeafView};

use crate::catalog::LayerCatalog;
use crate::engine::{MapEngine, SharedEngine, Visibility};
use crate::observer::SyncObserver;
use crate::render::LayerIds;
use crate::sync::SyncReport;

/// Outcome of a [`VisibilitySync::reconcile`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Leaves applied to at least one engine layer.
    pub updated: usize,
    /// Leaves that match no layer of the QGIS project.
    pub skipped_unresolved: usize,
    /// Leaves whose QGIS layer is not on the map.
    pub skipped_unrendered: usize,
    /// Whether the generated layers were re-stacked.
    pub reordered: bool,
}

/// Visibility sync shared with a [`ProjectLayerSynchronizer`](crate::ProjectLayerSynchronizer)
/// as its observer.
pub type SharedVisibilitySync<E> = Arc<Mutex<VisibilitySync<E>>>;

/// Pushes visibility, opacity and order of the application tree leaves to the generated engine
/// layers.
///
/// Never adds or removes layers: a leaf whose layer is not on the map (hidden by the project
/// defaults, failed to load) is skipped.
///
/// A synchronization run re-adds layers with the project defaults, for example after a base map
/// switch. Registered as the observer of the synchronizer, the visibility sync applies the last
/// reconciled leaves again when a run of the same project finishes:
///
/// ```no_run
/// # use qgis_sync::engine::{shared, InMemoryEngine};
/// # use qgis_sync::render::HttpFeatureFetcher;
/// # use qgis_sync::{ProjectLayerSynchronizer, SyncConfig, VisibilitySync};
/// # fn build(config: &SyncConfig, fetcher: HttpFeatureFetcher) {
/// let engine = shared(InMemoryEngine::new("streets"));
/// let visibility = VisibilitySync::new(engine.clone()).into_shared();
/// let synchronizer = ProjectLayerSynchronizer::new(engine, fetcher, config)
///     .with_observer(visibility.clone());
/// # }
/// ```
pub struct VisibilitySync<E> {
    engine: SharedEngine<E>,
    last_revision: Option<u64>,
    applied: Option<AppliedTree>,
}

struct AppliedTree {
    project: String,
    leaves: Vec<ResolvedLeaf>,
}

struct ResolvedLeaf {
    qgis_id: String,
    name: String,
    visible: bool,
    opacity: Option<f64>,
}

impl<E: MapEngine> VisibilitySync<E> {
    /// Creates a new instance for the engine.
    pub fn new(engine: SharedEngine<E>) -> Self {
        Self {
            engine,
            last_revision: None,
            applied: None,
        }
    }

    /// Wraps the instance for sharing with a synchronizer.
    pub fn into_shared(self) -> SharedVisibilitySync<E> {
        Arc::new(Mutex::new(self))
    }

    /// Applies the tree if it changed since the last call, or if [`VisibilitySync::invalidate`]
    /// was called in between.
    pub fn reconcile_if_changed(
        &mut self,
        catalog: &LayerCatalog,
        project: &str,
        tree: &LayerTree,
    ) -> Option<ReconcileReport> {
        if self.last_revision == Some(tree.revision()) {
            trace!("Layer tree revision {} is already applied", tree.revision());
            return None;
        }

        let report = self.reconcile(catalog, project, &tree.leaves());
        self.last_revision = Some(tree.revision());
        Some(report)
    }

    /// Forgets the last applied revision. Call it after a new tree is created.
    pub fn invalidate(&mut self) {
        self.last_revision = None;
    }

    /// Applies the leaves, given in display order (top-most first).
    ///
    /// Leaves are joined with QGIS layers by QGIS id, falling back to the name for leaves that
    /// were created without one.
    pub fn reconcile(
        &mut self,
        catalog: &LayerCatalog,
        project: &str,
        leaves: &[LeafView],
    ) -> ReconcileReport {
        let mut skipped_unresolved = 0;
        let mut resolved = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            let Some(qgis_id) = catalog.resolve(leaf.qgis_id.as_deref(), &leaf.name) else {
                debug!(
                    "Layer {:?} is not part of project {project}, skipping",
                    leaf.name
                );
                skipped_unresolved += 1;
                continue;
            };

            resolved.push(ResolvedLeaf {
                qgis_id: qgis_id.to_string(),
                name: leaf.name.clone(),
                visible: leaf.visible,
                opacity: leaf.opacity,
            });
        }

        let mut report = self.apply(project, &resolved);
        report.skipped_unresolved = skipped_unresolved;
        self.applied = Some(AppliedTree {
            project: project.to_string(),
            leaves: resolved,
        });

        report
    }

    /// Applies the last reconciled leaves again if they belong to `project`.
    pub fn reapply(&self, project: &str) -> Option<ReconcileReport> {
        let applied = self.applied.as_ref().filter(|applied| applied.project == project)?;
        Some(self.apply(project, &applied.leaves))
    }

    fn apply(&self, project: &str, leaves: &[ResolvedLeaf]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut stack: Vec<String> = vec![];
        let mut engine = self.engine.lock();

        for leaf in leaves {
            let present: Vec<String> = LayerIds::new(project, &leaf.qgis_id)
                .candidates()
                .into_iter()
                .filter(|id| engine.has_layer(id))
                .collect();
            if present.is_empty() {
                trace!("Layer {:?} is not on the map", leaf.name);
                report.skipped_unrendered += 1;
                continue;
            }

            for id in &present {
                apply_leaf(&mut *engine, id, leaf.visible, leaf.opacity);
            }

            report.updated += 1;
            // Bottom to top: layers of later leaves go below the ones already stacked.
            stack.splice(0..0, present);
        }

        report.reordered = restack(&mut *engine, &stack);
        report
    }
}

impl<E: MapEngine> SyncObserver for Mutex<VisibilitySync<E>> {
    fn sync_finished(&self, report: &SyncReport) {
        if let Some(reapplied) = self.lock().reapply(&report.project) {
            debug!(
                "Re-applied layer tree to {} layers of project {}",
                reapplied.updated, report.project
            );
        }
    }
}

fn apply_leaf<E: MapEngine>(engine: &mut E, id: &str, visible: bool, opacity: Option<f64>) {
    if let Err(err) = engine.set_visibility(id, Visibility::from(visible)) {
        warn!("Failed to set visibility of {id}: {err}");
    }

    let Some(opacity) = opacity else {
        return;
    };
    let Some(family) = engine.layer(id).map(|layer| layer.family) else {
        return;
    };

    let (property, value) = family.paint_opacity(opacity);
    if let Err(err) = engine.set_paint_property(id, property, value.into()) {
        warn!("Failed to set {} of {id}: {err}", property.as_str());
    }
}

/// Orders the given layers bottom to top in the engine, directly below the first foreign layer
/// that is above all of them. Returns false if they already were in this order.
fn restack<E: MapEngine>(engine: &mut E, desired: &[String]) -> bool {
    if desired.len() < 2 {
        return false;
    }

    let current = engine.layer_ids();
    let stacked: Vec<&String> = current
        .iter()
        .filter(|id| desired.contains(id))
        .collect();
    if stacked.iter().copied().eq(desired.iter()) {
        return false;
    }

    let last_position = current
        .iter()
        .rposition(|id| desired.contains(id))
        .unwrap_or(0);
    let anchor = current[last_position + 1..]
        .iter()
        .find(|id| !desired.contains(id))
        .cloned();

    for id in desired {
        if let Err(err) = engine.move_layer(id, anchor.as_deref()) {
            warn!("Failed to move layer {id}: {err}");
        }
    }

    debug!("Re-stacked {} layers", desired.len());
    true
}
