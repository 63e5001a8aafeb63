//! Notifications about layers appearing on and disappearing from the map.

use std::sync::Arc;

use crate::render::RenderedLayerHandle;
use crate::sync::{LayerFailure, SyncReport};

/// Receives progress of synchronization runs, for example to show loading and error badges in a
/// layer panel.
///
/// All methods are called without any internal lock held and do nothing by default.
pub trait SyncObserver: Send + Sync {
    /// A layer was added to the map.
    fn layer_added(&self, _handle: &RenderedLayerHandle) {}
    /// A layer could not be added to the map.
    fn layer_failed(&self, _failure: &LayerFailure) {}
    /// A layer was removed from the map, or found to be lost after a style rebuild.
    fn layer_removed(&self, _qgis_id: &str) {}
    /// A synchronization run finished.
    fn sync_finished(&self, _report: &SyncReport) {}
}

/// Observer that ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyObserver;

impl SyncObserver for DummyObserver {}

impl<T: SyncObserver + ?Sized> SyncObserver for Arc<T> {
    fn layer_added(&self, handle: &RenderedLayerHandle) {
        (**self).layer_added(handle)
    }

    fn layer_failed(&self, failure: &LayerFailure) {
        (**self).layer_failed(failure)
    }

    fn layer_removed(&self, qgis_id: &str) {
        (**self).layer_removed(qgis_id)
    }

    fn sync_finished(&self, report: &SyncReport) {
        (**self).sync_finished(report)
    }
}
