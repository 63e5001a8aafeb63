//! qgis-sync keeps the sources and layers of a map engine in line with a QGIS Server project.
//!
//! A QGIS project published by QGIS Server is a tree of groups and data layers. To show it on a
//! client-side map (Mapbox GL, MapLibre or anything implementing [`MapEngine`](engine::MapEngine))
//! every visible data layer has to be turned into engine objects: either a raster source of WMS
//! tiles rendered by QGIS Server, or a GeoJSON source filled over WFS plus the paint layers that
//! draw it.
//!
//! # Quick start
//!
//! ```no_run
//! use qgis_sync::engine::{shared, InMemoryEngine};
//! use qgis_sync::render::HttpFeatureFetcher;
//! use qgis_sync::{ProjectLayerSynchronizer, ProjectLoader, SyncConfig};
//!
//! # async fn run() -> Result<(), qgis_sync::SyncError> {
//! let config = SyncConfig::builder("https://maps.example.com/ows").build()?;
//! let engine = shared(InMemoryEngine::new("streets"));
//!
//! let tree = ProjectLoader::new(&config)?.load("Plan_1").await?;
//! let fetcher = HttpFeatureFetcher::new(qgis_sync::http::HttpClient::new(&config)?);
//! let synchronizer = ProjectLayerSynchronizer::new(engine.clone(), fetcher, &config);
//!
//! let report = synchronizer.sync("Plan_1", &tree.children).await?;
//! println!("{} of {} layers on the map", report.materialized, report.attempted);
//! # Ok(())
//! # }
//! ```
//!
//! # Main components
//!
//! * [`LayerCatalog`] flattens the project tree into name and id lookups and the list of layers
//!   visible by the project defaults.
//! * [`LayerRenderAdapter`](render::LayerRenderAdapter) creates and removes the engine objects of
//!   a single layer.
//! * [`ProjectLayerSynchronizer`] puts all visible layers of a project on the map, verifies they
//!   survive style rebuilds and supersedes stale runs when the project changes.
//! * [`VisibilitySync`] applies visibility, opacity and order of the user edited
//!   [`LayerTree`](qgis_sync_types::LayerTree) to the layers already on the map.
//! * [`StyleLifecycleGuard`] restores the layers after the base map or the 3D mode is switched.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observer;
pub mod ows;
pub mod project;
pub mod render;
pub mod sync;
pub mod visibility;

#[cfg(test)]
pub(crate) mod tests;

pub use catalog::LayerCatalog;
pub use config::{SyncConfig, SyncConfigBuilder};
pub use error::SyncError;
pub use lifecycle::{GuardDecision, StyleLifecycleGuard};
pub use observer::{DummyObserver, SyncObserver};
pub use project::ProjectLoader;
pub use sync::{LayerFailure, ProjectLayerSynchronizer, SyncPhase, SyncReport};
pub use visibility::{ReconcileReport, SharedVisibilitySync, VisibilitySync};

// Reexport qgis_sync_types
pub use qgis_sync_types;
