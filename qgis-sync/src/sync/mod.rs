//! Keeping the map in line with the visible layers of a QGIS project.

use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use futures::future::join_all;
use log::{debug, info, warn};
use parking_lot::Mutex;
use qgis_sync_types::{QgisLayer, QgisLayerNode};
use web_time::Instant;

use crate::catalog::LayerCatalog;
use crate::config::SyncConfig;
use crate::engine::{MapEngine, SharedEngine};
use crate::error::SyncError;
use crate::observer::{DummyObserver, SyncObserver};
use crate::render::{
    is_generated_layer, is_generated_source, FeatureFetcher, LayerRenderAdapter,
    RenderedLayerHandle,
};

mod report;
mod token;

pub use report::{LayerFailure, SyncPhase, SyncReport};
pub use token::{SyncTicket, SyncToken};

/// Adds the visible layers of a QGIS project to the map and keeps them there.
///
/// Every run starts from a clean slate: all layers and sources previously generated by the
/// synchronization are removed, then every layer visible by the project defaults is materialized
/// concurrently. A failing layer never aborts the run; it is reported in
/// [`SyncReport::failures`] and to the [`SyncObserver`].
///
/// Switching the base map or the 3D mode replaces the engine style and silently drops everything
/// added to it, sometimes well after the style reported itself loaded. So after materializing,
/// the run waits for [`SyncConfig::verification_delay`] and checks that its layers survived,
/// re-adding lost ones with doubling delays up to [`SyncConfig::max_rebuild_retries`] times.
///
/// Runs are serialized. Starting a run supersedes the one in progress: its pending results are
/// dropped and it returns [`SyncError::Superseded`].
pub struct ProjectLayerSynchronizer<E, F> {
    engine: SharedEngine<E>,
    adapter: LayerRenderAdapter<F>,
    observer: Box<dyn SyncObserver>,
    token: SyncToken,
    run_lock: tokio::sync::Mutex<()>,
    state: Mutex<SyncState>,
    style_load_timeout: Duration,
    verification_delay: Duration,
    max_rebuild_retries: u32,
    max_tree_depth: usize,
}

#[derive(Default)]
struct SyncState {
    project: Option<ProjectSnapshot>,
    handles: AHashMap<String, RenderedLayerHandle>,
    phase: SyncPhase,
}

#[derive(Clone)]
struct ProjectSnapshot {
    name: String,
    catalog: Arc<LayerCatalog>,
}

impl<E: MapEngine, F: FeatureFetcher> ProjectLayerSynchronizer<E, F> {
    /// Creates a synchronizer drawing on the given engine.
    pub fn new(engine: SharedEngine<E>, fetcher: F, config: &SyncConfig) -> Self {
        Self {
            engine,
            adapter: LayerRenderAdapter::new(config, fetcher),
            observer: Box::new(DummyObserver),
            token: SyncToken::new(),
            run_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(SyncState::default()),
            style_load_timeout: config.style_load_timeout(),
            verification_delay: config.verification_delay(),
            max_rebuild_retries: config.max_rebuild_retries(),
            max_tree_depth: config.max_tree_depth(),
        }
    }

    /// Sets the observer notified about the progress of the runs.
    pub fn with_observer(mut self, observer: impl SyncObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// The engine the layers are added to.
    pub fn engine(&self) -> &SharedEngine<E> {
        &self.engine
    }

    /// The adapter creating the engine objects.
    pub fn adapter(&self) -> &LayerRenderAdapter<F> {
        &self.adapter
    }

    /// Name of the last synchronized project.
    pub fn current_project(&self) -> Option<String> {
        self.state
            .lock()
            .project
            .as_ref()
            .map(|project| project.name.clone())
    }

    /// Catalog of the last synchronized project.
    pub fn catalog(&self) -> Option<Arc<LayerCatalog>> {
        self.state
            .lock()
            .project
            .as_ref()
            .map(|project| project.catalog.clone())
    }

    /// Stage of the current or last run.
    pub fn phase(&self) -> SyncPhase {
        self.state.lock().phase
    }

    /// Layers currently on the map, in project tree order.
    pub fn handles(&self) -> Vec<RenderedLayerHandle> {
        let state = self.state.lock();
        let Some(project) = &state.project else {
            return vec![];
        };

        project
            .catalog
            .visible_layers()
            .iter()
            .filter_map(|layer| state.handles.get(&layer.id).cloned())
            .collect()
    }

    /// Handle of the layer with the given QGIS id, if it is on the map.
    pub fn handle(&self, qgis_id: &str) -> Option<RenderedLayerHandle> {
        self.state.lock().handles.get(qgis_id).cloned()
    }

    /// Returns true if every registered layer still exists in the engine.
    pub fn is_intact(&self) -> bool {
        let handles: Vec<RenderedLayerHandle> =
            self.state.lock().handles.values().cloned().collect();
        let engine = self.engine.lock();
        handles.iter().all(|handle| handle.is_intact(&*engine))
    }

    /// Replaces the layers on the map with the visible layers of the project.
    ///
    /// Fails only if the tree is malformed, the style does not load within
    /// [`SyncConfig::style_load_timeout`] or a newer run supersedes this one.
    pub async fn sync(
        &self,
        project: &str,
        nodes: &[QgisLayerNode],
    ) -> Result<SyncReport, SyncError> {
        let catalog = LayerCatalog::build(nodes, self.max_tree_depth)?;
        self.run(ProjectSnapshot {
            name: project.to_string(),
            catalog: Arc::new(catalog),
        })
        .await
    }

    /// Runs the last synchronized project again. Returns `None` if there is none.
    pub async fn resync(&self) -> Result<Option<SyncReport>, SyncError> {
        let snapshot = self.state.lock().project.clone();
        match snapshot {
            Some(snapshot) => self.run(snapshot).await.map(Some),
            None => Ok(None),
        }
    }

    /// Removes all generated layers from the map and forgets the project.
    pub async fn clear(&self) {
        let _ticket = self.token.issue();
        let _running = self.run_lock.lock().await;

        self.clear_generated();
        let mut state = self.state.lock();
        state.project = None;
        state.phase = SyncPhase::Idle;
    }

    async fn run(&self, snapshot: ProjectSnapshot) -> Result<SyncReport, SyncError> {
        let ticket = self.token.issue();
        let _running = self.run_lock.lock().await;
        ticket.check()?;

        let project = snapshot.name.clone();
        let catalog = snapshot.catalog.clone();
        {
            let mut state = self.state.lock();
            state.project = Some(snapshot);
            state.phase = SyncPhase::Syncing;
        }

        let result = self.run_phases(&catalog, &project, &ticket).await;
        match &result {
            Ok(report) => {
                info!(
                    "Synchronized project {project}: {}/{} layers in {:?}, {} failed, {} rebuild retries",
                    report.materialized,
                    report.attempted,
                    report.elapsed,
                    report.failures.len(),
                    report.rebuild_retries
                );
                self.observer.sync_finished(report);
            }
            Err(SyncError::Superseded) => {
                debug!("Synchronization of project {project} was superseded");
            }
            Err(err) => {
                warn!("Synchronization of project {project} failed: {err}");
                self.set_phase(SyncPhase::Settled);
            }
        }

        result
    }

    async fn run_phases(
        &self,
        catalog: &LayerCatalog,
        project: &str,
        ticket: &SyncTicket,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let attempted = catalog.visible_layers().len();
        if attempted == 0 {
            warn!("Project {project} has no visible layers");
        }

        self.wait_for_style().await?;
        ticket.check()?;
        self.clear_generated();

        let mut report = SyncReport::new(project, attempted);
        report.failures = self.materialize_missing(catalog, project, ticket).await?;
        self.verify(catalog, project, ticket, &mut report).await?;

        report.materialized = self.state.lock().handles.len();
        report.phase = SyncPhase::Settled;
        report.elapsed = started.elapsed();
        self.set_phase(SyncPhase::Settled);

        Ok(report)
    }

    async fn wait_for_style(&self) -> Result<(), SyncError> {
        let mut receiver = self.engine.lock().subscribe_style();
        let loaded = async { receiver.wait_for(|status| status.loaded).await.map(|_| ()) };

        match tokio::time::timeout(self.style_load_timeout, loaded).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) | Err(_) => {
                warn!(
                    "Map style did not load within {:?}",
                    self.style_load_timeout
                );
                Err(SyncError::StyleNotLoaded)
            }
        }
    }

    async fn materialize_missing(
        &self,
        catalog: &LayerCatalog,
        project: &str,
        ticket: &SyncTicket,
    ) -> Result<Vec<LayerFailure>, SyncError> {
        let pending: Vec<&QgisLayer> = {
            let state = self.state.lock();
            catalog
                .visible_layers()
                .iter()
                .filter(|layer| !state.handles.contains_key(&layer.id))
                .collect()
        };

        let results = join_all(
            pending
                .iter()
                .map(|layer| self.adapter.materialize(&self.engine, layer, project, ticket)),
        )
        .await;
        ticket.check()?;

        let mut failures = vec![];
        for (layer, result) in pending.into_iter().zip(results) {
            match result {
                Ok(handle) => {
                    self.observer.layer_added(&handle);
                    self.state.lock().handles.insert(layer.id.clone(), handle);
                }
                Err(error) => {
                    warn!("Failed to add layer {} ({}): {error}", layer.name, layer.id);
                    let failure = LayerFailure {
                        qgis_id: layer.id.clone(),
                        name: layer.name.clone(),
                        strategy: self.adapter.strategy(layer),
                        error,
                    };
                    self.observer.layer_failed(&failure);
                    failures.push(failure);
                }
            }
        }

        Ok(failures)
    }

    async fn verify(
        &self,
        catalog: &LayerCatalog,
        project: &str,
        ticket: &SyncTicket,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        self.set_phase(SyncPhase::AwaitingRebuildConfirmation);

        let mut delay = self.verification_delay;
        loop {
            tokio::time::sleep(delay).await;
            ticket.check()?;

            let lost = self.take_lost_handles();
            if lost == 0 {
                return Ok(());
            }

            if report.rebuild_retries >= self.max_rebuild_retries {
                warn!(
                    "{lost} layers of project {project} are still missing after {} retries",
                    report.rebuild_retries
                );
                return Ok(());
            }

            report.rebuild_retries += 1;
            info!("Map style was rebuilt, re-adding {lost} layers of project {project}");

            self.wait_for_style().await?;
            ticket.check()?;
            report.failures = self.materialize_missing(catalog, project, ticket).await?;
            delay *= 2;
        }
    }

    /// Drops the handles whose engine objects are gone, cleaning up their remains. Returns the
    /// number of dropped handles.
    fn take_lost_handles(&self) -> usize {
        let handles: Vec<RenderedLayerHandle> =
            self.state.lock().handles.values().cloned().collect();

        let lost: Vec<RenderedLayerHandle> = {
            let mut engine = self.engine.lock();
            let lost: Vec<RenderedLayerHandle> = handles
                .into_iter()
                .filter(|handle| !handle.is_intact(&*engine))
                .collect();
            for handle in &lost {
                if let Err(err) = self.adapter.dematerialize(&mut *engine, handle) {
                    warn!("Failed to clean up layer {}: {err}", handle.name);
                }
            }

            lost
        };

        {
            let mut state = self.state.lock();
            for handle in &lost {
                state.handles.remove(&handle.qgis_id);
            }
        }

        for handle in &lost {
            debug!("Layer {} was dropped from the map", handle.name);
            self.observer.layer_removed(&handle.qgis_id);
        }

        lost.len()
    }

    /// Removes every generated layer and source from the engine and forgets all handles.
    fn clear_generated(&self) {
        let removed: Vec<String> = {
            let mut engine = self.engine.lock();

            let layers: Vec<String> = engine
                .layer_ids()
                .into_iter()
                .filter(|id| is_generated_layer(id))
                .collect();
            for id in &layers {
                if let Err(err) = engine.remove_layer(id) {
                    warn!("Failed to remove layer {id}: {err}");
                }
            }

            for id in engine
                .source_ids()
                .into_iter()
                .filter(|id| is_generated_source(id))
            {
                if let Err(err) = engine.remove_source(&id) {
                    warn!("Failed to remove source {id}: {err}");
                }
            }

            if !layers.is_empty() {
                debug!("Removed {} generated layers", layers.len());
            }

            self.state
                .lock()
                .handles
                .drain()
                .map(|(qgis_id, _)| qgis_id)
                .collect()
        };

        for qgis_id in removed {
            self.observer.layer_removed(&qgis_id);
        }
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.state.lock().phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use qgis_sync_types::{GeometryType, QgisGroup};

    use super::*;
    use crate::engine::{
        shared, InMemoryEngine, LayerFamily, LayerSpec, SourceSpec, Visibility,
    };
    use crate::render::RenderStrategy;
    use crate::tests::{
        lines, points, polygons, raster_layer, test_config, vector_layer, MockFetcher,
    };

    type TestSynchronizer = ProjectLayerSynchronizer<InMemoryEngine, Arc<MockFetcher>>;

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl SyncObserver for RecordingObserver {
        fn layer_added(&self, handle: &RenderedLayerHandle) {
            self.events.lock().push(format!("added {}", handle.qgis_id));
        }

        fn layer_failed(&self, failure: &LayerFailure) {
            self.events.lock().push(format!("failed {}", failure.qgis_id));
        }

        fn sync_finished(&self, report: &SyncReport) {
            self.events.lock().push(format!("finished {}", report.project));
        }
    }

    fn engine_with_base_map() -> SharedEngine<InMemoryEngine> {
        let mut engine = InMemoryEngine::new("streets");
        engine
            .add_source(
                "composite",
                SourceSpec::RasterTiles {
                    tiles: vec!["https://base.test/{z}/{x}/{y}.png".into()],
                    tile_size: 512,
                    min_zoom: 0,
                    max_zoom: 22,
                },
            )
            .unwrap();
        engine
            .add_layer(LayerSpec::new("background", "composite", LayerFamily::Raster))
            .unwrap();

        shared(engine)
    }

    fn fetcher() -> Arc<MockFetcher> {
        Arc::new(
            MockFetcher::new()
                .with_features("parcels", polygons())
                .with_features("roads", lines())
                .with_features("stops", points()),
        )
    }

    fn synchronizer(
        engine: &SharedEngine<InMemoryEngine>,
        fetcher: Arc<MockFetcher>,
    ) -> TestSynchronizer {
        ProjectLayerSynchronizer::new(engine.clone(), fetcher, &test_config())
    }

    fn project_nodes() -> Vec<QgisLayerNode> {
        vec![
            QgisGroup {
                id: None,
                name: "Plans".into(),
                visible: false,
                children: vec![vector_layer("parcels", "Parcels")
                    .with_geometry(GeometryType::Polygon)
                    .into()],
            }
            .into(),
            vector_layer("roads", "Roads").into(),
            vector_layer("stops", "Stops").with_visible(false).into(),
            raster_layer("ortho", "Orthophoto").with_opacity(128).into(),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn materializes_visible_layers() {
        let engine = engine_with_base_map();
        let fetcher = fetcher();
        let synchronizer = synchronizer(&engine, fetcher.clone());

        let report = synchronizer.sync("Plan_1", &project_nodes()).await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.materialized, 3);
        assert!(report.is_complete());
        assert_eq!(report.phase, SyncPhase::Settled);
        assert_eq!(synchronizer.phase(), SyncPhase::Settled);

        let mut requested = fetcher.requests();
        requested.sort();
        assert_eq!(requested, ["parcels", "roads"]);

        let handles = synchronizer.handles();
        let strategies: Vec<_> = handles
            .iter()
            .map(|handle| (handle.qgis_id.as_str(), handle.strategy))
            .collect();
        assert_eq!(
            strategies,
            [
                ("parcels", RenderStrategy::Wfs),
                ("roads", RenderStrategy::Wfs),
                ("ortho", RenderStrategy::Wms)
            ]
        );

        let engine = engine.lock();
        assert_eq!(engine.layer_ids()[0], "background");
        assert!(engine.has_layer("qgis-wfs-layer-Plan_1-parcels-fill"));
        assert!(engine.has_layer("qgis-wfs-layer-Plan_1-roads-line"));
        assert!(engine.has_layer("qgis-wms-layer-Plan_1-ortho"));
        assert!(!engine.has_layer("qgis-wfs-layer-Plan_1-stops-circle"));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_layer_does_not_abort() {
        let engine = engine_with_base_map();
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_features("parcels", polygons())
                .with_error("roads", SyncError::Http { status: 500 })
                .with_features("stops", points()),
        );
        let observer = Arc::new(RecordingObserver::default());
        let synchronizer = synchronizer(&engine, fetcher).with_observer(observer.clone());

        let nodes: Vec<QgisLayerNode> = vec![
            vector_layer("parcels", "Parcels").into(),
            vector_layer("roads", "Roads").into(),
            vector_layer("stops", "Stops").into(),
        ];
        let report = synchronizer.sync("p", &nodes).await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.materialized, 2);
        assert_eq!(report.failures.len(), 1);
        assert_matches!(
            &report.failures[0],
            LayerFailure { qgis_id, error: SyncError::Http { status: 500 }, .. } if qgis_id == "roads"
        );

        let events = observer.events.lock().clone();
        assert!(events.contains(&"failed roads".to_string()));
        assert!(events.contains(&"added stops".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("finished p"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_project() {
        let engine = engine_with_base_map();
        let synchronizer = synchronizer(&engine, fetcher());

        let report = synchronizer.sync("empty", &[]).await.unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(report.materialized, 0);
        assert_eq!(report.phase, SyncPhase::Settled);
        assert_eq!(engine.lock().layer_ids(), ["background"]);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_tree_aborts() {
        let engine = engine_with_base_map();
        let synchronizer = synchronizer(&engine, fetcher());

        let nodes: Vec<QgisLayerNode> = vec![
            vector_layer("parcels", "Parcels").into(),
            vector_layer("parcels", "Parcels copy").into(),
        ];
        assert_matches!(
            synchronizer.sync("p", &nodes).await,
            Err(SyncError::MalformedTree(_))
        );
        assert_eq!(synchronizer.current_project(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn project_switch_starts_from_clean_slate() {
        let engine = engine_with_base_map();
        let synchronizer = synchronizer(&engine, fetcher());

        synchronizer.sync("first", &project_nodes()).await.unwrap();
        let nodes: Vec<QgisLayerNode> = vec![vector_layer("stops", "Stops").into()];
        let report = synchronizer.sync("second", &nodes).await.unwrap();

        assert_eq!(report.materialized, 1);
        assert_eq!(synchronizer.current_project().as_deref(), Some("second"));
        assert_eq!(
            engine.lock().layer_ids(),
            ["background", "qgis-wfs-layer-second-stops-circle"]
        );
        assert_eq!(
            engine.lock().source_ids(),
            ["composite", "qgis-wfs-second-stops"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_sync_does_not_duplicate() {
        let engine = engine_with_base_map();
        let synchronizer = synchronizer(&engine, fetcher());

        synchronizer.sync("p", &project_nodes()).await.unwrap();
        let layers = engine.lock().layer_ids();
        synchronizer.resync().await.unwrap();

        assert_eq!(engine.lock().layer_ids(), layers);
        assert_eq!(synchronizer.handles().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn style_rebuild_during_verification_is_healed() {
        let engine = engine_with_base_map();
        let synchronizer = Arc::new(synchronizer(&engine, fetcher()));
        let nodes = project_nodes();

        let task = tokio::spawn({
            let synchronizer = synchronizer.clone();
            async move { synchronizer.sync("p", &nodes).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            synchronizer.phase(),
            SyncPhase::AwaitingRebuildConfirmation
        );
        engine.lock().rebuild_style();
        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.lock().finish_style_load();

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.rebuild_retries, 1);
        assert_eq!(report.materialized, 3);
        assert!(synchronizer.is_intact());

        let engine = engine.lock();
        assert!(engine.has_layer("qgis-wms-layer-p-ortho"));
        assert!(engine.has_layer("qgis-wfs-layer-p-parcels-outline"));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let engine = engine_with_base_map();
        let config = SyncConfig::builder("http://qgis.test/ows")
            .with_max_rebuild_retries(1)
            .with_style_load_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let synchronizer = Arc::new(ProjectLayerSynchronizer::new(
            engine.clone(),
            fetcher(),
            &config,
        ));
        let nodes = project_nodes();

        let task = tokio::spawn({
            let synchronizer = synchronizer.clone();
            async move { synchronizer.sync("p", &nodes).await }
        });

        // The style is rebuilt after every re-add and never settles.
        for _ in 0..2 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            engine.lock().rebuild_style();
            engine.lock().finish_style_load();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.rebuild_retries, 1);
        assert_eq!(report.materialized, 0);
        assert!(!report.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_style_and_times_out() {
        let engine = engine_with_base_map();
        engine.lock().load_style("satellite");
        let synchronizer = synchronizer(&engine, fetcher());

        assert_matches!(
            synchronizer.sync("p", &project_nodes()).await,
            Err(SyncError::StyleNotLoaded)
        );
        assert!(engine.lock().layer_ids().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_sync_supersedes_older() {
        let engine = engine_with_base_map();
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_features("parcels", polygons())
                .with_delay("parcels", Duration::from_secs(5))
                .with_features("stops", points()),
        );
        let synchronizer = Arc::new(synchronizer(&engine, fetcher));

        let first = tokio::spawn({
            let synchronizer = synchronizer.clone();
            let nodes: Vec<QgisLayerNode> = vec![vector_layer("parcels", "Parcels").into()];
            async move { synchronizer.sync("first", &nodes).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let nodes: Vec<QgisLayerNode> = vec![vector_layer("stops", "Stops").into()];
        let report = synchronizer.sync("second", &nodes).await.unwrap();

        assert_matches!(first.await.unwrap(), Err(SyncError::Superseded));
        assert_eq!(report.materialized, 1);
        assert_eq!(
            engine.lock().layer_ids(),
            ["background", "qgis-wfs-layer-second-stops-circle"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clear_removes_generated_layers() {
        let engine = engine_with_base_map();
        let synchronizer = synchronizer(&engine, fetcher());
        synchronizer.sync("p", &project_nodes()).await.unwrap();

        synchronizer.clear().await;

        assert_eq!(engine.lock().layer_ids(), ["background"]);
        assert!(synchronizer.handles().is_empty());
        assert_eq!(synchronizer.current_project(), None);
        assert_eq!(synchronizer.phase(), SyncPhase::Idle);
        assert_eq!(synchronizer.resync().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn layers_keep_project_defaults() {
        let engine = engine_with_base_map();
        let synchronizer = synchronizer(&engine, fetcher());
        synchronizer.sync("p", &project_nodes()).await.unwrap();

        let engine = engine.lock();
        let ortho = engine.layer("qgis-wms-layer-p-ortho").unwrap();
        assert_eq!(ortho.visibility, Visibility::Visible);
        approx::assert_relative_eq!(ortho.opacity().unwrap(), 128.0 / 255.0);
    }
}
