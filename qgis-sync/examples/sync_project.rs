//! This example loads a QGIS project from a server, puts its visible layers on a headless map,
//! hides the first layer of the tree and then switches the base map to show the layers coming
//! back with the layer tree applied.
//!
//! ```sh
//! cargo run --example sync_project -- https://maps.example.com/ows Plan_1
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use qgis_sync::engine::{shared, InMemoryEngine, MapEngine};
use qgis_sync::http::HttpClient;
use qgis_sync::qgis_sync_types::LayerTree;
use qgis_sync::render::HttpFeatureFetcher;
use qgis_sync::{
    ProjectLayerSynchronizer, ProjectLoader, StyleLifecycleGuard, SyncConfig, VisibilitySync,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let server_url = args.next().context("usage: sync_project <server url> <project>")?;
    let project = args.next().context("usage: sync_project <server url> <project>")?;

    let config = SyncConfig::builder(server_url).build()?;
    let engine = shared(InMemoryEngine::new("streets"));

    let tree = ProjectLoader::new(&config)?.load(&project).await?;
    let fetcher = HttpFeatureFetcher::new(HttpClient::new(&config)?);
    let visibility = VisibilitySync::new(engine.clone()).into_shared();
    let synchronizer = Arc::new(
        ProjectLayerSynchronizer::new(engine.clone(), fetcher, &config)
            .with_observer(visibility.clone()),
    );

    let report = synchronizer.sync(&project, &tree.children).await?;
    println!(
        "{} of {} layers added in {:?}",
        report.materialized, report.attempted, report.elapsed
    );
    for failure in &report.failures {
        println!("  {} failed: {}", failure.name, failure.error);
    }

    let guard = StyleLifecycleGuard::new(&engine, &config).spawn(synchronizer.clone());

    let mut layer_tree = LayerTree::from_project(&tree.children);
    if let Some(first) = layer_tree.leaves().first() {
        layer_tree.set_visible(&first.id, false)?;
    }

    let catalog = synchronizer
        .catalog()
        .context("synchronizer has no project")?;
    let reconciled = visibility
        .lock()
        .reconcile_if_changed(&catalog, &project, &layer_tree);
    if let Some(reconciled) = reconciled {
        println!(
            "Applied layer tree: {} updated, {} unresolved, {} not on the map",
            reconciled.updated, reconciled.skipped_unresolved, reconciled.skipped_unrendered
        );
    }

    engine.lock().load_style("satellite");
    tokio::time::sleep(Duration::from_millis(200)).await;
    engine.lock().finish_style_load();
    tokio::time::sleep(config.lifecycle_debounce() + Duration::from_secs(5)).await;

    // The synchronizer re-applies the layer tree once the layers are back.
    println!("Layers after the base map switch:");
    let engine = engine.lock();
    for layer in engine.layers() {
        println!("  {} ({})", layer.id, layer.visibility.as_str());
    }
    drop(engine);

    guard.abort();
    Ok(())
}
