use std::time::Duration;

use ahash::AHashMap;
use geojson::FeatureCollection;
use parking_lot::Mutex;
use qgis_sync_types::{LayerKind, QgisLayer};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::render::{FeatureFetcher, WfsRequest};

pub fn test_config() -> SyncConfig {
    SyncConfig::builder("http://qgis.test/ows")
        .build()
        .expect("valid config")
}

pub fn vector_layer(id: &str, name: &str) -> QgisLayer {
    QgisLayer::new(LayerKind::Vector, id, name)
}

pub fn raster_layer(id: &str, name: &str) -> QgisLayer {
    QgisLayer::new(LayerKind::Raster, id, name)
}

pub fn polygons() -> &'static str {
    r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"symbol":"MN"},"geometry":{"type":"Polygon",
         "coordinates":[[[21.0,52.2],[21.1,52.2],[21.1,52.3],[21.0,52.2]]]}}
    ]}"#
}

pub fn lines() -> &'static str {
    r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"name":"Main St"},"geometry":{"type":"LineString",
         "coordinates":[[21.0,52.2],[21.1,52.25]]}}
    ]}"#
}

pub fn points() -> &'static str {
    r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"stop":"A"},"geometry":{"type":"Point","coordinates":[21.0,52.2]}},
        {"type":"Feature","properties":{"stop":"B"},"geometry":{"type":"Point","coordinates":[21.1,52.3]}}
    ]}"#
}

/// Fetcher returning canned responses by QGIS layer id.
#[derive(Default)]
pub struct MockFetcher {
    responses: AHashMap<String, Result<FeatureCollection, SyncError>>,
    delays: AHashMap<String, Duration>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_features(mut self, qgis_id: &str, geojson: &str) -> Self {
        let collection = serde_json::from_str(geojson).expect("valid GeoJSON");
        self.responses.insert(qgis_id.to_string(), Ok(collection));
        self
    }

    pub fn with_error(mut self, qgis_id: &str, error: SyncError) -> Self {
        self.responses.insert(qgis_id.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, qgis_id: &str, delay: Duration) -> Self {
        self.delays.insert(qgis_id.to_string(), delay);
        self
    }

    /// Ids of the layers requested so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl FeatureFetcher for MockFetcher {
    async fn fetch(&self, request: &WfsRequest) -> Result<FeatureCollection, SyncError> {
        self.requests.lock().push(request.qgis_id.clone());
        assert!(request.url.contains(&format!("TYPENAME={}&", request.qgis_id)));

        if let Some(delay) = self.delays.get(&request.qgis_id) {
            tokio::time::sleep(*delay).await;
        }

        self.responses
            .get(&request.qgis_id)
            .cloned()
            .unwrap_or(Err(SyncError::Http { status: 404 }))
    }
}
