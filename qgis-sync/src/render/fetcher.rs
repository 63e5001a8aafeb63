use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use geojson::FeatureCollection;

use crate::error::SyncError;
use crate::http::HttpClient;

/// WFS `GetFeature` request of one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WfsRequest {
    /// QGIS id of the layer, used as the feature type name.
    pub qgis_id: String,
    /// Layer name, for diagnostics.
    pub name: String,
    /// Full request url.
    pub url: String,
}

/// Source of vector features of WFS layers.
#[async_trait]
pub trait FeatureFetcher: Send + Sync {
    /// Loads all features of the requested layer.
    async fn fetch(&self, request: &WfsRequest) -> Result<FeatureCollection, SyncError>;
}

#[async_trait]
impl<T: FeatureFetcher + ?Sized> FeatureFetcher for Arc<T> {
    async fn fetch(&self, request: &WfsRequest) -> Result<FeatureCollection, SyncError> {
        (**self).fetch(request).await
    }
}

/// Feature fetcher that requests GeoJSON from QGIS Server over HTTP.
///
/// ```no_run
/// use qgis_sync::config::SyncConfig;
/// use qgis_sync::http::HttpClient;
/// use qgis_sync::render::{FeatureFetcher, HttpFeatureFetcher, WfsRequest};
///
/// # async fn load() -> Result<(), qgis_sync::SyncError> {
/// let config = SyncConfig::builder("https://maps.example.com/ows").build()?;
/// let fetcher = HttpFeatureFetcher::new(HttpClient::new(&config)?);
/// let features = fetcher.fetch(&WfsRequest {
///     qgis_id: "parcels_3f2a".into(),
///     name: "Parcels".into(),
///     url: "https://maps.example.com/ows?SERVICE=WFS&REQUEST=GetFeature&TYPENAME=parcels_3f2a".into(),
/// }).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpFeatureFetcher {
    client: HttpClient,
}

impl HttpFeatureFetcher {
    /// Creates a new instance of the fetcher.
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeatureFetcher for HttpFeatureFetcher {
    async fn fetch(&self, request: &WfsRequest) -> Result<FeatureCollection, SyncError> {
        let bytes = self.client.load_bytes(&request.url).await?;
        let collection = decode_feature_collection(&bytes)?;
        log::debug!(
            "Loaded {} features of layer {}",
            collection.features.len(),
            request.name
        );

        Ok(collection)
    }
}

/// Parses a GeoJSON `FeatureCollection`.
pub fn decode_feature_collection(bytes: &Bytes) -> Result<FeatureCollection, SyncError> {
    Ok(serde_json::from_slice(bytes)?)
}
