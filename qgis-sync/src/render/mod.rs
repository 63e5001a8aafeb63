//! Turning QGIS layers into map engine sources and paint layers.
//!
//! A layer is drawn either as WMS raster tiles rendered by QGIS Server, or as GeoJSON features
//! fetched over WFS and painted by the map engine. Which one is chosen by the configured
//! [`StrategyPolicy`].

use geojson::{FeatureCollection, Value};
use log::{debug, warn};
use qgis_sync_types::{Color, GeometryType, PaintFamily, QgisLayer};

use crate::config::SyncConfig;
use crate::engine::{
    LayerFamily, LayerSpec, MapEngine, PaintProperty, SharedEngine, SourceSpec, Visibility,
};
use crate::error::SyncError;
use crate::ows::OwsEndpoint;
use crate::sync::SyncTicket;

mod fetcher;
mod handle;
mod ids;
mod strategy;

pub use fetcher::{decode_feature_collection, FeatureFetcher, HttpFeatureFetcher, WfsRequest};
pub use handle::RenderedLayerHandle;
pub use ids::{
    is_generated_layer, is_generated_source, LayerIds, VectorRole, WFS_LAYER_PREFIX,
    WFS_SOURCE_PREFIX, WMS_LAYER_PREFIX, WMS_SOURCE_PREFIX,
};
pub use strategy::{RenderStrategy, StrategyPolicy};

const OUTLINE_WIDTH: f64 = 2.0;
const LINE_WIDTH: f64 = 3.0;
const CIRCLE_RADIUS: f64 = 6.0;
const CIRCLE_STROKE_WIDTH: f64 = 2.0;

/// Creates and removes the engine objects of single QGIS layers.
///
/// All operations are guarded by existence checks, so materializing a layer that is already on
/// the map returns its handle without touching the engine.
pub struct LayerRenderAdapter<F> {
    endpoint: OwsEndpoint,
    fetcher: F,
    policy: StrategyPolicy,
    tile_size: u32,
    zoom_range: (u8, u8),
    max_features: Option<u32>,
}

impl<F: FeatureFetcher> LayerRenderAdapter<F> {
    /// Creates an adapter for the configured server.
    pub fn new(config: &SyncConfig, fetcher: F) -> Self {
        Self {
            endpoint: OwsEndpoint::new(config.server_url().clone()),
            fetcher,
            policy: config.strategy_policy(),
            tile_size: config.tile_size(),
            zoom_range: config.zoom_range(),
            max_features: config.max_features(),
        }
    }

    /// Strategy the layer is drawn with.
    pub fn strategy(&self, layer: &QgisLayer) -> RenderStrategy {
        self.policy.select(layer)
    }

    /// Adds the layer to the map.
    ///
    /// WFS layers are fetched without holding the engine lock. If `ticket` becomes stale while
    /// the features are loading, nothing is added and [`SyncError::Superseded`] is returned.
    pub async fn materialize<E: MapEngine>(
        &self,
        engine: &SharedEngine<E>,
        layer: &QgisLayer,
        project: &str,
        ticket: &SyncTicket,
    ) -> Result<RenderedLayerHandle, SyncError> {
        match self.strategy(layer) {
            RenderStrategy::Wms => {
                let mut engine = engine.lock();
                self.materialize_wms(&mut *engine, layer, project, ticket)
            }
            RenderStrategy::Wfs => self.materialize_wfs(engine, layer, project, ticket).await,
        }
    }

    fn materialize_wms<E: MapEngine>(
        &self,
        engine: &mut E,
        layer: &QgisLayer,
        project: &str,
        ticket: &SyncTicket,
    ) -> Result<RenderedLayerHandle, SyncError> {
        let ids = LayerIds::new(project, &layer.id);
        let source_id = ids.wms_source();
        let layer_id = ids.wms_layer();
        let handle = RenderedLayerHandle {
            qgis_id: layer.id.clone(),
            name: layer.name.clone(),
            strategy: RenderStrategy::Wms,
            source_id: source_id.clone(),
            layer_ids: vec![layer_id.clone()],
            geometry: layer.geometry,
        };

        if engine.has_layer(&layer_id) {
            debug!("WMS layer {layer_id} already exists");
            return Ok(handle);
        }

        ticket.check()?;
        if !engine.is_style_loaded() {
            return Err(SyncError::StyleNotLoaded);
        }

        let (min_zoom, max_zoom) = self.zoom_range;
        let source_added = !engine.has_source(&source_id);
        if source_added {
            engine.add_source(
                &source_id,
                SourceSpec::RasterTiles {
                    tiles: vec![self
                        .endpoint
                        .wms_tile_template(&layer.name, project, self.tile_size)],
                    tile_size: self.tile_size,
                    min_zoom,
                    max_zoom,
                },
            )?;
        }

        let (opacity_property, opacity) = LayerFamily::Raster.paint_opacity(layer.unit_opacity());
        let spec = LayerSpec::new(&layer_id, &source_id, LayerFamily::Raster)
            .with_visibility(layer.visible.into())
            .with_paint(opacity_property, opacity)
            .with_zoom_range(min_zoom, max_zoom);

        if let Err(err) = engine.add_layer(spec) {
            if source_added {
                remove_source_if_exists(engine, &source_id);
            }
            return Err(err.into());
        }

        debug!("Added WMS layer {layer_id} ({})", layer.name);
        Ok(handle)
    }

    async fn materialize_wfs<E: MapEngine>(
        &self,
        engine: &SharedEngine<E>,
        layer: &QgisLayer,
        project: &str,
        ticket: &SyncTicket,
    ) -> Result<RenderedLayerHandle, SyncError> {
        let ids = LayerIds::new(project, &layer.id);
        let existing = {
            let engine = engine.lock();
            existing_wfs_handle(&*engine, layer, &ids)
        };
        if let Some(handle) = existing {
            debug!("WFS layers of {} already exist", layer.name);
            return Ok(handle);
        }

        let request = WfsRequest {
            qgis_id: layer.id.clone(),
            name: layer.name.clone(),
            url: self
                .endpoint
                .wfs_get_feature(&layer.id, project, self.max_features),
        };
        let collection = self.fetcher.fetch(&request).await?;
        let geometry = first_geometry_type(&collection).ok_or_else(|| {
            SyncError::UnsupportedGeometry(format!(
                "layer {} has no features with a drawable geometry",
                layer.name
            ))
        })?;

        let mut engine = engine.lock();
        ticket.check()?;
        if let Some(handle) = existing_wfs_handle(&*engine, layer, &ids) {
            return Ok(handle);
        }
        if !engine.is_style_loaded() {
            return Err(SyncError::StyleNotLoaded);
        }

        let source_id = ids.wfs_source();
        if engine.has_source(&source_id) {
            // Left over by an interrupted materialization.
            engine.remove_source(&source_id)?;
        }
        engine.add_source(&source_id, SourceSpec::GeoJson { data: collection })?;

        let mut layer_ids: Vec<String> = vec![];
        for spec in vector_layers(&ids, &source_id, geometry, layer) {
            let id = spec.id.clone();
            if let Err(err) = engine.add_layer(spec) {
                for added in &layer_ids {
                    remove_layer_if_exists(&mut *engine, added);
                }
                remove_source_if_exists(&mut *engine, &source_id);
                return Err(err.into());
            }
            layer_ids.push(id);
        }

        debug!(
            "Added WFS layer {} as {} with {} paint layers",
            layer.name,
            geometry.name(),
            layer_ids.len()
        );

        Ok(RenderedLayerHandle {
            qgis_id: layer.id.clone(),
            name: layer.name.clone(),
            strategy: RenderStrategy::Wfs,
            source_id,
            layer_ids,
            geometry: Some(geometry),
        })
    }

    /// Removes the paint layers and then the source of the handle. Objects that are already gone
    /// are skipped.
    pub fn dematerialize<E: MapEngine>(
        &self,
        engine: &mut E,
        handle: &RenderedLayerHandle,
    ) -> Result<(), SyncError> {
        for id in &handle.layer_ids {
            if engine.has_layer(id) {
                engine.remove_layer(id)?;
            }
        }

        if engine.has_source(&handle.source_id) {
            engine.remove_source(&handle.source_id)?;
        }

        Ok(())
    }
}

fn existing_wfs_handle<E: MapEngine>(
    engine: &E,
    layer: &QgisLayer,
    ids: &LayerIds,
) -> Option<RenderedLayerHandle> {
    let source_id = ids.wfs_source();
    if !engine.has_source(&source_id) {
        return None;
    }

    let layer_ids: Vec<String> = VectorRole::ALL
        .iter()
        .map(|role| ids.wfs_layer(*role))
        .filter(|id| engine.has_layer(id))
        .collect();
    if layer_ids.is_empty() {
        return None;
    }

    Some(RenderedLayerHandle {
        qgis_id: layer.id.clone(),
        name: layer.name.clone(),
        strategy: RenderStrategy::Wfs,
        source_id,
        layer_ids,
        geometry: layer.geometry,
    })
}

/// Geometry type of the first feature of the collection.
pub fn first_geometry_type(collection: &FeatureCollection) -> Option<GeometryType> {
    let geometry = collection.features.first()?.geometry.as_ref()?;
    match geometry.value {
        Value::Point(_) => Some(GeometryType::Point),
        Value::MultiPoint(_) => Some(GeometryType::MultiPoint),
        Value::LineString(_) => Some(GeometryType::LineString),
        Value::MultiLineString(_) => Some(GeometryType::MultiLineString),
        Value::Polygon(_) => Some(GeometryType::Polygon),
        Value::MultiPolygon(_) => Some(GeometryType::MultiPolygon),
        Value::GeometryCollection(_) => None,
    }
}

fn vector_layers(
    ids: &LayerIds,
    source_id: &str,
    geometry: GeometryType,
    layer: &QgisLayer,
) -> Vec<LayerSpec> {
    let opacity = layer.unit_opacity();
    let visibility = Visibility::from(layer.visible);
    let spec = |role: VectorRole| {
        let family = role.family();
        let (opacity_property, value) = family.paint_opacity(opacity);
        LayerSpec::new(ids.wfs_layer(role), source_id, family)
            .with_visibility(visibility)
            .with_paint(opacity_property, value)
    };

    match geometry.paint_family() {
        PaintFamily::FillWithOutline => vec![
            spec(VectorRole::Fill).with_paint(PaintProperty::FillColor, Color::FEATURE_FILL),
            spec(VectorRole::Outline)
                .with_paint(PaintProperty::LineColor, Color::WHITE)
                .with_paint(PaintProperty::LineWidth, OUTLINE_WIDTH),
        ],
        PaintFamily::Line => vec![spec(VectorRole::Line)
            .with_paint(PaintProperty::LineColor, Color::TEAL)
            .with_paint(PaintProperty::LineWidth, LINE_WIDTH)],
        PaintFamily::Circle => vec![spec(VectorRole::Circle)
            .with_paint(PaintProperty::CircleColor, Color::FEATURE_FILL)
            .with_paint(PaintProperty::CircleRadius, CIRCLE_RADIUS)
            .with_paint(PaintProperty::CircleStrokeColor, Color::WHITE)
            .with_paint(PaintProperty::CircleStrokeWidth, CIRCLE_STROKE_WIDTH)],
    }
}

fn remove_layer_if_exists<E: MapEngine>(engine: &mut E, id: &str) {
    if engine.has_layer(id) {
        if let Err(err) = engine.remove_layer(id) {
            warn!("Failed to remove layer {id}: {err}");
        }
    }
}

fn remove_source_if_exists<E: MapEngine>(engine: &mut E, id: &str) {
    if engine.has_source(id) {
        if let Err(err) = engine.remove_source(id) {
            warn!("Failed to remove source {id}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    use qgis_sync_types::LayerKind;

    use super::*;
    use crate::engine::{shared, InMemoryEngine, PaintValue};
    use crate::sync::SyncToken;
    use crate::tests::{points, polygons, test_config, vector_layer, MockFetcher};

    fn adapter(fetcher: MockFetcher) -> LayerRenderAdapter<MockFetcher> {
        LayerRenderAdapter::new(&test_config(), fetcher)
    }

    #[tokio::test]
    async fn wms_layer() {
        let engine = shared(InMemoryEngine::default());
        let adapter = adapter(MockFetcher::new());
        let ticket = SyncToken::new().issue();
        let layer = QgisLayer::new(LayerKind::Raster, "ortho_11aa", "Orthophoto")
            .with_opacity(128)
            .with_visible(false);

        let handle = adapter
            .materialize(&engine, &layer, "Plan_1", &ticket)
            .await
            .unwrap();
        assert_eq!(handle.strategy, RenderStrategy::Wms);
        assert_eq!(handle.layer_ids, ["qgis-wms-layer-Plan_1-ortho_11aa"]);

        let engine = engine.lock();
        let spec = engine.layer(&handle.layer_ids[0]).unwrap();
        assert_eq!(spec.family, LayerFamily::Raster);
        assert_eq!(spec.visibility, Visibility::None);
        assert_relative_eq!(spec.opacity().unwrap(), 0.50196, epsilon = 1e-5);
        assert_matches!(
            engine.source(&handle.source_id),
            Some(SourceSpec::RasterTiles { tiles, tile_size: 256, .. })
                if tiles[0].contains("LAYERS=Orthophoto&") && tiles[0].ends_with("{bbox-epsg-3857}")
        );
    }

    #[tokio::test]
    async fn materialize_is_idempotent() {
        let engine = shared(InMemoryEngine::default());
        let fetcher = MockFetcher::new().with_features("parcels", polygons());
        let adapter = adapter(fetcher);
        let ticket = SyncToken::new().issue();
        let layer = vector_layer("parcels", "Parcels");

        let first = adapter
            .materialize(&engine, &layer, "Plan_1", &ticket)
            .await
            .unwrap();
        let second = adapter
            .materialize(&engine, &layer, "Plan_1", &ticket)
            .await
            .unwrap();

        assert_eq!(first.layer_ids, second.layer_ids);
        assert_eq!(first.source_id, second.source_id);
        let engine = engine.lock();
        assert_eq!(engine.source_ids().len(), 1);
        assert_eq!(engine.layer_ids().len(), 2);
    }

    #[tokio::test]
    async fn geometry_selects_paint_layers() {
        let engine = shared(InMemoryEngine::default());
        let fetcher = MockFetcher::new()
            .with_features("parcels", polygons())
            .with_features("stops", points());
        let adapter = adapter(fetcher);
        let ticket = SyncToken::new().issue();

        let parcels = adapter
            .materialize(&engine, &vector_layer("parcels", "Parcels"), "p", &ticket)
            .await
            .unwrap();
        let stops = adapter
            .materialize(&engine, &vector_layer("stops", "Stops"), "p", &ticket)
            .await
            .unwrap();

        assert_eq!(parcels.geometry, Some(GeometryType::Polygon));
        assert_eq!(
            parcels.layer_ids,
            ["qgis-wfs-layer-p-parcels-fill", "qgis-wfs-layer-p-parcels-outline"]
        );
        assert_eq!(stops.layer_ids, ["qgis-wfs-layer-p-stops-circle"]);

        let engine = engine.lock();
        let fill = engine.layer(&parcels.layer_ids[0]).unwrap();
        assert_eq!(fill.family, LayerFamily::Fill);
        assert_relative_eq!(fill.opacity().unwrap(), 0.5);
        assert_eq!(
            fill.paint.get(&PaintProperty::FillColor),
            Some(&PaintValue::Color(Color::FEATURE_FILL))
        );
        assert_eq!(
            engine.layer(&stops.layer_ids[0]).unwrap().family,
            LayerFamily::Circle
        );
    }

    #[tokio::test]
    async fn empty_collection_is_unsupported() {
        let engine = shared(InMemoryEngine::default());
        let fetcher = MockFetcher::new().with_features(
            "empty",
            r#"{"type":"FeatureCollection","features":[]}"#,
        );
        let adapter = adapter(fetcher);
        let ticket = SyncToken::new().issue();

        let result = adapter
            .materialize(&engine, &vector_layer("empty", "Empty"), "p", &ticket)
            .await;
        assert_matches!(result, Err(SyncError::UnsupportedGeometry(_)));
        assert!(engine.lock().source_ids().is_empty());
    }

    #[tokio::test]
    async fn stale_ticket_adds_nothing() {
        let engine = shared(InMemoryEngine::default());
        let adapter = adapter(MockFetcher::new().with_features("parcels", polygons()));
        let token = SyncToken::new();
        let ticket = token.issue();
        token.issue();

        let result = adapter
            .materialize(&engine, &vector_layer("parcels", "Parcels"), "p", &ticket)
            .await;
        assert_matches!(result, Err(SyncError::Superseded));
        assert!(engine.lock().layer_ids().is_empty());
    }

    #[tokio::test]
    async fn dematerialize_removes_everything() {
        let engine = shared(InMemoryEngine::default());
        let adapter = adapter(MockFetcher::new().with_features("parcels", polygons()));
        let ticket = SyncToken::new().issue();
        let handle = adapter
            .materialize(&engine, &vector_layer("parcels", "Parcels"), "p", &ticket)
            .await
            .unwrap();

        let mut engine = engine.lock();
        adapter.dematerialize(&mut *engine, &handle).unwrap();
        assert!(engine.layer_ids().is_empty());
        assert!(engine.source_ids().is_empty());

        // Second call finds nothing to remove.
        adapter.dematerialize(&mut *engine, &handle).unwrap();
    }

    #[test]
    fn first_feature_geometry() {
        let collection: FeatureCollection = serde_json::from_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"MultiLineString","coordinates":[[[0,0],[1,1]]]}},
                {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[0,0]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            first_geometry_type(&collection),
            Some(GeometryType::MultiLineString)
        );
    }
}
