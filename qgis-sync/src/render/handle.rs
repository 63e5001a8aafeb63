use qgis_sync_types::GeometryType;

use super::RenderStrategy;
use crate::engine::MapEngine;

/// Engine objects created for one QGIS layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLayerHandle {
    /// QGIS id of the layer.
    pub qgis_id: String,
    /// QGIS name of the layer.
    pub name: String,
    /// How the layer is drawn.
    pub strategy: RenderStrategy,
    /// Id of the engine source.
    pub source_id: String,
    /// Ids of the engine paint layers, bottom-most first.
    pub layer_ids: Vec<String>,
    /// Geometry type that determined the paint layers of a WFS layer.
    pub geometry: Option<GeometryType>,
}

impl RenderedLayerHandle {
    /// Returns true if the source and all paint layers still exist in the engine.
    pub fn is_intact(&self, engine: &impl MapEngine) -> bool {
        engine.has_source(&self.source_id) && self.layer_ids.iter().all(|id| engine.has_layer(id))
    }
}
