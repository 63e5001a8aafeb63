use ahash::AHashMap;
use tokio::sync::watch;

use super::{
    EngineError, LayerSpec, MapEngine, PaintProperty, PaintValue, SourceSpec, StyleStatus,
    Visibility,
};

/// Headless map engine keeping the style in memory.
///
/// Layers are stored in drawing order: the first layer is the bottom-most one. Replacing the style
/// with [`InMemoryEngine::load_style`] or [`InMemoryEngine::rebuild_style`] drops all sources and
/// layers and leaves the style unloaded until [`InMemoryEngine::finish_style_load`] is called,
/// the same way a browser engine behaves while fetching a new style.
///
/// ```
/// use qgis_sync::engine::{InMemoryEngine, LayerFamily, LayerSpec, MapEngine, SourceSpec};
///
/// let mut engine = InMemoryEngine::new("streets");
/// engine.add_source("dem", SourceSpec::RasterTiles {
///     tiles: vec!["https://tiles.test/{z}/{x}/{y}.png".into()],
///     tile_size: 256,
///     min_zoom: 0,
///     max_zoom: 22,
/// }).unwrap();
/// engine.add_layer(LayerSpec::new("dem", "dem", LayerFamily::Raster)).unwrap();
///
/// engine.load_style("satellite");
/// assert!(!engine.has_layer("dem"));
/// assert!(!engine.is_style_loaded());
/// ```
pub struct InMemoryEngine {
    sources: AHashMap<String, SourceSpec>,
    layers: Vec<LayerSpec>,
    style: watch::Sender<StyleStatus>,
}

impl InMemoryEngine {
    /// Creates an engine with an empty, loaded style.
    pub fn new(style_key: impl Into<String>) -> Self {
        let (style, _) = watch::channel(StyleStatus {
            key: style_key.into(),
            loaded: true,
            generation: 0,
        });

        Self {
            sources: AHashMap::new(),
            layers: vec![],
            style,
        }
    }

    /// Starts loading a new style, dropping every source and layer of the current one.
    pub fn load_style(&mut self, style_key: impl Into<String>) {
        let key = style_key.into();
        log::debug!("Loading style {key}");

        self.sources.clear();
        self.layers.clear();
        self.style.send_modify(|status| {
            status.key = key;
            status.loaded = false;
            status.generation += 1;
        });
    }

    /// Replaces the style object with a fresh copy of the same style. This is what happens when
    /// the terrain/3D mode is toggled.
    pub fn rebuild_style(&mut self) {
        let key = self.style.borrow().key.clone();
        self.load_style(key);
    }

    /// Marks the current style as loaded.
    pub fn finish_style_load(&mut self) {
        self.style.send_if_modified(|status| {
            let modified = !status.loaded;
            status.loaded = true;
            modified
        });
    }

    /// Returns the source with the given id.
    pub fn source(&self, id: &str) -> Option<&SourceSpec> {
        self.sources.get(id)
    }

    /// All layers in drawing order.
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    fn ensure_loaded(&self) -> Result<(), EngineError> {
        if self.style.borrow().loaded {
            Ok(())
        } else {
            Err(EngineError::StyleNotLoaded)
        }
    }

    fn index_of(&self, id: &str) -> Result<usize, EngineError> {
        self.layers
            .iter()
            .position(|layer| layer.id == id)
            .ok_or_else(|| EngineError::MissingLayer(id.to_string()))
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut LayerSpec, EngineError> {
        let index = self.index_of(id)?;
        Ok(&mut self.layers[index])
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new("default")
    }
}

impl MapEngine for InMemoryEngine {
    fn style_status(&self) -> StyleStatus {
        self.style.borrow().clone()
    }

    fn subscribe_style(&self) -> watch::Receiver<StyleStatus> {
        self.style.subscribe()
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|layer| layer.id == id)
    }

    fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sources.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|layer| layer.id.clone()).collect()
    }

    fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        if self.sources.contains_key(id) {
            return Err(EngineError::DuplicateSource(id.to_string()));
        }

        self.sources.insert(id.to_string(), source);
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), EngineError> {
        self.ensure_loaded()?;
        if self.has_layer(&layer.id) {
            return Err(EngineError::DuplicateLayer(layer.id));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(EngineError::MissingSource(layer.source));
        }

        self.layers.push(layer);
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        let index = self.index_of(id)?;
        self.layers.remove(index);
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        if let Some(layer) = self.layers.iter().find(|layer| layer.source == id) {
            return Err(EngineError::SourceInUse(id.to_string(), layer.id.clone()));
        }

        match self.sources.remove(id) {
            Some(_) => Ok(()),
            None => Err(EngineError::MissingSource(id.to_string())),
        }
    }

    fn set_visibility(&mut self, id: &str, visibility: Visibility) -> Result<(), EngineError> {
        self.layer_mut(id)?.visibility = visibility;
        Ok(())
    }

    fn set_paint_property(
        &mut self,
        id: &str,
        property: PaintProperty,
        value: PaintValue,
    ) -> Result<(), EngineError> {
        self.layer_mut(id)?.paint.insert(property, value);
        Ok(())
    }

    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), EngineError> {
        if before == Some(id) {
            return Ok(());
        }

        let index = self.index_of(id)?;
        if let Some(before) = before {
            self.index_of(before)?;
        }

        let layer = self.layers.remove(index);
        let target = match before {
            Some(before) => self.index_of(before)?,
            None => self.layers.len(),
        };
        self.layers.insert(target, layer);

        Ok(())
    }
}
