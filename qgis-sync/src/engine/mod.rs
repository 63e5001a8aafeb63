//! Capabilities of a map engine the synchronization needs.
//!
//! A map engine (Mapbox GL, MapLibre, a native renderer) owns a *style*: an ordered list of paint
//! layers drawing data from named sources. Replacing the style (base map switch, 3D mode toggle)
//! drops every source and layer that was added to it, and a freshly set style loads
//! asynchronously. [`MapEngine`] exposes exactly that much, so the synchronization can work with
//! any engine, including the headless [`InMemoryEngine`].

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;

mod memory;
mod spec;

pub use memory::InMemoryEngine;
pub use spec::{
    LayerFamily, LayerSpec, PaintProperty, PaintValue, SourceSpec, Visibility,
    FILL_OPACITY_FACTOR,
};

/// Map engine shared between the synchronization components.
///
/// All engine mutations go through this lock. It is never held across an `.await`.
pub type SharedEngine<E> = Arc<Mutex<E>>;

/// Wraps the engine for sharing.
pub fn shared<E: MapEngine>(engine: E) -> SharedEngine<E> {
    Arc::new(Mutex::new(engine))
}

/// Loading state of the engine style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleStatus {
    /// Identifies the style: base map plus any mode (like 3D) that rebuilds the style.
    pub key: String,
    /// Whether sources and layers can be added.
    pub loaded: bool,
    /// Incremented every time the style object is replaced, even with the same key.
    pub generation: u64,
}

/// Errors reported by the engine for invalid operations.
///
/// Engine operations are not idempotent: adding an existing id or removing a missing one is an
/// error, so callers check existence first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Style is still loading.
    #[error("style is not done loading")]
    StyleNotLoaded,
    /// Source with this id already exists.
    #[error("source {0} already exists")]
    DuplicateSource(String),
    /// Layer with this id already exists.
    #[error("layer {0} already exists")]
    DuplicateLayer(String),
    /// Source does not exist.
    #[error("source {0} does not exist")]
    MissingSource(String),
    /// Layer does not exist.
    #[error("layer {0} does not exist")]
    MissingLayer(String),
    /// Source cannot be removed while layers draw it.
    #[error("source {0} is used by layer {1}")]
    SourceInUse(String, String),
}

/// Map engine operations used by the synchronization.
pub trait MapEngine: Send + 'static {
    /// Current style status.
    fn style_status(&self) -> StyleStatus;
    /// Subscribes to style status changes.
    fn subscribe_style(&self) -> watch::Receiver<StyleStatus>;
    /// Whether sources and layers can be added right now.
    fn is_style_loaded(&self) -> bool {
        self.style_status().loaded
    }

    /// Returns true if the style has a source with the given id.
    fn has_source(&self, id: &str) -> bool;
    /// Returns true if the style has a layer with the given id.
    fn has_layer(&self, id: &str) -> bool;
    /// Ids of all sources.
    fn source_ids(&self) -> Vec<String>;
    /// Ids of all layers, from the bottom-most to the top-most.
    fn layer_ids(&self) -> Vec<String>;
    /// Returns the layer with the given id.
    fn layer(&self, id: &str) -> Option<&LayerSpec>;

    /// Adds a source.
    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<(), EngineError>;
    /// Adds a layer on top of all other layers.
    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), EngineError>;
    /// Removes a layer.
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;
    /// Removes a source. Fails if any layer still uses it.
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;
    /// Sets layout visibility of a layer.
    fn set_visibility(&mut self, id: &str, visibility: Visibility) -> Result<(), EngineError>;
    /// Sets a paint property of a layer.
    fn set_paint_property(
        &mut self,
        id: &str,
        property: PaintProperty,
        value: PaintValue,
    ) -> Result<(), EngineError>;
    /// Moves a layer directly below the `before` layer, or to the top if `before` is `None`.
    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), EngineError>;
}
