//! Flat lookup tables over a QGIS project tree.

use ahash::{AHashMap, AHashSet};
use log::warn;
use qgis_sync_types::{QgisLayer, QgisLayerNode};

use crate::error::SyncError;

/// Default limit of the project tree nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Name and id indices of the data layers of a QGIS project, and the list of layers visible by
/// the project defaults.
///
/// The catalog is rebuilt every time a project tree is loaded and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct LayerCatalog {
    ids_by_name: AHashMap<String, String>,
    layers: AHashMap<String, QgisLayer>,
    visible: Vec<QgisLayer>,
}

impl LayerCatalog {
    /// Walks the tree depth first.
    ///
    /// Visibility of groups is ignored: a visible layer inside a hidden group is still listed in
    /// [`LayerCatalog::visible_layers`]. When two layers share a name the first one in traversal
    /// order owns it.
    ///
    /// Returns [`SyncError::MalformedTree`] if the tree is nested deeper than `max_depth` or the
    /// same id appears twice, which is how a cyclic tree shows up after deserialization.
    pub fn build(nodes: &[QgisLayerNode], max_depth: usize) -> Result<Self, SyncError> {
        let mut catalog = Self::default();
        let mut seen_ids = AHashSet::new();
        catalog.visit(nodes, 1, max_depth, &mut seen_ids)?;

        Ok(catalog)
    }

    fn visit(
        &mut self,
        nodes: &[QgisLayerNode],
        depth: usize,
        max_depth: usize,
        seen_ids: &mut AHashSet<String>,
    ) -> Result<(), SyncError> {
        if depth > max_depth {
            return Err(SyncError::MalformedTree(format!(
                "tree is nested deeper than {max_depth} levels"
            )));
        }

        for node in nodes {
            if let Some(id) = node.id() {
                if !seen_ids.insert(id.to_string()) {
                    return Err(SyncError::MalformedTree(format!(
                        "node id {id} appears more than once"
                    )));
                }
            }

            match node {
                QgisLayerNode::Group(group) => {
                    self.visit(&group.children, depth + 1, max_depth, seen_ids)?
                }
                QgisLayerNode::Layer(layer) => self.add_layer(layer),
            }
        }

        Ok(())
    }

    fn add_layer(&mut self, layer: &QgisLayer) {
        match self.ids_by_name.get(&layer.name) {
            Some(existing) => warn!(
                "Layer name {:?} is used by both {existing} and {}, looking it up by name resolves to {existing}",
                layer.name, layer.id
            ),
            None => {
                self.ids_by_name
                    .insert(layer.name.clone(), layer.id.clone());
            }
        }

        if layer.visible {
            self.visible.push(layer.clone());
        }
        self.layers.insert(layer.id.clone(), layer.clone());
    }

    /// QGIS id of the layer with the given name.
    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.ids_by_name.get(name).map(String::as_str)
    }

    /// Layer with the given QGIS id.
    pub fn layer(&self, id: &str) -> Option<&QgisLayer> {
        self.layers.get(id)
    }

    /// Layers visible by the project defaults, in tree order.
    pub fn visible_layers(&self) -> &[QgisLayer] {
        &self.visible
    }

    /// Resolves a layer referenced by the UI: by its QGIS id if the catalog knows it, otherwise
    /// by name.
    pub fn resolve(&self, qgis_id: Option<&str>, name: &str) -> Option<&str> {
        qgis_id
            .and_then(|id| self.layers.get_key_value(id))
            .map(|(id, _)| id.as_str())
            .or_else(|| self.id_for_name(name))
    }

    /// Number of data layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if the project has no data layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
