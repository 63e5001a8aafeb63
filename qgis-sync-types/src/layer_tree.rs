//! Application side layer tree.
//!
//! This is the tree a user sees in the layer panel. It is created from a QGIS project on load and
//! afterwards mutated only by user actions: visibility toggles, opacity sliders, renames and
//! drag-and-drop. Node ids are generated on the client and have nothing to do with QGIS ids, so
//! every leaf also records the QGIS id it was created from.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::Color;
use crate::error::LayerTreeError;
use crate::qgis::{LayerKind, QgisLayerNode};

/// Kind of data a leaf represents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafKind {
    /// Vector layer.
    Vector,
    /// Raster layer.
    Raster,
    /// External WMS layer.
    Wms,
}

impl From<LayerKind> for LeafKind {
    fn from(value: LayerKind) -> Self {
        match value {
            LayerKind::Vector => Self::Vector,
            LayerKind::Raster => Self::Raster,
        }
    }
}

/// Node of the application layer tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerTreeNode {
    /// Folder node.
    Group {
        /// Client side id.
        id: String,
        /// Display name.
        name: String,
        /// Visibility of the group. A hidden group hides all its descendants.
        visible: bool,
        /// Child nodes, top-most first.
        children: Vec<LayerTreeNode>,
    },
    /// Data layer node.
    Leaf {
        /// Client side id.
        id: String,
        /// Display name. For nodes without `qgis_id` this is the only link to the QGIS layer.
        name: String,
        /// Visibility of the layer.
        visible: bool,
        /// Kind of the layer.
        kind: LeafKind,
        /// Symbol color override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<Color>,
        /// Opacity in `0.0..=1.0`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opacity: Option<f64>,
        /// Id of the QGIS layer this node was created from.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        qgis_id: Option<String>,
    },
}

impl LayerTreeNode {
    /// Creates a new group with a freshly generated id.
    pub fn group(name: impl Into<String>, children: Vec<LayerTreeNode>) -> Self {
        Self::Group {
            id: new_node_id(),
            name: name.into(),
            visible: true,
            children,
        }
    }

    /// Creates a new visible leaf with a freshly generated id and no QGIS id.
    pub fn leaf(name: impl Into<String>, kind: LeafKind) -> Self {
        Self::Leaf {
            id: new_node_id(),
            name: name.into(),
            visible: true,
            kind,
            color: None,
            opacity: None,
            qgis_id: None,
        }
    }

    /// Client side id of the node.
    pub fn id(&self) -> &str {
        match self {
            Self::Group { id, .. } | Self::Leaf { id, .. } => id,
        }
    }

    /// Display name of the node.
    pub fn name(&self) -> &str {
        match self {
            Self::Group { name, .. } | Self::Leaf { name, .. } => name,
        }
    }

    /// Own visibility flag of the node.
    pub fn is_visible(&self) -> bool {
        match self {
            Self::Group { visible, .. } | Self::Leaf { visible, .. } => *visible,
        }
    }

    /// Children of a group, empty for a leaf.
    pub fn children(&self) -> &[LayerTreeNode] {
        match self {
            Self::Group { children, .. } => children,
            Self::Leaf { .. } => &[],
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.id() == id || self.children().iter().any(|child| child.contains(id))
    }
}

/// Flattened, owned view of a leaf as seen by the synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafView {
    /// Client side id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Effective visibility: the leaf and all of its ancestors are visible.
    pub visible: bool,
    /// Opacity in `0.0..=1.0`, if set.
    pub opacity: Option<f64>,
    /// QGIS id the leaf was created from.
    pub qgis_id: Option<String>,
    /// Kind of the layer.
    pub kind: LeafKind,
}

/// Hierarchical layer tree with stable client side ids.
///
/// Every successful mutation increments [`LayerTree::revision`], so observers can cheaply detect
/// whether anything changed since they last looked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerTree {
    roots: Vec<LayerTreeNode>,
    #[serde(skip)]
    revision: u64,
}

impl LayerTree {
    /// Creates a tree from the given root nodes.
    pub fn new(roots: Vec<LayerTreeNode>) -> Self {
        Self { roots, revision: 0 }
    }

    /// Creates the application tree for a freshly loaded QGIS project. Every leaf remembers the
    /// QGIS id it was created from, QGIS opacity is converted into `0.0..=1.0`.
    pub fn from_project(nodes: &[QgisLayerNode]) -> Self {
        Self::new(nodes.iter().map(node_from_qgis).collect())
    }

    /// Top level nodes, top-most first.
    pub fn roots(&self) -> &[LayerTreeNode] {
        &self.roots
    }

    /// Number of mutations applied to the tree.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the node with the given id.
    pub fn find(&self, id: &str) -> Option<&LayerTreeNode> {
        find_in(&self.roots, id)
    }

    /// Sets own visibility of the node.
    pub fn set_visible(&mut self, id: &str, visible: bool) -> Result<(), LayerTreeError> {
        match self.find_mut(id)? {
            LayerTreeNode::Group { visible: v, .. } | LayerTreeNode::Leaf { visible: v, .. } => {
                *v = visible
            }
        }

        self.touch();
        Ok(())
    }

    /// Sets opacity of a leaf. The value is clamped into `0.0..=1.0`.
    pub fn set_opacity(&mut self, id: &str, opacity: f64) -> Result<(), LayerTreeError> {
        match self.find_mut(id)? {
            LayerTreeNode::Leaf { opacity: o, .. } => *o = Some(opacity.clamp(0.0, 1.0)),
            LayerTreeNode::Group { .. } => return Err(LayerTreeError::NotALeaf(id.to_string())),
        }

        self.touch();
        Ok(())
    }

    /// Renames the node. Leaves that have no QGIS id lose their link to the QGIS layer when
    /// renamed.
    pub fn rename(&mut self, id: &str, new_name: impl Into<String>) -> Result<(), LayerTreeError> {
        match self.find_mut(id)? {
            LayerTreeNode::Group { name, .. } | LayerTreeNode::Leaf { name, .. } => {
                *name = new_name.into()
            }
        }

        self.touch();
        Ok(())
    }

    /// Moves the node into `parent` (or to the top level if `None`) at position `index`. Index
    /// larger than the number of children appends the node to the end.
    pub fn move_node(
        &mut self,
        id: &str,
        parent: Option<&str>,
        index: usize,
    ) -> Result<(), LayerTreeError> {
        let node = self
            .find(id)
            .ok_or_else(|| LayerTreeError::NotFound(id.to_string()))?;

        if let Some(parent_id) = parent {
            if node.contains(parent_id) {
                return Err(LayerTreeError::InvalidMove(format!(
                    "cannot move {id} into its own subtree"
                )));
            }

            match self.find(parent_id) {
                Some(LayerTreeNode::Group { .. }) => {}
                Some(LayerTreeNode::Leaf { .. }) => {
                    return Err(LayerTreeError::InvalidMove(format!(
                        "{parent_id} is not a group"
                    )))
                }
                None => return Err(LayerTreeError::NotFound(parent_id.to_string())),
            }
        }

        let node = take_in(&mut self.roots, id)
            .ok_or_else(|| LayerTreeError::NotFound(id.to_string()))?;

        let siblings = match parent {
            None => &mut self.roots,
            Some(parent_id) => match find_mut_in(&mut self.roots, parent_id) {
                Some(LayerTreeNode::Group { children, .. }) => children,
                _ => return Err(LayerTreeError::NotFound(parent_id.to_string())),
            },
        };

        let index = index.min(siblings.len());
        siblings.insert(index, node);

        self.touch();
        Ok(())
    }

    /// Removes the node with all its descendants and returns it.
    pub fn remove(&mut self, id: &str) -> Result<LayerTreeNode, LayerTreeError> {
        let node =
            take_in(&mut self.roots, id).ok_or_else(|| LayerTreeError::NotFound(id.to_string()))?;
        self.touch();
        Ok(node)
    }

    /// Removes all nodes. Used when the user switches to another project.
    pub fn reset(&mut self) {
        self.roots.clear();
        self.touch();
    }

    /// Depth-first list of all leaves in display order (top-most first).
    pub fn leaves(&self) -> Vec<LeafView> {
        let mut leaves = vec![];
        collect_leaves(&self.roots, true, &mut leaves);
        leaves
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut LayerTreeNode, LayerTreeError> {
        find_mut_in(&mut self.roots, id).ok_or_else(|| LayerTreeError::NotFound(id.to_string()))
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

fn new_node_id() -> String {
    Uuid::new_v4().to_string()
}

fn node_from_qgis(node: &QgisLayerNode) -> LayerTreeNode {
    match node {
        QgisLayerNode::Group(group) => LayerTreeNode::Group {
            id: new_node_id(),
            name: group.name.clone(),
            visible: group.visible,
            children: group.children.iter().map(node_from_qgis).collect(),
        },
        QgisLayerNode::Layer(layer) => LayerTreeNode::Leaf {
            id: new_node_id(),
            name: layer.name.clone(),
            visible: layer.visible,
            kind: layer.kind.into(),
            color: None,
            opacity: Some(layer.unit_opacity()),
            qgis_id: Some(layer.id.clone()),
        },
    }
}

fn find_in<'a>(nodes: &'a [LayerTreeNode], id: &str) -> Option<&'a LayerTreeNode> {
    for node in nodes {
        if node.id() == id {
            return Some(node);
        }

        if let Some(found) = find_in(node.children(), id) {
            return Some(found);
        }
    }

    None
}

fn find_mut_in<'a>(nodes: &'a mut [LayerTreeNode], id: &str) -> Option<&'a mut LayerTreeNode> {
    for node in nodes.iter_mut() {
        if node.id() == id {
            return Some(node);
        }

        if let LayerTreeNode::Group { children, .. } = node {
            if let Some(found) = find_mut_in(children, id) {
                return Some(found);
            }
        }
    }

    None
}

fn take_in(nodes: &mut Vec<LayerTreeNode>, id: &str) -> Option<LayerTreeNode> {
    if let Some(position) = nodes.iter().position(|node| node.id() == id) {
        return Some(nodes.remove(position));
    }

    for node in nodes.iter_mut() {
        if let LayerTreeNode::Group { children, .. } = node {
            if let Some(taken) = take_in(children, id) {
                return Some(taken);
            }
        }
    }

    None
}

fn collect_leaves(nodes: &[LayerTreeNode], parent_visible: bool, leaves: &mut Vec<LeafView>) {
    for node in nodes {
        match node {
            LayerTreeNode::Group {
                visible, children, ..
            } => collect_leaves(children, parent_visible && *visible, leaves),
            LayerTreeNode::Leaf {
                id,
                name,
                visible,
                kind,
                opacity,
                qgis_id,
                ..
            } => leaves.push(LeafView {
                id: id.clone(),
                name: name.clone(),
                visible: parent_visible && *visible,
                opacity: *opacity,
                qgis_id: qgis_id.clone(),
                kind: *kind,
            }),
        }
    }
}
