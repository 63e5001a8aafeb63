//! QGIS project tree as returned by `GET /api/projects/new/json?project=<name>`.
//!
//! The backend sends a nested list of nodes tagged by their `type` field:
//!
//! ```json
//! {
//!   "extent": [2050000.0, 6450000.0, 2070000.0, 6470000.0],
//!   "children": [
//!     { "type": "group", "name": "Plans", "visible": true, "children": [
//!       { "type": "VectorLayer", "id": "parcels_3f2a", "name": "Parcels", "visible": true,
//!         "opacity": 255, "geometry": "MultiPolygon" }
//!     ]},
//!     { "type": "RasterLayer", "id": "ortho_11aa", "name": "Orthophoto", "visible": false,
//!       "opacity": 128 }
//!   ]
//! }
//! ```
//!
//! Fields the synchronization does not need (`consultations`, `labeling`, `inspire` etc.) are
//! ignored on deserialization.

use serde::{Deserialize, Deserializer, Serialize};

use crate::geometry_type::GeometryType;

/// Converts QGIS opacity (`0..=255`) into the unit range (`0.0..=1.0`) used by style engines.
pub fn qgis_opacity_to_unit(opacity: u8) -> f64 {
    opacity as f64 / 255.0
}

/// Root of a QGIS project tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectTree {
    /// Project extent in EPSG:3857: `[min_x, min_y, max_x, max_y]`.
    #[serde(default)]
    pub extent: Option<[f64; 4]>,
    /// Top level nodes of the tree.
    #[serde(default)]
    pub children: Vec<QgisLayerNode>,
}

/// Node of a QGIS project tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNode", into = "RawNode")]
pub enum QgisLayerNode {
    /// Folder containing other nodes.
    Group(QgisGroup),
    /// Vector or raster data layer.
    Layer(QgisLayer),
}

/// Group (folder) node of a QGIS project tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QgisGroup {
    /// Groups are not addressable on QGIS Server, so the backend usually does not send an id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name of the group.
    pub name: String,
    /// Project default visibility of the group.
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<QgisLayerNode>,
}

/// Kind of QGIS data layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// `VectorLayer`
    Vector,
    /// `RasterLayer`
    Raster,
}

/// Data layer node of a QGIS project tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QgisLayer {
    /// Kind of the layer. Comes from the `type` tag of the node.
    #[serde(skip, default = "default_kind")]
    pub kind: LayerKind,
    /// QGIS assigned layer id (UUID based).
    pub id: String,
    /// Layer name. This is what QGIS Server resolves WMS `LAYERS` by.
    pub name: String,
    /// Project default visibility.
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Opacity in QGIS units: `0..=255`.
    #[serde(
        default = "default_opacity",
        deserialize_with = "deserialize_opacity"
    )]
    pub opacity: u8,
    /// Geometry type of a vector layer, if the backend reports a supported one.
    #[serde(
        default,
        deserialize_with = "deserialize_geometry",
        skip_serializing_if = "Option::is_none"
    )]
    pub geometry: Option<GeometryType>,
    /// Layer extent. Can be empty for raster layers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extent: Vec<f64>,
}

impl QgisLayer {
    /// Creates a layer description with default visibility and full opacity.
    pub fn new(kind: LayerKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            visible: true,
            opacity: 255,
            geometry: None,
            extent: vec![],
        }
    }

    /// Sets the project default visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Sets the QGIS opacity.
    pub fn with_opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }

    /// Sets the geometry type hint.
    pub fn with_geometry(mut self, geometry: GeometryType) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Opacity converted to `0.0..=1.0`.
    pub fn unit_opacity(&self) -> f64 {
        qgis_opacity_to_unit(self.opacity)
    }
}

impl QgisLayerNode {
    /// Name of the node.
    pub fn name(&self) -> &str {
        match self {
            Self::Group(group) => &group.name,
            Self::Layer(layer) => &layer.name,
        }
    }

    /// QGIS id of the node, if it has one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Group(group) => group.id.as_deref(),
            Self::Layer(layer) => Some(&layer.id),
        }
    }

    /// Children of a group. Empty for data layers.
    pub fn children(&self) -> &[QgisLayerNode] {
        match self {
            Self::Group(group) => &group.children,
            Self::Layer(_) => &[],
        }
    }
}

impl From<QgisLayer> for QgisLayerNode {
    fn from(value: QgisLayer) -> Self {
        Self::Layer(value)
    }
}

impl From<QgisGroup> for QgisLayerNode {
    fn from(value: QgisGroup) -> Self {
        Self::Group(value)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum RawNode {
    #[serde(rename = "group")]
    Group(QgisGroup),
    #[serde(rename = "VectorLayer")]
    Vector(QgisLayer),
    #[serde(rename = "RasterLayer")]
    Raster(QgisLayer),
}

impl From<RawNode> for QgisLayerNode {
    fn from(value: RawNode) -> Self {
        match value {
            RawNode::Group(group) => Self::Group(group),
            RawNode::Vector(layer) => Self::Layer(QgisLayer {
                kind: LayerKind::Vector,
                ..layer
            }),
            RawNode::Raster(layer) => Self::Layer(QgisLayer {
                kind: LayerKind::Raster,
                ..layer
            }),
        }
    }
}

impl From<QgisLayerNode> for RawNode {
    fn from(value: QgisLayerNode) -> Self {
        match value {
            QgisLayerNode::Group(group) => Self::Group(group),
            QgisLayerNode::Layer(layer) => match layer.kind {
                LayerKind::Vector => Self::Vector(layer),
                LayerKind::Raster => Self::Raster(layer),
            },
        }
    }
}

fn default_visible() -> bool {
    true
}

fn default_opacity() -> u8 {
    255
}

fn default_kind() -> LayerKind {
    LayerKind::Vector
}

fn deserialize_opacity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(match value {
        Some(value) if value.is_finite() => value.round().clamp(0.0, 255.0) as u8,
        _ => default_opacity(),
    })
}

fn deserialize_geometry<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<GeometryType>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(GeometryType::from_name))
}
