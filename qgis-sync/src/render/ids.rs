use crate::engine::LayerFamily;

/// Prefix of every generated WMS layer id.
pub const WMS_LAYER_PREFIX: &str = "qgis-wms-layer-";
/// Prefix of every generated WFS layer id.
pub const WFS_LAYER_PREFIX: &str = "qgis-wfs-layer-";
/// Prefix of every generated WMS source id.
pub const WMS_SOURCE_PREFIX: &str = "qgis-wms-";
/// Prefix of every generated WFS source id.
pub const WFS_SOURCE_PREFIX: &str = "qgis-wfs-";

/// Returns true if the engine layer was created by the synchronization.
pub fn is_generated_layer(id: &str) -> bool {
    id.starts_with(WMS_LAYER_PREFIX) || id.starts_with(WFS_LAYER_PREFIX)
}

/// Returns true if the engine source was created by the synchronization.
pub fn is_generated_source(id: &str) -> bool {
    id.starts_with(WMS_SOURCE_PREFIX) || id.starts_with(WFS_SOURCE_PREFIX)
}

/// Paint layer drawing a WFS source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VectorRole {
    /// Polygon fill.
    Fill,
    /// Polygon outline, drawn above the fill.
    Outline,
    /// Line.
    Line,
    /// Point symbol.
    Circle,
}

impl VectorRole {
    /// All roles in drawing order.
    pub const ALL: [VectorRole; 4] = [Self::Fill, Self::Outline, Self::Line, Self::Circle];

    fn suffix(&self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Outline => "outline",
            Self::Line => "line",
            Self::Circle => "circle",
        }
    }

    /// Type of the engine layer.
    pub fn family(&self) -> LayerFamily {
        match self {
            Self::Fill => LayerFamily::Fill,
            Self::Outline | Self::Line => LayerFamily::Line,
            Self::Circle => LayerFamily::Circle,
        }
    }
}

/// Deterministic engine ids of one QGIS layer of a project.
///
/// Ids are derived from the QGIS layer id rather than its name, so that renaming a layer in QGIS
/// does not orphan the engine objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerIds {
    key: String,
}

impl LayerIds {
    /// Ids of the layer `qgis_id` of the project.
    ///
    /// The project name is the part of the key before the first `-`. Dashes (and `%`) in the
    /// name are percent encoded, so `("a-b", "c")` and `("a", "b-c")` never share ids.
    pub fn new(project: &str, qgis_id: &str) -> Self {
        let project = project.replace('%', "%25").replace('-', "%2D");
        Self {
            key: format!("{project}-{qgis_id}"),
        }
    }

    /// `qgis-wms-<project>-<id>`
    pub fn wms_source(&self) -> String {
        format!("{WMS_SOURCE_PREFIX}{}", self.key)
    }

    /// `qgis-wms-layer-<project>-<id>`
    pub fn wms_layer(&self) -> String {
        format!("{WMS_LAYER_PREFIX}{}", self.key)
    }

    /// `qgis-wfs-<project>-<id>`
    pub fn wfs_source(&self) -> String {
        format!("{WFS_SOURCE_PREFIX}{}", self.key)
    }

    /// `qgis-wfs-layer-<project>-<id>-<role>`
    pub fn wfs_layer(&self, role: VectorRole) -> String {
        format!("{WFS_LAYER_PREFIX}{}-{}", self.key, role.suffix())
    }

    /// Every layer id either strategy can produce for this QGIS layer, bottom-most first.
    pub fn candidates(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(1 + VectorRole::ALL.len());
        ids.push(self.wms_layer());
        ids.extend(VectorRole::ALL.iter().map(|role| self.wfs_layer(*role)));
        ids
    }
}
