//! See documentation for [`GeometryType`].

use serde::{Deserialize, Serialize};

/// Geometry type of a vector layer, as named by GeoJSON and by the QGIS project tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum GeometryType {
    /// `Point`
    Point,
    /// `MultiPoint`
    MultiPoint,
    /// `LineString`
    LineString,
    /// `MultiLineString`
    MultiLineString,
    /// `Polygon`
    Polygon,
    /// `MultiPolygon`
    MultiPolygon,
}

/// Family of paint layers a vector source is drawn with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PaintFamily {
    /// A single circle layer.
    Circle,
    /// A single line layer.
    Line,
    /// A fill layer with an outline line layer on top of it.
    FillWithOutline,
}

impl GeometryType {
    /// Parses the GeoJSON name of the geometry type. Returns `None` for unsupported types such
    /// as `GeometryCollection` or QGIS `NoGeometry` tables.
    pub fn from_name(name: &str) -> Option<Self> {
        let geometry_type = match name {
            "Point" => Self::Point,
            "MultiPoint" => Self::MultiPoint,
            "LineString" => Self::LineString,
            "MultiLineString" => Self::MultiLineString,
            "Polygon" => Self::Polygon,
            "MultiPolygon" => Self::MultiPolygon,
            _ => return None,
        };

        Some(geometry_type)
    }

    /// GeoJSON name of the geometry type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
        }
    }

    /// Paint layer family used to draw features of this geometry type.
    pub fn paint_family(&self) -> PaintFamily {
        match self {
            Self::Point | Self::MultiPoint => PaintFamily::Circle,
            Self::LineString | Self::MultiLineString => PaintFamily::Line,
            Self::Polygon | Self::MultiPolygon => PaintFamily::FillWithOutline,
        }
    }

    /// Returns true for `Polygon` and `MultiPolygon`.
    pub fn is_areal(&self) -> bool {
        self.paint_family() == PaintFamily::FillWithOutline
    }
}
