use std::collections::BTreeMap;

use geojson::FeatureCollection;
use qgis_sync_types::Color;

/// Data source of a map engine style.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// Raster tiles requested by url template.
    RasterTiles {
        /// Url templates of the tiles.
        tiles: Vec<String>,
        /// Tile size in pixels.
        tile_size: u32,
        /// Minimum zoom level the tiles are requested for.
        min_zoom: u8,
        /// Maximum zoom level the tiles are requested for.
        max_zoom: u8,
    },
    /// In-memory GeoJSON features.
    GeoJson {
        /// The features.
        data: FeatureCollection,
    },
}

/// Type of a paint layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerFamily {
    /// `raster`
    Raster,
    /// `fill`
    Fill,
    /// `line`
    Line,
    /// `circle`
    Circle,
}

/// Share of the layer opacity given to polygon fills, so that the outline stays readable.
pub const FILL_OPACITY_FACTOR: f64 = 0.5;

impl LayerFamily {
    /// Paint property controlling opacity of this layer type.
    pub fn opacity_property(&self) -> PaintProperty {
        match self {
            Self::Raster => PaintProperty::RasterOpacity,
            Self::Fill => PaintProperty::FillOpacity,
            Self::Line => PaintProperty::LineOpacity,
            Self::Circle => PaintProperty::CircleOpacity,
        }
    }

    /// Paint property and value to apply the given layer opacity (`0.0..=1.0`) to a layer of
    /// this type.
    pub fn paint_opacity(&self, opacity: f64) -> (PaintProperty, f64) {
        let value = match self {
            Self::Fill => opacity * FILL_OPACITY_FACTOR,
            _ => opacity,
        };

        (self.opacity_property(), value.clamp(0.0, 1.0))
    }
}

/// Layout `visibility` property of a layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// `visible`
    #[default]
    Visible,
    /// `none`
    None,
}

impl Visibility {
    /// Style value of the property.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::None => "none",
        }
    }
}

impl From<bool> for Visibility {
    fn from(visible: bool) -> Self {
        if visible {
            Self::Visible
        } else {
            Self::None
        }
    }
}

/// Paint properties used by the generated layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaintProperty {
    /// `raster-opacity`
    RasterOpacity,
    /// `fill-color`
    FillColor,
    /// `fill-opacity`
    FillOpacity,
    /// `line-color`
    LineColor,
    /// `line-width`
    LineWidth,
    /// `line-opacity`
    LineOpacity,
    /// `circle-color`
    CircleColor,
    /// `circle-radius`
    CircleRadius,
    /// `circle-opacity`
    CircleOpacity,
    /// `circle-stroke-color`
    CircleStrokeColor,
    /// `circle-stroke-width`
    CircleStrokeWidth,
}

impl PaintProperty {
    /// Style name of the property.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RasterOpacity => "raster-opacity",
            Self::FillColor => "fill-color",
            Self::FillOpacity => "fill-opacity",
            Self::LineColor => "line-color",
            Self::LineWidth => "line-width",
            Self::LineOpacity => "line-opacity",
            Self::CircleColor => "circle-color",
            Self::CircleRadius => "circle-radius",
            Self::CircleOpacity => "circle-opacity",
            Self::CircleStrokeColor => "circle-stroke-color",
            Self::CircleStrokeWidth => "circle-stroke-width",
        }
    }
}

/// Value of a paint property.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PaintValue {
    /// Numeric value.
    Number(f64),
    /// Color value.
    Color(Color),
}

impl From<f64> for PaintValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Color> for PaintValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

/// Paint layer of a map engine style.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    /// Unique id of the layer.
    pub id: String,
    /// Id of the source the layer draws.
    pub source: String,
    /// Type of the layer.
    pub family: LayerFamily,
    /// Layout visibility.
    pub visibility: Visibility,
    /// Paint properties.
    pub paint: BTreeMap<PaintProperty, PaintValue>,
    /// Minimum zoom the layer is drawn at.
    pub min_zoom: u8,
    /// Maximum zoom the layer is drawn at.
    pub max_zoom: u8,
}

impl LayerSpec {
    /// Creates a visible layer without paint properties, drawn at all zoom levels.
    pub fn new(id: impl Into<String>, source: impl Into<String>, family: LayerFamily) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            family,
            visibility: Visibility::Visible,
            paint: BTreeMap::new(),
            min_zoom: 0,
            max_zoom: 22,
        }
    }

    /// Sets a paint property.
    pub fn with_paint(mut self, property: PaintProperty, value: impl Into<PaintValue>) -> Self {
        self.paint.insert(property, value.into());
        self
    }

    /// Sets the layout visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the zoom range.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Numeric value of the paint property, if set.
    pub fn number(&self, property: PaintProperty) -> Option<f64> {
        match self.paint.get(&property) {
            Some(PaintValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    /// Current opacity paint value of the layer.
    pub fn opacity(&self) -> Option<f64> {
        self.number(self.family.opacity_property())
    }
}
