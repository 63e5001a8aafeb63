use log::trace;
use qgis_sync_types::{LayerKind, QgisLayer};

/// How a layer is drawn on the map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenderStrategy {
    /// Raster tiles rendered by QGIS Server with the project styles.
    Wms,
    /// Vector features drawn by the map engine.
    Wfs,
}

/// Rule choosing the [`RenderStrategy`] of a layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum StrategyPolicy {
    /// Raster layers as WMS, vector layers as WFS.
    #[default]
    ByLayerKind,
    /// Keep server side styling where it usually matters: raster layers, polygon layers and
    /// layers whose names suggest categorized symbology are served as WMS, the rest as WFS.
    PreserveQgisStyles,
    /// Every layer as WMS.
    AlwaysWms,
}

/// Lowercase name fragments of layers that are usually styled by category in QGIS (zoning plans,
/// parcels, land use, buildings).
const STYLED_NAME_KEYWORDS: [&str; 10] = [
    "mpzp",
    "plan",
    "obszar",
    "rewitalizacj",
    "działk",
    "przeznaczenie",
    "kategori",
    "klasyfikacj",
    "budynek",
    "building",
];

impl StrategyPolicy {
    /// Chooses the strategy for the layer.
    pub fn select(&self, layer: &QgisLayer) -> RenderStrategy {
        if layer.kind == LayerKind::Raster {
            return RenderStrategy::Wms;
        }

        match self {
            Self::ByLayerKind => RenderStrategy::Wfs,
            Self::AlwaysWms => RenderStrategy::Wms,
            Self::PreserveQgisStyles => {
                if layer.geometry.is_some_and(|geometry| geometry.is_areal()) {
                    trace!("{}: polygon layer is served as WMS", layer.name);
                    return RenderStrategy::Wms;
                }

                let name = layer.name.to_lowercase();
                if let Some(keyword) = STYLED_NAME_KEYWORDS
                    .iter()
                    .find(|keyword| name.contains(*keyword))
                {
                    trace!("{}: name matches {keyword:?}, served as WMS", layer.name);
                    return RenderStrategy::Wms;
                }

                RenderStrategy::Wfs
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use qgis_sync_types::GeometryType;

    use super::*;

    fn vector(name: &str, geometry: Option<GeometryType>) -> QgisLayer {
        let layer = QgisLayer::new(LayerKind::Vector, "id", name);
        match geometry {
            Some(geometry) => layer.with_geometry(geometry),
            None => layer,
        }
    }

    #[test]
    fn by_layer_kind() {
        let policy = StrategyPolicy::ByLayerKind;
        assert_eq!(
            policy.select(&QgisLayer::new(LayerKind::Raster, "o", "Ortho")),
            RenderStrategy::Wms
        );
        assert_eq!(
            policy.select(&vector("MPZP", Some(GeometryType::Polygon))),
            RenderStrategy::Wfs
        );
    }

    #[test]
    fn preserve_qgis_styles() {
        let policy = StrategyPolicy::PreserveQgisStyles;
        assert_eq!(
            policy.select(&vector("Zones", Some(GeometryType::MultiPolygon))),
            RenderStrategy::Wms
        );
        assert_eq!(
            policy.select(&vector("Działki ewidencyjne", None)),
            RenderStrategy::Wms
        );
        assert_eq!(
            policy.select(&vector("Buildings", Some(GeometryType::Point))),
            RenderStrategy::Wms
        );
        assert_eq!(
            policy.select(&vector("Bus stops", Some(GeometryType::Point))),
            RenderStrategy::Wfs
        );
        assert_eq!(policy.select(&vector("Roads", None)), RenderStrategy::Wfs);
    }

    #[test]
    fn always_wms() {
        assert_eq!(
            StrategyPolicy::AlwaysWms.select(&vector("Roads", Some(GeometryType::LineString))),
            RenderStrategy::Wms
        );
    }
}
