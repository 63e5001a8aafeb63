//! Urls of the QGIS Server OWS requests.
//!
//! WMS layers are requested by layer **name** because that is what QGIS Server resolves the
//! `LAYERS` parameter by, while WFS feature types are requested by layer **id**.

use reqwest::Url;

use crate::error::SyncError;

/// Placeholder replaced by the map engine with the tile bounding box in Web Mercator.
pub const BBOX_PLACEHOLDER: &str = "{bbox-epsg-3857}";

/// QGIS Server OWS endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwsEndpoint {
    url: Url,
}

impl OwsEndpoint {
    /// Creates the endpoint for the server at the given url.
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Server side path of the project file, passed as the `MAP` parameter.
    pub fn project_path(project: &str) -> String {
        format!("/projects/{project}/{project}.qgs")
    }

    /// Url template of 256 px (or the given size) WMS `GetMap` tiles of the layer in EPSG:3857.
    ///
    /// The template ends with [`BBOX_PLACEHOLDER`], left unencoded for the map engine to fill.
    pub fn wms_tile_template(&self, layer_name: &str, project: &str, tile_size: u32) -> String {
        let tile_size = tile_size.to_string();
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("SERVICE", "WMS")
            .append_pair("VERSION", "1.3.0")
            .append_pair("REQUEST", "GetMap")
            .append_pair("LAYERS", layer_name)
            .append_pair("STYLES", "")
            .append_pair("WIDTH", &tile_size)
            .append_pair("HEIGHT", &tile_size)
            .append_pair("FORMAT", "image/png")
            .append_pair("TRANSPARENT", "true")
            .append_pair("CRS", "EPSG:3857")
            .append_pair("MAP", &Self::project_path(project));

        format!("{url}&BBOX={BBOX_PLACEHOLDER}")
    }

    /// Url of a WFS 2.0 `GetFeature` request returning all features of the layer as GeoJSON in
    /// EPSG:4326.
    pub fn wfs_get_feature(
        &self,
        type_name: &str,
        project: &str,
        max_features: Option<u32>,
    ) -> String {
        let mut url = self.url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("SERVICE", "WFS")
                .append_pair("VERSION", "2.0.0")
                .append_pair("REQUEST", "GetFeature")
                .append_pair("TYPENAME", type_name)
                .append_pair("OUTPUTFORMAT", "application/json")
                .append_pair("SRSNAME", "EPSG:4326");
            if let Some(count) = max_features {
                query.append_pair("COUNT", &count.to_string());
            }
            query.append_pair("MAP", &Self::project_path(project));
        }

        url.to_string()
    }
}

/// Url of the backend endpoint returning the project tree.
pub fn project_tree_url(api_url: &Url, project: &str) -> Result<String, SyncError> {
    let mut url = api_url.clone();
    url.path_segments_mut()
        .map_err(|_| SyncError::Configuration(format!("{api_url} cannot be a base url")))?
        .pop_if_empty()
        .extend(["api", "projects", "new", "json"]);
    url.query_pairs_mut().append_pair("project", project);

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> OwsEndpoint {
        OwsEndpoint::new(Url::parse("https://maps.test/ows").unwrap())
    }

    #[test]
    fn wms_template() {
        let template = endpoint().wms_tile_template("Parcels", "Plan_1", 256);
        insta::assert_snapshot!(
            template,
            @"https://maps.test/ows?SERVICE=WMS&VERSION=1.3.0&REQUEST=GetMap&LAYERS=Parcels&STYLES=&WIDTH=256&HEIGHT=256&FORMAT=image%2Fpng&TRANSPARENT=true&CRS=EPSG%3A3857&MAP=%2Fprojects%2FPlan_1%2FPlan_1.qgs&BBOX={bbox-epsg-3857}"
        );
    }

    #[test]
    fn wms_template_encodes_names() {
        let template = endpoint().wms_tile_template("Działki & budynki", "Plan_1", 512);
        assert!(template.contains("LAYERS=Dzia%C5%82ki+%26+budynki&"));
        assert!(template.contains("WIDTH=512&HEIGHT=512"));
        assert!(template.ends_with("&BBOX={bbox-epsg-3857}"));
    }

    #[test]
    fn wfs_request() {
        let url = endpoint().wfs_get_feature("parcels_3f2a", "Plan_1", None);
        insta::assert_snapshot!(
            url,
            @"https://maps.test/ows?SERVICE=WFS&VERSION=2.0.0&REQUEST=GetFeature&TYPENAME=parcels_3f2a&OUTPUTFORMAT=application%2Fjson&SRSNAME=EPSG%3A4326&MAP=%2Fprojects%2FPlan_1%2FPlan_1.qgs"
        );

        let url = endpoint().wfs_get_feature("parcels_3f2a", "Plan_1", Some(5000));
        assert!(url.contains("&COUNT=5000&MAP="));
    }

    #[test]
    fn project_tree() {
        let api = Url::parse("https://maps.test/").unwrap();
        assert_eq!(
            project_tree_url(&api, "Plan 1").unwrap(),
            "https://maps.test/api/projects/new/json?project=Plan+1"
        );

        let api = Url::parse("https://maps.test/gis/").unwrap();
        assert_eq!(
            project_tree_url(&api, "p").unwrap(),
            "https://maps.test/gis/api/projects/new/json?project=p"
        );
    }
}
