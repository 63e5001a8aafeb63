//! Configuration of the synchronization.

use std::time::Duration;

use reqwest::Url;

use crate::error::SyncError;
use crate::render::StrategyPolicy;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_STYLE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_VERIFICATION_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_REBUILD_RETRIES: u32 = 3;
const DEFAULT_LIFECYCLE_DEBOUNCE: Duration = Duration::from_millis(300);
const DEFAULT_MAX_TREE_DEPTH: usize = 64;
const DEFAULT_TILE_SIZE: u32 = 256;
const DEFAULT_USER_AGENT: &str = concat!("qgis-sync/", env!("CARGO_PKG_VERSION"));

/// Validated configuration. Created with [`SyncConfigBuilder`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    server_url: Url,
    api_url: Url,
    request_timeout: Duration,
    style_load_timeout: Duration,
    verification_delay: Duration,
    max_rebuild_retries: u32,
    lifecycle_debounce: Duration,
    max_features: Option<u32>,
    strategy_policy: StrategyPolicy,
    max_tree_depth: usize,
    tile_size: u32,
    min_zoom: u8,
    max_zoom: u8,
    user_agent: String,
}

impl SyncConfig {
    /// Shortcut for [`SyncConfigBuilder::new`].
    pub fn builder(server_url: impl Into<String>) -> SyncConfigBuilder {
        SyncConfigBuilder::new(server_url)
    }

    /// QGIS Server OWS endpoint.
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// Base url of the backend REST api serving project trees.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Timeout of a single HTTP request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// How long a synchronization waits for the map style to load.
    pub fn style_load_timeout(&self) -> Duration {
        self.style_load_timeout
    }

    /// Delay before checking that the materialized layers survived a style rebuild.
    pub fn verification_delay(&self) -> Duration {
        self.verification_delay
    }

    /// How many times lost layers are re-added before giving up.
    pub fn max_rebuild_retries(&self) -> u32 {
        self.max_rebuild_retries
    }

    /// Time the lifecycle guard waits for style events to settle.
    pub fn lifecycle_debounce(&self) -> Duration {
        self.lifecycle_debounce
    }

    /// Cap on the number of features requested per WFS layer.
    pub fn max_features(&self) -> Option<u32> {
        self.max_features
    }

    /// Rule choosing between WMS and WFS.
    pub fn strategy_policy(&self) -> StrategyPolicy {
        self.strategy_policy
    }

    /// Maximum nesting of the project tree.
    pub fn max_tree_depth(&self) -> usize {
        self.max_tree_depth
    }

    /// Size of WMS tiles in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Zoom range of WMS sources.
    pub fn zoom_range(&self) -> (u8, u8) {
        (self.min_zoom, self.max_zoom)
    }

    /// `User-Agent` header of the requests.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

/// Constructor for a [`SyncConfig`].
///
/// ```
/// use std::time::Duration;
/// use qgis_sync::config::SyncConfigBuilder;
///
/// let config = SyncConfigBuilder::new("https://maps.example.com/ows")
///     .with_request_timeout(Duration::from_secs(10))
///     .with_max_features(5000)
///     .build()?;
/// assert_eq!(config.api_url().as_str(), "https://maps.example.com/");
/// # Ok::<(), qgis_sync::SyncError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfigBuilder {
    server_url: String,
    api_url: Option<String>,
    request_timeout: Duration,
    style_load_timeout: Duration,
    verification_delay: Duration,
    max_rebuild_retries: u32,
    lifecycle_debounce: Duration,
    max_features: Option<u32>,
    strategy_policy: StrategyPolicy,
    max_tree_depth: usize,
    tile_size: u32,
    zoom_range: (u8, u8),
    user_agent: Option<String>,
}

impl SyncConfigBuilder {
    /// Initializes a builder for the QGIS Server at the given OWS url.
    ///
    /// Unless set with [`SyncConfigBuilder::with_api_url`], the backend api is expected at the
    /// same host with the trailing `/ows` segment removed.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            api_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            style_load_timeout: DEFAULT_STYLE_LOAD_TIMEOUT,
            verification_delay: DEFAULT_VERIFICATION_DELAY,
            max_rebuild_retries: DEFAULT_MAX_REBUILD_RETRIES,
            lifecycle_debounce: DEFAULT_LIFECYCLE_DEBOUNCE,
            max_features: None,
            strategy_policy: StrategyPolicy::default(),
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            tile_size: DEFAULT_TILE_SIZE,
            zoom_range: (0, 22),
            user_agent: None,
        }
    }

    /// Sets the base url of the backend api.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Sets the timeout of a single HTTP request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how long a synchronization waits for the map style to load.
    pub fn with_style_load_timeout(mut self, timeout: Duration) -> Self {
        self.style_load_timeout = timeout;
        self
    }

    /// Sets the delay before the first survival check after materialization.
    pub fn with_verification_delay(mut self, delay: Duration) -> Self {
        self.verification_delay = delay;
        self
    }

    /// Sets how many times layers lost to a style rebuild are re-added.
    pub fn with_max_rebuild_retries(mut self, retries: u32) -> Self {
        self.max_rebuild_retries = retries;
        self
    }

    /// Sets the debounce interval of the lifecycle guard.
    pub fn with_lifecycle_debounce(mut self, debounce: Duration) -> Self {
        self.lifecycle_debounce = debounce;
        self
    }

    /// Limits the number of features requested per WFS layer.
    pub fn with_max_features(mut self, max_features: u32) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Sets the rule choosing between WMS and WFS.
    pub fn with_strategy_policy(mut self, policy: StrategyPolicy) -> Self {
        self.strategy_policy = policy;
        self
    }

    /// Sets the maximum nesting of the project tree.
    pub fn with_max_tree_depth(mut self, depth: usize) -> Self {
        self.max_tree_depth = depth;
        self
    }

    /// Sets the size of WMS tiles.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Sets the zoom range of WMS sources.
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.zoom_range = (min_zoom, max_zoom);
        self
    }

    /// Sets the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Validates the parameters and creates the configuration.
    pub fn build(self) -> Result<SyncConfig, SyncError> {
        let Self {
            server_url,
            api_url,
            request_timeout,
            style_load_timeout,
            verification_delay,
            max_rebuild_retries,
            lifecycle_debounce,
            max_features,
            strategy_policy,
            max_tree_depth,
            tile_size,
            zoom_range: (min_zoom, max_zoom),
            user_agent,
        } = self;

        let server_url = parse_url(&server_url)?;
        let api_url = match api_url {
            Some(url) => parse_url(&url)?,
            None => default_api_url(&server_url),
        };

        if tile_size == 0 {
            return Err(SyncError::Configuration(
                "tile size must be positive".into(),
            ));
        }
        if min_zoom > max_zoom {
            return Err(SyncError::Configuration(format!(
                "invalid zoom range {min_zoom}..{max_zoom}"
            )));
        }
        if max_tree_depth == 0 {
            return Err(SyncError::Configuration(
                "maximum tree depth must be at least 1".into(),
            ));
        }
        if max_features == Some(0) {
            return Err(SyncError::Configuration(
                "feature limit must be positive".into(),
            ));
        }

        Ok(SyncConfig {
            server_url,
            api_url,
            request_timeout,
            style_load_timeout,
            verification_delay,
            max_rebuild_retries,
            lifecycle_debounce,
            max_features,
            strategy_policy,
            max_tree_depth,
            tile_size,
            min_zoom,
            max_zoom,
            user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

fn parse_url(url: &str) -> Result<Url, SyncError> {
    let parsed =
        Url::parse(url).map_err(|err| SyncError::Configuration(format!("{url}: {err}")))?;
    if parsed.cannot_be_a_base() {
        return Err(SyncError::Configuration(format!(
            "{url} is not a http url"
        )));
    }

    Ok(parsed)
}

fn default_api_url(server_url: &Url) -> Url {
    let mut api_url = server_url.clone();
    api_url.set_query(None);
    let path = api_url.path().trim_end_matches('/');
    let path = path.strip_suffix("/ows").unwrap_or(path).to_string();
    api_url.set_path(&format!("{path}/"));

    api_url
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::builder("http://qgis.test/ows").build().unwrap();
        insta::assert_compact_debug_snapshot!(
            (
                config.request_timeout(),
                config.style_load_timeout(),
                config.verification_delay(),
                config.max_rebuild_retries(),
                config.lifecycle_debounce(),
                config.max_tree_depth(),
                config.tile_size(),
                config.zoom_range(),
            ),
            @"(30s, 30s, 500ms, 3, 300ms, 64, 256, (0, 22))"
        );
        assert_eq!(config.strategy_policy(), StrategyPolicy::ByLayerKind);
        assert_eq!(config.max_features(), None);
        assert!(config.user_agent().starts_with("qgis-sync/"));
    }

    #[test]
    fn api_url_defaults_to_server_root() {
        let config = SyncConfig::builder("https://maps.test/ows").build().unwrap();
        assert_eq!(config.api_url().as_str(), "https://maps.test/");

        let config = SyncConfig::builder("https://maps.test/gis/ows/?x=1")
            .build()
            .unwrap();
        assert_eq!(config.api_url().as_str(), "https://maps.test/gis/");

        let config = SyncConfig::builder("https://maps.test/ows")
            .with_api_url("https://api.test/v1/")
            .build()
            .unwrap();
        assert_eq!(config.api_url().as_str(), "https://api.test/v1/");
    }

    #[test]
    fn invalid_config() {
        assert_matches!(
            SyncConfig::builder("not a url").build(),
            Err(SyncError::Configuration(_))
        );
        assert_matches!(
            SyncConfig::builder("mailto:gis@maps.test").build(),
            Err(SyncError::Configuration(_))
        );
        assert_matches!(
            SyncConfig::builder("http://qgis.test/ows")
                .with_tile_size(0)
                .build(),
            Err(SyncError::Configuration(_))
        );
        assert_matches!(
            SyncConfig::builder("http://qgis.test/ows")
                .with_zoom_range(10, 2)
                .build(),
            Err(SyncError::Configuration(_))
        );
        assert_matches!(
            SyncConfig::builder("http://qgis.test/ows")
                .with_max_tree_depth(0)
                .build(),
            Err(SyncError::Configuration(_))
        );
    }
}
