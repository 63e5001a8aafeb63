//! HTTP access to QGIS Server and the backend api.

use bytes::Bytes;
use log::{debug, info};

use crate::config::SyncConfig;
use crate::error::SyncError;

/// Thin wrapper around a [`reqwest::Client`] configured with the user agent and request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http_client: reqwest::Client,
}

impl HttpClient {
    /// Creates a client for the given configuration.
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { http_client })
    }

    /// Loads the body of the given url.
    ///
    /// Non-success statuses are returned as [`SyncError::Http`].
    pub async fn load_bytes(&self, url: &str) -> Result<Bytes, SyncError> {
        debug!("Loading {url}");

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            info!(
                "Failed to load {url}: {status}, {:?}",
                response.text().await
            );
            return Err(SyncError::Http {
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?)
    }
}
