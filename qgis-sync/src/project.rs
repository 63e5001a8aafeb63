//! Loading QGIS project trees from the backend api.

use bytes::Bytes;
use log::debug;
use qgis_sync_types::ProjectTree;
use reqwest::Url;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::http::HttpClient;
use crate::ows::project_tree_url;

/// Loads the layer tree of a project from `<api>/api/projects/new/json`.
#[derive(Debug, Clone)]
pub struct ProjectLoader {
    client: HttpClient,
    api_url: Url,
}

impl ProjectLoader {
    /// Creates a loader using the api url of the configuration.
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        Ok(Self::with_client(
            HttpClient::new(config)?,
            config.api_url().clone(),
        ))
    }

    /// Creates a loader sharing an existing client.
    pub fn with_client(client: HttpClient, api_url: Url) -> Self {
        Self { client, api_url }
    }

    /// Url the tree of the project is loaded from.
    pub fn project_tree_url(&self, project: &str) -> Result<String, SyncError> {
        project_tree_url(&self.api_url, project)
    }

    /// Loads and parses the project tree.
    ///
    /// An unknown project (`404`) is reported as [`SyncError::NotFound`].
    pub async fn load(&self, project: &str) -> Result<ProjectTree, SyncError> {
        let url = self.project_tree_url(project)?;
        let bytes = self
            .client
            .load_bytes(&url)
            .await
            .map_err(|err| not_found_for(err, project))?;

        let tree = parse_project_tree(&bytes)?;
        debug!(
            "Loaded project {project}: {} top level nodes",
            tree.children.len()
        );

        Ok(tree)
    }
}

/// Parses the backend response into a project tree.
pub fn parse_project_tree(bytes: &Bytes) -> Result<ProjectTree, SyncError> {
    Ok(serde_json::from_slice(bytes)?)
}

fn not_found_for(err: SyncError, project: &str) -> SyncError {
    match err {
        SyncError::Http { status: 404 } => {
            debug!("Project {project} does not exist");
            SyncError::NotFound
        }
        other => other,
    }
}
