//! Per-release asset catalog.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::github::models::Asset;
use crate::github::{GithubClient, RemoteError};

/// The complete result of one asset refresh. Immutable once built.
pub type AssetSnapshot = Arc<Vec<Asset>>;

/// Cached, refreshable asset list for exactly one release.
///
/// `refresh` fully replaces the prior snapshot; a failed refresh leaves it
/// untouched. Concurrent refreshes each perform their own remote fetch and
/// each return their own internally consistent snapshot.
pub struct AssetCatalog {
    client: GithubClient,
    owner: String,
    repo: String,
    release_id: u64,
    current: RwLock<AssetSnapshot>,
}

impl AssetCatalog {
    pub fn new(client: GithubClient, owner: String, repo: String, release_id: u64) -> Self {
        Self {
            client,
            owner,
            repo,
            release_id,
            current: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn release_id(&self) -> u64 {
        self.release_id
    }

    /// Fetch the current asset list from the remote and atomically replace
    /// the prior snapshot, returning the new one.
    pub async fn refresh(&self) -> Result<AssetSnapshot, RemoteError> {
        let assets = self
            .client
            .list_assets(&self.owner, &self.repo, self.release_id)
            .await?;
        tracing::debug!(
            release_id = self.release_id,
            count = assets.len(),
            "refreshed asset catalog"
        );

        let snapshot = Arc::new(assets);
        *self.current.write().await = snapshot.clone();
        Ok(snapshot)
    }

    /// Refresh, then scan for an asset by exact name. Case-sensitive; the
    /// first match wins should the remote ever report duplicate names.
    pub async fn lookup(&self, name: &str) -> Result<Option<Asset>, RemoteError> {
        let snapshot = self.refresh().await?;
        Ok(snapshot.iter().find(|asset| asset.name == name).cloned())
    }

    /// The most recent snapshot, without touching the remote. Empty until
    /// the first refresh.
    pub async fn current(&self) -> AssetSnapshot {
        self.current.read().await.clone()
    }
}

impl std::fmt::Debug for AssetCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCatalog")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("release_id", &self.release_id)
            .finish()
    }
}
