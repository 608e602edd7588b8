//! Repository-wide release catalog.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::catalog::AssetCatalog;
use crate::github::models::Release;
use crate::github::{GithubClient, RemoteError};

/// The complete result of one release refresh: tag → release handle.
/// Immutable once built.
pub type ReleaseSnapshot = Arc<HashMap<String, Arc<ReleaseHandle>>>;

/// One release together with its owned asset catalog (1:1).
///
/// A handle pins the release metadata captured by the refresh that built
/// it; nodes resolved against it keep answering from that metadata until
/// they are looked up afresh.
pub struct ReleaseHandle {
    pub release: Release,
    pub assets: AssetCatalog,
}

impl std::fmt::Debug for ReleaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseHandle")
            .field("tag", &self.release.tag_name)
            .field("id", &self.release.id)
            .finish()
    }
}

/// Cached, refreshable mapping from release tag to release handle.
///
/// Populated lazily: nothing is fetched until the first enumeration or
/// lookup. Every refresh builds an entirely new snapshot and atomically
/// replaces the old one; no partial mapping is ever published.
pub struct ReleaseCatalog {
    client: GithubClient,
    owner: String,
    repo: String,
    current: RwLock<ReleaseSnapshot>,
}

impl ReleaseCatalog {
    pub fn new(client: GithubClient, owner: String, repo: String) -> Self {
        Self {
            client,
            owner,
            repo,
            current: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Fetch the complete release list (all pages) and atomically replace
    /// the prior snapshot, returning the new one. Duplicate tags resolve
    /// last-seen-wins.
    pub async fn refresh(&self) -> Result<ReleaseSnapshot, RemoteError> {
        let releases = self.client.list_releases(&self.owner, &self.repo).await?;
        tracing::debug!(count = releases.len(), "refreshed release catalog");

        let mut map = HashMap::with_capacity(releases.len());
        for release in releases {
            let assets = AssetCatalog::new(
                self.client.clone(),
                self.owner.clone(),
                self.repo.clone(),
                release.id,
            );
            map.insert(
                release.tag_name.clone(),
                Arc::new(ReleaseHandle { release, assets }),
            );
        }

        let snapshot = Arc::new(map);
        *self.current.write().await = snapshot.clone();
        Ok(snapshot)
    }

    /// Refresh, then resolve a tag by exact match.
    pub async fn lookup(&self, tag: &str) -> Result<Option<Arc<ReleaseHandle>>, RemoteError> {
        let snapshot = self.refresh().await?;
        Ok(snapshot.get(tag).cloned())
    }

    /// The most recent snapshot, without touching the remote. Empty until
    /// the first refresh.
    pub async fn current(&self) -> ReleaseSnapshot {
        self.current.read().await.clone()
    }
}

impl std::fmt::Debug for ReleaseCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseCatalog")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish()
    }
}
