/**
 * Snapshot catalogs over the remote release list.
 *  A refresh fully replaces the previous snapshot,
 *  so callers never observe a half-updated listing.
 */
pub mod catalog;
/**
 * GitHub REST API boundary.
 *  Wire models, the authenticated client, release and
 *  asset listing (paginated), and asset content fetching.
 */
pub mod github;

pub mod prelude {
    pub use crate::catalog::{AssetCatalog, ReleaseCatalog, ReleaseHandle, ReleaseSnapshot};
    pub use crate::github::models::{Asset, Release, Repository};
    pub use crate::github::{GithubClient, RemoteError};
}
