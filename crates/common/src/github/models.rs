//! Wire models for the subset of the GitHub REST API we consume.
//!
//! Unknown fields in API payloads are ignored; only what the filesystem
//! surfaces is deserialized.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Repository metadata, fetched once at mount time.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A published release, keyed by its tag.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    /// Tag creation time. Not what we surface to users.
    pub created_at: DateTime<Utc>,
    /// Null for draft releases that were never published.
    pub published_at: Option<DateTime<Utc>>,
}

impl Release {
    /// The canonical timestamp for this release. GitHub tracks both the tag
    /// creation time and the publish time; only the publish time is
    /// meaningful to a consumer of the artifacts, so that is what directory
    /// attributes report. Unpublished drafts fall back to the epoch.
    pub fn published(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// A single binary artifact attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub id: u64,
    pub name: String,
    pub size: u64,
    /// API download locator. Requesting it with `Accept:
    /// application/octet-stream` yields the raw bytes rather than the
    /// asset's metadata document.
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
