use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio::runtime::Handle;

use common::catalog::ReleaseCatalog;
use common::github::RemoteError;
use relfs_daemon::fuse::{RelFs, Session, SessionConfig, SessionError};

/// Mount a repository's release assets at a local path until interrupted.
#[derive(Args, Debug, Clone)]
pub struct Mount {
    /// Repository owner (user or organization)
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Directory to mount at (created if missing)
    pub mount_point: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed waiting for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mount {
    type Error = MountError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        // Single metadata fetch; repository attributes are immutable for
        // the life of the mount. Release and asset listings stay lazy.
        let repo = ctx.client.get_repository(&self.owner, &self.repo).await?;
        tracing::info!("mounting releases of {}", repo.full_name);

        let releases = Arc::new(ReleaseCatalog::new(
            ctx.client.clone(),
            self.owner.clone(),
            self.repo.clone(),
        ));
        let fs = RelFs::new(
            Handle::current(),
            Arc::new(repo.clone()),
            releases,
            ctx.client.clone(),
        );

        let session = Session::spawn(
            fs,
            &SessionConfig {
                mount_point: self.mount_point.clone(),
                volume_name: repo.full_name,
            },
        )?;

        tracing::info!(
            "serving at {:?}; press ctrl-c to unmount",
            session.mount_point()
        );
        tokio::signal::ctrl_c().await?;
        session.unmount();

        Ok(format!("unmounted {}", self.mount_point.display()))
    }
}
