//! FUSE mount session lifecycle.
//!
//! Spawns the filesystem in a background session and unmounts it when the
//! session is dropped or explicitly stopped.

use std::path::{Path, PathBuf};

use fuser::BackgroundSession;

use crate::fuse::RelFs;

/// Configuration for one mount.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory to mount at. Created if it does not exist.
    pub mount_point: PathBuf,
    /// Volume label shown by the host (macOS Finder, mount tables).
    pub volume_name: String,
}

/// Errors that can occur while managing a mount session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("mount point not found: {0}")]
    MountPointNotFound(String),

    #[error("mount point is not a directory: {0}")]
    MountPointNotDirectory(String),

    #[error("failed to spawn FUSE session: {0}")]
    SpawnFailed(String),
}

/// A live FUSE mount. Dropping it unmounts the filesystem.
pub struct Session {
    session: Option<BackgroundSession>,
    mount_point: PathBuf,
}

impl Session {
    /// Validate the mount point and spawn the filesystem in the background.
    pub fn spawn(fs: RelFs, config: &SessionConfig) -> Result<Self, SessionError> {
        if !config.mount_point.exists() {
            std::fs::create_dir_all(&config.mount_point).map_err(|e| {
                SessionError::MountPointNotFound(format!(
                    "{} (failed to create: {})",
                    config.mount_point.display(),
                    e
                ))
            })?;
        }

        if !config.mount_point.is_dir() {
            return Err(SessionError::MountPointNotDirectory(
                config.mount_point.display().to_string(),
            ));
        }

        let options = Self::mount_options(&config.volume_name);

        tracing::info!("mounting FUSE filesystem at {:?}", config.mount_point);
        let session = fuser::spawn_mount2(fs, &config.mount_point, &options).map_err(|e| {
            SessionError::SpawnFailed(format!(
                "failed to mount at {}: {}",
                config.mount_point.display(),
                e
            ))
        })?;

        Ok(Self {
            session: Some(session),
            mount_point: config.mount_point.clone(),
        })
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Unmount by dropping the background session.
    pub fn unmount(mut self) {
        self.session.take();
        tracing::info!("unmounted {:?}", self.mount_point);
    }

    #[cfg(target_os = "linux")]
    fn mount_options(_volume_name: &str) -> Vec<fuser::MountOption> {
        vec![
            fuser::MountOption::FSName("relfs".to_string()),
            fuser::MountOption::RO,
            fuser::MountOption::AutoUnmount,
        ]
    }

    #[cfg(target_os = "macos")]
    fn mount_options(volume_name: &str) -> Vec<fuser::MountOption> {
        vec![
            fuser::MountOption::FSName("relfs".to_string()),
            fuser::MountOption::RO,
            fuser::MountOption::AutoUnmount,
            fuser::MountOption::CUSTOM(format!("volname={}", volume_name)),
            fuser::MountOption::CUSTOM("local".to_string()),
            fuser::MountOption::CUSTOM("noappledouble".to_string()),
        ]
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    fn mount_options(_volume_name: &str) -> Vec<fuser::MountOption> {
        vec![
            fuser::MountOption::FSName("relfs".to_string()),
            fuser::MountOption::RO,
            fuser::MountOption::AutoUnmount,
        ]
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mount_point", &self.mount_point)
            .field("mounted", &self.session.is_some())
            .finish()
    }
}
