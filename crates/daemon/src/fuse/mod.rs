//! FUSE filesystem driver for relfs
//!
//! Exposes a repository's releases as a three-level read-only hierarchy:
//! root → one directory per release tag → one file per asset.

pub mod node;
pub mod rel_fs;
pub mod session;

pub use node::{Node, NodeTable};
pub use rel_fs::RelFs;
pub use session::{Session, SessionConfig, SessionError};
