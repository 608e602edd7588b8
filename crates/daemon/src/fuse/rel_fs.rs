//! FUSE filesystem implementation for relfs
//!
//! Implements the fuser::Filesystem trait over the release catalogs. Every
//! enumeration and lookup refreshes the backing catalog (always-fresh
//! semantics, no memoization), and every read re-fetches the full asset
//! body from the remote.
//!
//! A directory enumeration refreshes its catalog exactly once, when the
//! kernel opens the directory. The listing captured then is served for
//! every continuation readdir call on that handle, so a single listing
//! never mixes entries from two snapshots.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use tokio::runtime::Handle;
use tokio::sync::RwLock;

use common::catalog::ReleaseCatalog;
use common::github::models::Repository;
use common::github::GithubClient;

use crate::fuse::node::{Node, NodeTable};

/// Directory permissions: read/execute for all, write bits advertised but
/// every write path fails with EROFS.
const DIR_PERM: u16 = 0o775;

/// File permissions: write bit advertised, writes rejected at the protocol
/// boundary.
const FILE_PERM: u16 = 0o664;

/// One directory entry: inode, kind, name.
type DirEntry = (u64, FileType, String);

/// FUSE filesystem for one repository's releases
pub struct RelFs {
    /// Tokio runtime handle for async operations
    rt: Handle,
    /// Repository metadata, fetched once at mount time
    repo: Arc<Repository>,
    /// Repository-wide release catalog
    releases: Arc<ReleaseCatalog>,
    /// Client used for asset content fetches
    fetcher: GithubClient,
    /// Inode table
    nodes: RwLock<NodeTable>,
    /// Listings captured at opendir: directory handle → complete listing
    dir_listings: RwLock<HashMap<u64, Arc<Vec<DirEntry>>>>,
    /// Next file handle
    next_fh: AtomicU64,
}

impl RelFs {
    /// Default TTL for FUSE attributes
    const ATTR_TTL: Duration = Duration::from_secs(1);

    /// Block size for FUSE
    const BLOCK_SIZE: u32 = 512;

    pub fn new(
        rt: Handle,
        repo: Arc<Repository>,
        releases: Arc<ReleaseCatalog>,
        fetcher: GithubClient,
    ) -> Self {
        Self {
            rt,
            repo,
            releases,
            fetcher,
            nodes: RwLock::new(NodeTable::new()),
            dir_listings: RwLock::new(HashMap::new()),
            next_fh: AtomicU64::new(1),
        }
    }

    /// Generate the next file handle
    fn next_handle(&self) -> u64 {
        self.next_fh.fetch_add(1, Ordering::SeqCst)
    }

    /// Check if a filename should be filtered (macOS resource forks, etc.)
    fn should_filter(name: &str) -> bool {
        name.starts_with("._") || name == ".DS_Store" || name == ".Spotlight-V100"
    }

    fn node(&self, ino: u64) -> Option<Node> {
        self.rt.block_on(self.nodes.read()).get(ino)
    }

    fn attr(&self, node: &Node) -> FileAttr {
        node_attr(node, &self.repo)
    }

    /// Build the complete listing for one directory from a single catalog
    /// refresh. Children are registered in the node table and tags are
    /// sorted so the listing order is deterministic.
    async fn dir_entries(&self, ino: u64, node: &Node) -> Result<Vec<DirEntry>, libc::c_int> {
        let mut entries: Vec<DirEntry> = vec![
            (ino, FileType::Directory, ".".to_string()),
            (NodeTable::ROOT_INODE, FileType::Directory, "..".to_string()),
        ];

        match node {
            Node::Root => {
                let snapshot = self.releases.refresh().await.map_err(|e| {
                    tracing::error!("release enumeration failed: {}", e);
                    libc::EIO
                })?;

                let mut tags: Vec<_> = snapshot.keys().collect();
                tags.sort();
                let mut nodes = self.nodes.write().await;
                for tag in tags {
                    let handle = snapshot[tag].clone();
                    let entry_ino = nodes.insert_release(handle);
                    entries.push((entry_ino, FileType::Directory, tag.clone()));
                }
            }
            Node::ReleaseDir(handle) => {
                let snapshot = handle.assets.refresh().await.map_err(|e| {
                    tracing::error!(
                        tag = %handle.release.tag_name,
                        "asset enumeration failed: {}",
                        e
                    );
                    libc::EIO
                })?;

                let mut nodes = self.nodes.write().await;
                for asset in snapshot.iter() {
                    let asset = Arc::new(asset.clone());
                    let name = asset.name.clone();
                    let entry_ino = nodes.insert_asset(asset);
                    entries.push((entry_ino, FileType::RegularFile, name));
                }
            }
            Node::AssetFile(_) => return Err(libc::ENOTDIR),
        }

        Ok(entries)
    }
}

fn timestamp(dt: DateTime<Utc>) -> SystemTime {
    SystemTime::from(dt)
}

/// Build FUSE attributes for a resolved node.
///
/// Timestamp mapping:
/// - root: change/modify/access = repository update time, birth = creation
/// - release dir: change/modify/access = publish time (never the tag's own
///   creation time), birth = creation time
/// - asset file: change/modify/access = asset update time (the remote does
///   not track access time, so update time stands in), birth = creation
pub(crate) fn node_attr(node: &Node, repo: &Repository) -> FileAttr {
    let (kind, perm, size, cma, crtime) = match node {
        Node::Root => (
            FileType::Directory,
            DIR_PERM,
            0,
            timestamp(repo.updated_at),
            timestamp(repo.created_at),
        ),
        Node::ReleaseDir(handle) => (
            FileType::Directory,
            DIR_PERM,
            0,
            timestamp(handle.release.published()),
            timestamp(handle.release.created_at),
        ),
        Node::AssetFile(asset) => (
            FileType::RegularFile,
            FILE_PERM,
            asset.size,
            timestamp(asset.updated_at),
            timestamp(asset.created_at),
        ),
    };

    FileAttr {
        ino: node.ino(),
        size,
        blocks: size.div_ceil(RelFs::BLOCK_SIZE as u64),
        atime: cma,
        mtime: cma,
        ctime: cma,
        crtime,
        kind,
        perm,
        nlink: 1,
        uid: unsafe { libc::getuid() },
        gid: unsafe { libc::getgid() },
        rdev: 0,
        blksize: RelFs::BLOCK_SIZE,
        flags: 0,
    }
}

impl Filesystem for RelFs {
    fn init(
        &mut self,
        _req: &Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        tracing::info!("FUSE filesystem initialized for {}", self.repo.full_name);
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("FUSE filesystem destroyed for {}", self.repo.full_name);
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = match name.to_str() {
            Some(n) => n,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        // Filter macOS special files without a remote round trip
        if Self::should_filter(name) {
            reply.error(libc::ENOENT);
            return;
        }

        let parent_node = match self.node(parent) {
            Some(node) => node,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        match parent_node {
            Node::Root => match self.rt.block_on(self.releases.lookup(name)) {
                Ok(Some(handle)) => {
                    let node = Node::ReleaseDir(handle);
                    let attr = self.attr(&node);
                    self.rt
                        .block_on(async { self.nodes.write().await.insert(node) });
                    reply.entry(&Self::ATTR_TTL, &attr, 0);
                }
                Ok(None) => reply.error(libc::ENOENT),
                Err(e) => {
                    tracing::error!(tag = name, "release lookup failed: {}", e);
                    reply.error(libc::EIO);
                }
            },
            Node::ReleaseDir(handle) => match self.rt.block_on(handle.assets.lookup(name)) {
                Ok(Some(asset)) => {
                    let node = Node::AssetFile(Arc::new(asset));
                    let attr = self.attr(&node);
                    self.rt
                        .block_on(async { self.nodes.write().await.insert(node) });
                    reply.entry(&Self::ATTR_TTL, &attr, 0);
                }
                Ok(None) => reply.error(libc::ENOENT),
                Err(e) => {
                    tracing::error!(
                        tag = %handle.release.tag_name,
                        asset = name,
                        "asset lookup failed: {}",
                        e
                    );
                    reply.error(libc::EIO);
                }
            },
            Node::AssetFile(_) => reply.error(libc::ENOTDIR),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.node(ino) {
            Some(node) => reply.attr(&Self::ATTR_TTL, &self.attr(&node)),
            None => reply.error(libc::ENOENT),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let node = match self.node(ino) {
            Some(node) => node,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        // Any metadata mutation is a write attempt on a read-only filesystem
        if mode.is_some()
            || uid.is_some()
            || gid.is_some()
            || size.is_some()
            || atime.is_some()
            || mtime.is_some()
        {
            reply.error(libc::EROFS);
            return;
        }

        reply.attr(&Self::ATTR_TTL, &self.attr(&node));
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let node = match self.node(ino) {
            Some(node) => node,
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        // One refresh per enumeration; continuations read the captured
        // listing instead of re-fetching into a different snapshot.
        match self.rt.block_on(self.dir_entries(ino, &node)) {
            Ok(entries) => {
                let fh = self.next_handle();
                self.rt.block_on(async {
                    self.dir_listings.write().await.insert(fh, Arc::new(entries))
                });
                reply.opened(fh, 0);
            }
            Err(errno) => reply.error(errno),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let listing = self
            .rt
            .block_on(self.dir_listings.read())
            .get(&fh)
            .cloned();

        let listing = match listing {
            Some(listing) => listing,
            None => {
                reply.error(libc::EBADF);
                return;
            }
        };

        for (i, (entry_ino, kind, name)) in listing.iter().enumerate().skip(offset as usize) {
            if reply.add(*entry_ino, (i + 1) as i64, *kind, name) {
                break;
            }
        }

        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        self.rt
            .block_on(async { self.dir_listings.write().await.remove(&fh) });
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        if self.node(ino).is_none() {
            reply.error(libc::ENOENT);
            return;
        }

        let write_flags = libc::O_WRONLY | libc::O_RDWR | libc::O_APPEND | libc::O_TRUNC;
        if (flags & write_flags) != 0 {
            reply.error(libc::EROFS);
            return;
        }

        let fh = self.next_handle();
        reply.opened(fh, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let asset = match self.node(ino) {
            Some(Node::AssetFile(asset)) => asset,
            Some(_) => {
                reply.error(libc::EISDIR);
                return;
            }
            None => {
                reply.error(libc::ENOENT);
                return;
            }
        };

        // Whole-body fetch on every read call; the kernel's page-sized
        // requests are served as slices of the buffered content.
        match self.rt.block_on(self.fetcher.download_asset(&asset)) {
            Ok(content) => {
                tracing::debug!(asset = %asset.name, len = content.len(), "read asset");
                let start = offset as usize;
                let end = (offset as usize + size as usize).min(content.len());
                if start < content.len() {
                    reply.data(&content[start..end]);
                } else {
                    reply.data(&[]);
                }
            }
            Err(e) => {
                tracing::error!(asset = %asset.name, "content fetch failed: {}", e);
                reply.error(libc::EIO);
            }
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        reply.error(libc::EROFS);
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        reply.error(libc::EROFS);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        reply.error(libc::EROFS);
    }

    fn unlink(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rmdir(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::EROFS);
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        _parent: u64,
        _name: &OsStr,
        _newparent: u64,
        _newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(libc::EROFS);
    }

    // Extended attribute stubs - macOS queries these but handles ENOTSUP gracefully
    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _name: &OsStr,
        _value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        reply.error(libc::ENOTSUP);
    }

    fn getxattr(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _name: &OsStr,
        _size: u32,
        reply: ReplyXattr,
    ) {
        reply.error(libc::ENOTSUP);
    }

    fn listxattr(&mut self, _req: &Request<'_>, _ino: u64, _size: u32, reply: ReplyXattr) {
        reply.error(libc::ENOTSUP);
    }

    fn removexattr(&mut self, _req: &Request<'_>, _ino: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(libc::ENOTSUP);
    }
}
