//! Inode to node mapping for the FUSE filesystem.
//!
//! The kernel addresses everything by inode (u64). We use the remote's own
//! numeric identities as inodes: release id for a release directory, asset
//! id for an asset file, with inode 1 reserved for the root. A remote id
//! that collides with the reserved root inode is remapped into the top
//! half of the inode space so it can never shadow the root.

use std::collections::HashMap;
use std::sync::Arc;

use common::catalog::ReleaseHandle;
use common::github::models::Asset;

/// A resolved node in the directory tree.
///
/// Closed set of kinds. A node pins the exact release or asset object
/// returned by the lookup that created it; later snapshots do not change
/// what an already-resolved node reports until it is looked up afresh.
#[derive(Debug, Clone)]
pub enum Node {
    Root,
    ReleaseDir(Arc<ReleaseHandle>),
    AssetFile(Arc<Asset>),
}

impl Node {
    /// The inode this node lives at.
    pub fn ino(&self) -> u64 {
        match self {
            Node::Root => NodeTable::ROOT_INODE,
            Node::ReleaseDir(handle) => Self::remap(handle.release.id),
            Node::AssetFile(asset) => Self::remap(asset.id),
        }
    }

    /// Remote ids double as inodes; an id equal to the reserved root inode
    /// is moved out of the way instead of replacing the root.
    fn remap(id: u64) -> u64 {
        if id == NodeTable::ROOT_INODE {
            (1 << 63) | id
        } else {
            id
        }
    }
}

/// Mapping from inode to resolved node.
pub struct NodeTable {
    nodes: HashMap<u64, Node>,
}

impl NodeTable {
    /// Root directory is always inode 1 (FUSE_ROOT_ID).
    pub const ROOT_INODE: u64 = 1;

    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(Self::ROOT_INODE, Node::Root);
        Self { nodes }
    }

    pub fn get(&self, ino: u64) -> Option<Node> {
        self.nodes.get(&ino).cloned()
    }

    /// Register a freshly resolved node, replacing whatever its inode
    /// pinned before. Returns the inode.
    pub fn insert(&mut self, node: Node) -> u64 {
        let ino = node.ino();
        self.nodes.insert(ino, node);
        ino
    }

    /// Register a freshly resolved release directory. Returns the inode
    /// (= release id, unless it collides with the root inode).
    pub fn insert_release(&mut self, handle: Arc<ReleaseHandle>) -> u64 {
        self.insert(Node::ReleaseDir(handle))
    }

    /// Register a freshly resolved asset file. Returns the inode (= asset
    /// id, unless it collides with the root inode).
    pub fn insert_asset(&mut self, asset: Arc<Asset>) -> u64 {
        self.insert(Node::AssetFile(asset))
    }
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::catalog::AssetCatalog;
    use common::github::models::Release;
    use common::github::GithubClient;

    fn handle(id: u64, tag: &str) -> Arc<ReleaseHandle> {
        let release: Release = serde_json::from_value(serde_json::json!({
            "id": id,
            "tag_name": tag,
            "created_at": "2024-01-01T00:00:00Z",
            "published_at": "2024-01-02T00:00:00Z",
        }))
        .unwrap();
        let assets = AssetCatalog::new(GithubClient::new(None), "o".into(), "r".into(), id);
        Arc::new(ReleaseHandle { release, assets })
    }

    #[test]
    fn root_is_preregistered_at_inode_one() {
        let table = NodeTable::new();
        assert!(matches!(table.get(NodeTable::ROOT_INODE), Some(Node::Root)));
        assert!(table.get(2).is_none());
    }

    #[test]
    fn release_inode_is_its_remote_id() {
        let mut table = NodeTable::new();
        let ino = table.insert_release(handle(4242, "v1.0.0"));
        assert_eq!(ino, 4242);

        match table.get(4242) {
            Some(Node::ReleaseDir(h)) => assert_eq!(h.release.tag_name, "v1.0.0"),
            other => panic!("expected release dir, got {:?}", other),
        }
    }

    #[test]
    fn reinsert_replaces_pinned_object() {
        let mut table = NodeTable::new();
        table.insert_release(handle(10, "v1.0.0"));
        table.insert_release(handle(10, "v1.0.0-renamed"));

        match table.get(10) {
            Some(Node::ReleaseDir(h)) => assert_eq!(h.release.tag_name, "v1.0.0-renamed"),
            other => panic!("expected release dir, got {:?}", other),
        }
    }

    #[test]
    fn remote_id_one_never_shadows_the_root() {
        let mut table = NodeTable::new();
        let ino = table.insert_release(handle(1, "v-unlucky"));

        assert_ne!(ino, NodeTable::ROOT_INODE);
        assert!(matches!(table.get(NodeTable::ROOT_INODE), Some(Node::Root)));
        match table.get(ino) {
            Some(Node::ReleaseDir(h)) => assert_eq!(h.release.id, 1),
            other => panic!("expected release dir, got {:?}", other),
        }
    }
}
