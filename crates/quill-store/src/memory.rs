use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use quill_types::{ContentAddress, SEPARATOR};

use crate::error::{StoreError, StoreResult};
use crate::node::{BlobRef, BlobUpload, DagLink, DagNode};
use crate::traits::BlobStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Nodes are held behind a `RwLock` and
/// keyed by their content address, so writes are naturally idempotent and
/// identical batches always assign identical addresses.
pub struct InMemoryBlobStore {
    nodes: RwLock<HashMap<String, DagNode>>,
}

impl InMemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Number of nodes currently stored.
    pub fn len(&self) -> usize {
        self.nodes.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.read().expect("lock poisoned").is_empty()
    }

    /// Remove all nodes from the store.
    pub fn clear(&self) {
        self.nodes.write().expect("lock poisoned").clear();
    }

    /// Returns `true` if a bare address is present.
    pub fn contains(&self, address: &ContentAddress) -> bool {
        self.nodes
            .read()
            .expect("lock poisoned")
            .contains_key(address.as_str())
    }

    /// Write a bare leaf outside any wrapping directory.
    ///
    /// Early feed generations stored records this way; tests use it to
    /// fabricate V1/V2-era fixtures.
    pub fn put_raw(&self, data: Vec<u8>) -> ContentAddress {
        self.put_node(DagNode::leaf(data))
    }

    fn put_node(&self, node: DagNode) -> ContentAddress {
        let address = node.compute_address();
        let mut map = self.nodes.write().expect("lock poisoned");
        map.entry(address.as_str().to_string()).or_insert(node);
        address
    }

    /// Resolve an address, walking any path segments through named edges.
    fn lookup(&self, address: &ContentAddress) -> StoreResult<DagNode> {
        let map = self.nodes.read().expect("lock poisoned");
        let mut segments = address.as_str().split(SEPARATOR);
        let root = segments.next().unwrap_or_default();
        let mut node = map
            .get(root)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(address.clone()))?;
        for segment in segments {
            let link = node
                .link(segment)
                .ok_or_else(|| StoreError::NotFound(address.clone()))?;
            node = map
                .get(link.address.as_str())
                .cloned()
                .ok_or_else(|| StoreError::NotFound(address.clone()))?;
        }
        Ok(node)
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn add(&self, entries: Vec<BlobUpload>) -> StoreResult<Vec<BlobRef>> {
        // Later entries at the same path win.
        let mut leaves: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for entry in entries {
            validate_path(&entry.path)?;
            leaves.insert(entry.path, entry.content);
        }

        // Every ancestor of a leaf becomes a directory; the batch is always
        // wrapped with a root at "".
        let mut dirs: BTreeSet<String> = BTreeSet::new();
        dirs.insert(String::new());
        for path in leaves.keys() {
            let mut cursor = path.as_str();
            while let Some((parent, _)) = cursor.rsplit_once(SEPARATOR) {
                dirs.insert(parent.to_string());
                cursor = parent;
            }
        }

        let mut assigned: HashMap<String, ContentAddress> = HashMap::new();
        for (path, content) in &leaves {
            let address = self.put_node(DagNode::leaf(content.clone()));
            assigned.insert(path.clone(), address);
        }

        // Directories deepest-first so children are addressed before parents.
        let mut ordered: Vec<String> = dirs.iter().cloned().collect();
        ordered.sort_by_key(|dir| std::cmp::Reverse(path_depth(dir)));
        for dir in ordered {
            let mut links = Vec::new();
            for path in leaves.keys().chain(dirs.iter()) {
                if path.is_empty() || *path == dir {
                    continue;
                }
                let (parent, name) = split_parent(path);
                if parent == dir {
                    links.push(DagLink::new(name, assigned[path.as_str()].clone()));
                }
            }
            let address = self.put_node(DagNode::directory(links));
            assigned.insert(dir, address);
        }

        let mut refs: Vec<BlobRef> = assigned
            .into_iter()
            .map(|(path, address)| BlobRef { path, address })
            .collect();
        refs.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(paths = refs.len(), root = %refs[0].address.short(), "added batch");
        Ok(refs)
    }

    async fn get(&self, address: &ContentAddress) -> StoreResult<Vec<u8>> {
        let node = self.lookup(address)?;
        if !node.data.is_empty() || node.links.is_empty() {
            return Ok(node.data);
        }
        // Directory read: yield the first child's content.
        let first = address.join(&node.links[0].name);
        let child = self.lookup(&first)?;
        Ok(child.data)
    }

    async fn list_children(&self, address: &ContentAddress) -> StoreResult<Vec<DagLink>> {
        Ok(self.lookup(address)?.links)
    }

    async fn patch_link(
        &self,
        node: &ContentAddress,
        name: &str,
        target: &ContentAddress,
    ) -> StoreResult<ContentAddress> {
        if name.is_empty() || name.contains(SEPARATOR) {
            return Err(StoreError::InvalidPath {
                path: name.to_string(),
                reason: "edge name must be a single non-empty path segment".to_string(),
            });
        }
        let mut patched = {
            let map = self.nodes.read().expect("lock poisoned");
            map.get(node.as_str())
                .cloned()
                .ok_or_else(|| StoreError::NotFound(node.clone()))?
        };
        patched.set_link(name, target.clone());
        Ok(self.put_node(patched))
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("node_count", &self.len())
            .finish()
    }
}

fn validate_path(path: &str) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if path.is_empty() {
        return Err(invalid("path must not be empty"));
    }
    if path.starts_with(SEPARATOR) || path.ends_with(SEPARATOR) {
        return Err(invalid("path must not start or end with the separator"));
    }
    if path.split(SEPARATOR).any(|segment| segment.is_empty()) {
        return Err(invalid("path segments must not be empty"));
    }
    Ok(())
}

fn split_parent(path: &str) -> (&str, &str) {
    path.rsplit_once(SEPARATOR).unwrap_or(("", path))
}

fn path_depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split(SEPARATOR).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(path: &str, content: &[u8]) -> BlobUpload {
        BlobUpload::new(path, content.to_vec())
    }

    fn ref_for<'a>(refs: &'a [BlobRef], path: &str) -> &'a BlobRef {
        refs.iter().find(|r| r.path == path).expect("missing ref")
    }

    // -----------------------------------------------------------------------
    // Batch writes
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn empty_batch_yields_root_only() {
        let store = InMemoryBlobStore::new();
        let refs = store.add(vec![]).await.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "");
        assert!(store.list_children(&refs[0].address).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn flat_batch_wraps_with_root() {
        let store = InMemoryBlobStore::new();
        let refs = store
            .add(vec![upload("a.txt", b"aaa"), upload("b.txt", b"bbb")])
            .await
            .unwrap();
        assert_eq!(refs.len(), 3);

        let root = ref_for(&refs, "");
        let children = store.list_children(&root.address).await.unwrap();
        let names: Vec<&str> = children.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn nested_batch_creates_directories() {
        let store = InMemoryBlobStore::new();
        let refs = store
            .add(vec![
                upload("top.txt", b"top"),
                upload("assets/logo.png", b"png"),
            ])
            .await
            .unwrap();
        // "", "assets", "assets/logo.png", "top.txt"
        assert_eq!(refs.len(), 4);

        let assets = ref_for(&refs, "assets");
        let children = store.list_children(&assets.address).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "logo.png");
        assert_eq!(children[0].address, ref_for(&refs, "assets/logo.png").address);
    }

    #[tokio::test]
    async fn identical_batches_assign_identical_addresses() {
        let store = InMemoryBlobStore::new();
        let first = store
            .add(vec![upload("x", b"1"), upload("d/y", b"2")])
            .await
            .unwrap();
        let second = store
            .add(vec![upload("d/y", b"2"), upload("x", b"1")])
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn later_duplicate_path_wins() {
        let store = InMemoryBlobStore::new();
        let refs = store
            .add(vec![upload("a", b"old"), upload("a", b"new")])
            .await
            .unwrap();
        let a = ref_for(&refs, "a");
        assert_eq!(store.get(&a.address).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn invalid_paths_are_rejected() {
        let store = InMemoryBlobStore::new();
        for path in ["", "/lead", "trail/", "a//b"] {
            let err = store.add(vec![upload(path, b"x")]).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidPath { .. }), "path {path:?}");
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_by_leaf_address() {
        let store = InMemoryBlobStore::new();
        let refs = store.add(vec![upload("f", b"payload")]).await.unwrap();
        let leaf = ref_for(&refs, "f");
        assert_eq!(store.get(&leaf.address).await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn get_by_pathed_address() {
        let store = InMemoryBlobStore::new();
        let refs = store
            .add(vec![upload("assets/logo.png", b"png")])
            .await
            .unwrap();
        let root = ref_for(&refs, "");
        let pathed = root.address.join("assets/logo.png");
        assert_eq!(store.get(&pathed).await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn get_at_directory_yields_first_child() {
        let store = InMemoryBlobStore::new();
        let refs = store
            .add(vec![upload("a.txt", b"first"), upload("b.txt", b"second")])
            .await
            .unwrap();
        let root = ref_for(&refs, "");
        assert_eq!(store.get(&root.address).await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn get_missing_address_fails() {
        let store = InMemoryBlobStore::new();
        let err = store.get(&ContentAddress::from("feedbeef")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_missing_path_segment_fails() {
        let store = InMemoryBlobStore::new();
        let refs = store.add(vec![upload("a", b"x")]).await.unwrap();
        let root = ref_for(&refs, "");
        let err = store.get(&root.address.join("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    // -----------------------------------------------------------------------
    // Patching
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn patch_link_attaches_edge() {
        let store = InMemoryBlobStore::new();
        let refs = store.add(vec![upload("a", b"x")]).await.unwrap();
        let root = ref_for(&refs, "");
        let target = store.put_raw(b"linked".to_vec());

        let patched = store.patch_link(&root.address, "b", &target).await.unwrap();
        assert_ne!(patched, root.address);
        assert_eq!(store.get(&patched.join("b")).await.unwrap(), b"linked");
        // Old root remains readable.
        assert_eq!(store.list_children(&root.address).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn patch_link_replaces_same_name() {
        let store = InMemoryBlobStore::new();
        let refs = store.add(vec![upload("a", b"old")]).await.unwrap();
        let root = ref_for(&refs, "");
        let target = store.put_raw(b"new".to_vec());

        let patched = store.patch_link(&root.address, "a", &target).await.unwrap();
        let children = store.list_children(&patched).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(store.get(&patched.join("a")).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn patch_link_rejects_segmented_name() {
        let store = InMemoryBlobStore::new();
        let refs = store.add(vec![]).await.unwrap();
        let target = store.put_raw(b"x".to_vec());
        let err = store
            .patch_link(&refs[0].address, "a/b", &target)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
    }

    #[tokio::test]
    async fn patch_rebuilt_directory_matches_built_directory() {
        // Attaching the same links one by one must reproduce the address the
        // batch write assigned. Container patching depends on this.
        let store = InMemoryBlobStore::new();
        let refs = store
            .add(vec![upload("d/a", b"1"), upload("d/b", b"2")])
            .await
            .unwrap();
        let built = ref_for(&refs, "d").address.clone();

        let empty = store.put_raw(Vec::new());
        let one = store
            .patch_link(&empty, "b", &ref_for(&refs, "d/b").address)
            .await
            .unwrap();
        let rebuilt = store
            .patch_link(&one, "a", &ref_for(&refs, "d/a").address)
            .await
            .unwrap();
        assert_eq!(rebuilt, built);
    }

    // -----------------------------------------------------------------------
    // Utilities
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn len_clear_contains() {
        let store = InMemoryBlobStore::new();
        assert!(store.is_empty());
        let address = store.put_raw(b"x".to_vec());
        assert!(!store.is_empty());
        assert!(store.contains(&address));
        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn put_raw_is_idempotent() {
        let store = InMemoryBlobStore::new();
        let a = store.put_raw(b"same".to_vec());
        let b = store.put_raw(b"same".to_vec());
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }
}
