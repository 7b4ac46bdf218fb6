use serde::{Deserialize, Serialize};

use quill_types::ContentAddress;

use crate::hasher::ContentHasher;

/// A named edge from one DAG node to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagLink {
    /// Edge name (a single path segment).
    pub name: String,
    /// Address of the target node.
    pub address: ContentAddress,
}

impl DagLink {
    /// Create a new link.
    pub fn new(name: impl Into<String>, address: ContentAddress) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

/// A node in the content-addressed DAG: raw bytes plus named edges.
///
/// Leaves carry data and no links; directory nodes carry links and no data.
/// The two are not distinct kinds — a leaf can acquire links through
/// patching, which is how link-only directories are initialized. Links are
/// kept sorted by name so that the same logical node always serializes to
/// the same bytes, and therefore the same address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagNode {
    /// Raw content bytes.
    pub data: Vec<u8>,
    /// Named edges, sorted by name.
    pub links: Vec<DagLink>,
}

impl DagNode {
    /// Create a leaf node holding raw bytes.
    pub fn leaf(data: Vec<u8>) -> Self {
        Self {
            data,
            links: Vec::new(),
        }
    }

    /// Create a directory node from a set of links.
    ///
    /// Links are sorted by name for deterministic addressing.
    pub fn directory(mut links: Vec<DagLink>) -> Self {
        links.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            data: Vec::new(),
            links,
        }
    }

    /// Attach or replace a named edge, keeping links sorted.
    pub fn set_link(&mut self, name: &str, address: ContentAddress) {
        self.links.retain(|link| link.name != name);
        let index = self
            .links
            .partition_point(|link| link.name.as_str() < name);
        self.links.insert(index, DagLink::new(name, address));
    }

    /// Look up an edge by name.
    pub fn link(&self, name: &str) -> Option<&DagLink> {
        self.links.iter().find(|link| link.name == name)
    }

    /// Compute this node's content address.
    pub fn compute_address(&self) -> ContentAddress {
        // Canonical encoding: JSON with fixed field order (data, links).
        let bytes = serde_json::to_vec(self).expect("DagNode serialization cannot fail");
        ContentHasher::NODE.hash(&bytes)
    }
}

/// One entry in a batch write: leaf bytes destined for a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobUpload {
    /// Slash-separated path inside the wrapping directory.
    pub path: String,
    /// Leaf content.
    pub content: Vec<u8>,
}

impl BlobUpload {
    /// Create a new upload entry.
    pub fn new(path: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }
}

/// The address assigned to one path by a batch write.
///
/// The wrapping root is reported with `path == ""`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobRef {
    /// Path inside the wrapping directory; empty for the root.
    pub path: String,
    /// Assigned content address.
    pub address: ContentAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_sorts_links() {
        let node = DagNode::directory(vec![
            DagLink::new("zebra", ContentAddress::from("aaaaaa")),
            DagLink::new("alpha", ContentAddress::from("bbbbbb")),
        ]);
        assert_eq!(node.links[0].name, "alpha");
        assert_eq!(node.links[1].name, "zebra");
    }

    #[test]
    fn set_link_inserts_sorted() {
        let mut node = DagNode::directory(vec![
            DagLink::new("a", ContentAddress::from("aaaaaa")),
            DagLink::new("c", ContentAddress::from("cccccc")),
        ]);
        node.set_link("b", ContentAddress::from("dddddd"));
        let names: Vec<&str> = node.links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn set_link_replaces_existing() {
        let mut node = DagNode::directory(vec![DagLink::new("a", ContentAddress::from("aaaaaa"))]);
        node.set_link("a", ContentAddress::from("ffffff"));
        assert_eq!(node.links.len(), 1);
        assert_eq!(node.link("a").unwrap().address.as_str(), "ffffff");
    }

    #[test]
    fn address_ignores_link_insertion_order() {
        let built = DagNode::directory(vec![
            DagLink::new("b", ContentAddress::from("bbbbbb")),
            DagLink::new("a", ContentAddress::from("aaaaaa")),
        ]);
        let mut patched = DagNode::leaf(Vec::new());
        patched.set_link("a", ContentAddress::from("aaaaaa"));
        patched.set_link("b", ContentAddress::from("bbbbbb"));
        assert_eq!(built.compute_address(), patched.compute_address());
    }

    #[test]
    fn different_content_produces_different_addresses() {
        let a = DagNode::leaf(b"one".to_vec());
        let b = DagNode::leaf(b"two".to_vec());
        assert_ne!(a.compute_address(), b.compute_address());
    }
}
