use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use quill_store::{BlobStore, BlobUpload, DagLink};
use quill_types::{ContentAddress, SEPARATOR};

use crate::error::{ContainerError, ContainerResult};
use crate::writable::{ContainerWritable, WritableLink};

/// Traversal bound for loading a container tree.
///
/// Entries deeper than this never load; patching below the bound fails with
/// [`ContainerError::AncestorNotFound`].
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// One reachable entry of a loaded container tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerEntry {
    /// Path relative to the container root; empty for the root itself.
    pub path: String,
    /// The entry's content address.
    pub address: ContentAddress,
    /// The entry's raw edge list as reported by the store.
    pub links: Vec<DagLink>,
}

/// A content-addressed tree of named entries.
///
/// `items` holds every entry reachable within the depth bound, root first;
/// the container's `address` is always the root entry's address, and
/// re-deriving the tree from its items reproduces the same value the store
/// assigned.
#[derive(Clone, Debug)]
pub struct Container {
    address: ContentAddress,
    items: Vec<ContainerEntry>,
}

impl Container {
    /// The container's root address.
    pub fn address(&self) -> &ContentAddress {
        &self.address
    }

    /// Every reachable entry, root first.
    pub fn items(&self) -> &[ContainerEntry] {
        &self.items
    }

    /// Look up an entry by path.
    pub fn entry(&self, path: &str) -> Option<&ContainerEntry> {
        self.items.iter().find(|entry| entry.path == path)
    }

    /// Address of a path inside this container.
    ///
    /// Pure string join; the path is not checked against the tree.
    pub fn resolve(&self, path: &str) -> ContentAddress {
        self.address.join(path)
    }

    /// Build a container from a set of writables.
    ///
    /// Content writables are stored in one batch (plus placeholder entries so
    /// link-only directories exist); link writables are then attached by
    /// walking each target directory's ancestry innermost-first, recomputing
    /// exactly the addresses on the path from the attachment point to the
    /// root. An empty set produces a valid empty container.
    pub async fn create(
        store: &dyn BlobStore,
        writables: Vec<ContainerWritable>,
    ) -> ContainerResult<Container> {
        // Later writables at the same path win.
        let mut by_path: BTreeMap<String, ContainerWritable> = BTreeMap::new();
        for writable in writables {
            validate_path(writable.path())?;
            by_path.insert(writable.path().to_string(), writable);
        }

        let mut contents = Vec::new();
        let mut links: Vec<WritableLink> = Vec::new();
        for writable in by_path.into_values() {
            match writable {
                ContainerWritable::Content(content) => contents.push(content),
                ContainerWritable::Link(link) => links.push(link),
            }
        }

        // Directories the content batch will create on its own.
        let mut content_dirs: BTreeSet<String> = BTreeSet::new();
        for content in &contents {
            collect_ancestors(&content.path, &mut content_dirs);
        }
        // Link parents with no content coverage need a placeholder entry so
        // there is a node to attach edges to. Only the deepest of a chain is
        // written; the batch creates its ancestors.
        let mut link_dirs: BTreeSet<String> = BTreeSet::new();
        for link in &links {
            collect_ancestors(&link.path, &mut link_dirs);
        }
        let placeholders: Vec<String> = link_dirs
            .iter()
            .filter(|dir| !content_dirs.contains(*dir))
            .filter(|dir| {
                let prefix = format!("{dir}{SEPARATOR}");
                !link_dirs.iter().any(|other| other.starts_with(&prefix))
            })
            .cloned()
            .collect();

        let mut uploads: Vec<BlobUpload> = contents
            .into_iter()
            .map(|content| BlobUpload::new(content.path, content.content))
            .collect();
        uploads.extend(
            placeholders
                .into_iter()
                .map(|path| BlobUpload::new(path, Vec::new())),
        );

        let refs = store.add(uploads).await?;
        let root = refs
            .iter()
            .find(|reference| reference.path.is_empty())
            .ok_or(ContainerError::MissingRoot)?
            .address
            .clone();

        let mut container = Container::load(store, &root).await?;
        if links.is_empty() {
            return Ok(container);
        }

        // Group links by their parent directory and attach group by group;
        // each group rewrites one path up to the root.
        let mut groups: BTreeMap<String, Vec<WritableLink>> = BTreeMap::new();
        for link in links {
            let (parent, _) = split_parent(&link.path);
            groups.entry(parent.to_string()).or_default().push(link);
        }
        for (dir, group) in groups {
            container.attach_group(store, &dir, group).await?;
        }

        let root = container.address.clone();
        debug!(root = %root.short(), "created container");
        Container::load(store, &root).await
    }

    /// Attach a group of links under one directory, rewriting the ancestry
    /// bottom-up.
    async fn attach_group(
        &mut self,
        store: &dyn BlobStore,
        dir: &str,
        group: Vec<WritableLink>,
    ) -> ContainerResult<()> {
        let ancestry = self.ancestry(dir)?;
        let mut pending: Vec<(String, ContentAddress)> = group
            .into_iter()
            .map(|link| (link.path, link.address))
            .collect();

        for index in ancestry {
            let ancestor_path = self.items[index].path.clone();
            let mut address = self.items[index].address.clone();
            for (path, target) in &pending {
                let (_, name) = split_parent(path);
                address = store.patch_link(&address, name, target).await?;
            }
            self.items[index].address = address.clone();
            if ancestor_path.is_empty() {
                self.address = address.clone();
            }
            // The rewritten ancestor becomes the single link to attach one
            // level up.
            pending = vec![(ancestor_path, address)];
        }
        Ok(())
    }

    /// Ordered entry indices from the target directory up to the root.
    fn ancestry(&self, dir: &str) -> ContainerResult<Vec<usize>> {
        let mut paths = vec![String::new()];
        let mut accumulated = String::new();
        if !dir.is_empty() {
            for segment in dir.split(SEPARATOR) {
                if !accumulated.is_empty() {
                    accumulated.push(SEPARATOR);
                }
                accumulated.push_str(segment);
                paths.push(accumulated.clone());
            }
        }
        paths.reverse();

        paths
            .into_iter()
            .map(|path| {
                self.items
                    .iter()
                    .position(|entry| entry.path == path)
                    .ok_or(ContainerError::AncestorNotFound { path })
            })
            .collect()
    }

    /// Load the tree at an address with the default depth bound.
    pub async fn load(store: &dyn BlobStore, address: &ContentAddress) -> ContainerResult<Container> {
        Self::load_with_depth(store, address, DEFAULT_MAX_DEPTH).await
    }

    /// Load the tree at an address, listing every entry reachable within
    /// `max_depth` levels.
    ///
    /// Iterative breadth-first walk; the explicit bound keeps traversal of
    /// malformed external data finite.
    pub async fn load_with_depth(
        store: &dyn BlobStore,
        address: &ContentAddress,
        max_depth: usize,
    ) -> ContainerResult<Container> {
        let mut items = Vec::new();
        let mut queue: VecDeque<(ContentAddress, String, usize)> = VecDeque::new();
        queue.push_back((address.clone(), String::new(), 0));

        while let Some((entry_address, path, depth)) = queue.pop_front() {
            let links = store.list_children(&entry_address).await?;
            if depth < max_depth {
                for link in &links {
                    let child_path = if path.is_empty() {
                        link.name.clone()
                    } else {
                        format!("{path}{SEPARATOR}{}", link.name)
                    };
                    queue.push_back((link.address.clone(), child_path, depth + 1));
                }
            }
            items.push(ContainerEntry {
                path,
                address: entry_address,
                links,
            });
        }

        Ok(Container {
            address: address.clone(),
            items,
        })
    }

    /// Re-create this container with `updates` overlaid on its entries.
    ///
    /// Existing leaves are carried as links (no bytes copied); the root and
    /// interior directories are re-derived, which rebuilds each directory
    /// node to byte-identical form and so preserves every untouched entry's
    /// address. Updates at existing paths replace them, new paths are added.
    pub async fn patch(
        &self,
        store: &dyn BlobStore,
        updates: Vec<ContainerWritable>,
    ) -> ContainerResult<Container> {
        let mut merged: BTreeMap<String, ContainerWritable> = BTreeMap::new();
        for entry in &self.items {
            if entry.path.is_empty() || self.has_children(&entry.path) {
                continue;
            }
            merged.insert(
                entry.path.clone(),
                ContainerWritable::link(entry.path.clone(), entry.address.clone()),
            );
        }
        for update in updates {
            merged.insert(update.path().to_string(), update);
        }
        Container::create(store, merged.into_values().collect()).await
    }

    fn has_children(&self, path: &str) -> bool {
        let prefix = format!("{path}{SEPARATOR}");
        self.items.iter().any(|entry| entry.path.starts_with(&prefix))
    }
}

fn validate_path(path: &str) -> ContainerResult<()> {
    let invalid = |reason: &str| ContainerError::InvalidPath {
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

/// Insert every proper ancestor directory of `path` into `dirs`.
fn collect_ancestors(path: &str, dirs: &mut BTreeSet<String>) {
    let mut cursor = path;
    while let Some((parent, _)) = cursor.rsplit_once(SEPARATOR) {
        dirs.insert(parent.to_string());
        cursor = parent;
    }
}
