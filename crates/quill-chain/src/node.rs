use tracing::debug;

use quill_container::{Container, ContainerWritable};
use quill_store::BlobStore;
use quill_types::{strip_scheme, AddressGeneration, ContentAddress, SEPARATOR};

use crate::error::{ChainError, ChainResult};
use crate::record::{Record, RecordPatch};

/// Fixed path of the record body inside its container.
pub const RECORD_FILENAME: &str = "block.json";
/// Fixed path of the primary content when the caller does not name one.
pub const CONTENT_FILENAME: &str = "content";
/// Directory holding auxiliary assets.
pub const ASSETS_DIR: &str = "assets";

/// A record paired with the address it was loaded from or written to.
///
/// Never mutated: every change produces a new node at a new address. The
/// node's own address determines its generation, and with it how the
/// record's content and asset addresses resolve.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainNode {
    address: ContentAddress,
    record: Record,
}

impl ChainNode {
    /// The node's content address.
    pub fn address(&self) -> &ContentAddress {
        &self.address
    }

    /// The deserialized record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Classify the node's own address into its wire-format generation.
    pub fn generation(&self) -> ChainResult<AddressGeneration> {
        Ok(AddressGeneration::classify(self.address.as_str())?)
    }

    /// The container (or legacy storage) address owning this record.
    pub fn root(&self) -> ChainResult<ContentAddress> {
        match self.generation()? {
            AddressGeneration::V1 => Ok(ContentAddress::from(self.record.address.as_str())),
            AddressGeneration::V2 => Ok(ContentAddress::from(strip_scheme(&self.record.address))),
            AddressGeneration::V3 => {
                let root = self
                    .address
                    .as_str()
                    .split(SEPARATOR)
                    .next()
                    .unwrap_or_default();
                Ok(ContentAddress::from(root))
            }
        }
    }

    /// Resolve a record-relative address to one the blob store can read.
    pub fn resolve(&self, relative: &str) -> ChainResult<ContentAddress> {
        match self.generation()? {
            // Legacy records carry absolute store addresses.
            AddressGeneration::V1 => Ok(ContentAddress::from(relative)),
            AddressGeneration::V2 => Ok(ContentAddress::from(strip_scheme(relative))),
            AddressGeneration::V3 => Ok(self.root()?.join(relative)),
        }
    }

    /// Resolved address of the record's primary content.
    pub fn content_address(&self) -> ChainResult<ContentAddress> {
        self.resolve(&self.record.address)
    }

    /// Resolved address of a named auxiliary asset.
    pub fn asset_address(&self, name: &str) -> ChainResult<ContentAddress> {
        self.resolve(&format!("{ASSETS_DIR}{SEPARATOR}{name}"))
    }

    /// Load one node from its address.
    pub async fn load(store: &dyn BlobStore, address: &ContentAddress) -> ChainResult<ChainNode> {
        let read_address = match AddressGeneration::classify(address.as_str())? {
            AddressGeneration::V2 => ContentAddress::from(strip_scheme(address.as_str())),
            _ => address.clone(),
        };
        let bytes = store.get(&read_address).await?;
        let record = Record::from_bytes(&bytes)?;
        Ok(ChainNode {
            address: address.clone(),
            record,
        })
    }

    /// Materialize a new record together with its content and asset files.
    ///
    /// The node's address is the record body's path inside the new container,
    /// so created nodes are always generation V3.
    pub async fn create(
        store: &dyn BlobStore,
        record: Record,
        files: Vec<ContainerWritable>,
    ) -> ChainResult<ChainNode> {
        let container = Container::create(store, with_record_file(&record, files)?).await?;
        let address = container.resolve(RECORD_FILENAME);
        debug!(address = %address.short(), uuid = %record.uuid, "created chain node");
        Ok(ChainNode { address, record })
    }

    /// The container owning this record.
    ///
    /// Fails with [`ChainError::MissingContainer`] for legacy (V1/V2) nodes,
    /// which were written before containers existed.
    pub async fn container(&self, store: &dyn BlobStore) -> ChainResult<Container> {
        match self.generation()? {
            AddressGeneration::V3 => Ok(Container::load(store, &self.root()?).await?),
            AddressGeneration::V1 | AddressGeneration::V2 => Err(ChainError::MissingContainer {
                address: self.address.clone(),
            }),
        }
    }

    /// Rewrite this node with a record patch and optional new files,
    /// producing a new node at a new address.
    ///
    /// V3 nodes patch their existing container. Legacy nodes are upgraded:
    /// a fresh container is created, the legacy content is attached by
    /// reference under the fixed content path, and the record's address is
    /// normalized to it — so a rewritten legacy node stays resolvable.
    pub async fn patch(
        &self,
        store: &dyn BlobStore,
        patch: RecordPatch,
        files: Vec<ContainerWritable>,
    ) -> ChainResult<ChainNode> {
        match self.generation()? {
            AddressGeneration::V3 => {
                let patched = self.record.patched(patch);
                let container = Container::load(store, &self.root()?).await?;
                let next = container
                    .patch(store, with_record_file(&patched, files)?)
                    .await?;
                Ok(ChainNode {
                    address: next.resolve(RECORD_FILENAME),
                    record: patched,
                })
            }
            AddressGeneration::V1 | AddressGeneration::V2 => {
                let mut patch = patch;
                let mut files = files;
                if patch.address.is_none() {
                    if !self.record.address.is_empty() {
                        files.push(ContainerWritable::link(
                            CONTENT_FILENAME,
                            self.content_address()?,
                        ));
                    }
                    patch.address = Some(CONTENT_FILENAME.to_string());
                }
                let patched = self.record.patched(patch);
                let container =
                    Container::create(store, with_record_file(&patched, files)?).await?;
                debug!(address = %self.address.short(), "upgraded legacy chain node");
                Ok(ChainNode {
                    address: container.resolve(RECORD_FILENAME),
                    record: patched,
                })
            }
        }
    }
}

/// Caller files plus the serialized record at its fixed path; caller files
/// colliding with that path are dropped.
fn with_record_file(
    record: &Record,
    files: Vec<ContainerWritable>,
) -> ChainResult<Vec<ContainerWritable>> {
    let mut contents: Vec<ContainerWritable> = files
        .into_iter()
        .filter(|file| file.path() != RECORD_FILENAME)
        .collect();
    contents.push(ContainerWritable::content(RECORD_FILENAME, record.to_bytes()?));
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Meta;
    use quill_store::InMemoryBlobStore;
    use serde_json::json;

    fn content_file(text: &str) -> ContainerWritable {
        ContainerWritable::content(CONTENT_FILENAME, text.as_bytes().to_vec())
    }

    async fn v3_node(store: &InMemoryBlobStore, text: &str) -> ChainNode {
        let record = Record::new(CONTENT_FILENAME, Meta::new(), None);
        ChainNode::create(store, record, vec![content_file(text)])
            .await
            .unwrap()
    }

    /// Fabricate a V1-era node: record and content stored as bare blobs.
    fn v1_node(store: &InMemoryBlobStore, text: &str) -> (ChainNode, ContentAddress) {
        let content = store.put_raw(text.as_bytes().to_vec());
        let record = Record {
            uuid: uuid::Uuid::now_v7(),
            address: content.as_str().to_string(),
            meta: Meta::new(),
            timestamp: 1000,
            previous: None,
        };
        let address = store.put_raw(record.to_bytes().unwrap());
        (
            ChainNode {
                address: address.clone(),
                record,
            },
            content,
        )
    }

    // -----------------------------------------------------------------------
    // Creation and loading
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn created_nodes_are_v3() {
        let store = InMemoryBlobStore::new();
        let node = v3_node(&store, "hello").await;
        assert_eq!(node.generation().unwrap(), AddressGeneration::V3);
        assert!(node.address().as_str().ends_with("/block.json"));
    }

    #[tokio::test]
    async fn load_roundtrip() {
        let store = InMemoryBlobStore::new();
        let node = v3_node(&store, "hello").await;
        let loaded = ChainNode::load(&store, node.address()).await.unwrap();
        assert_eq!(&loaded, &node);
    }

    #[tokio::test]
    async fn content_resolves_to_written_bytes() {
        let store = InMemoryBlobStore::new();
        let node = v3_node(&store, "the body").await;
        let bytes = store.get(&node.content_address().unwrap()).await.unwrap();
        assert_eq!(bytes, b"the body");
    }

    #[tokio::test]
    async fn asset_addresses_resolve_under_assets() {
        let store = InMemoryBlobStore::new();
        let logo = store.put_raw(b"png".to_vec());
        let record = Record::new(CONTENT_FILENAME, Meta::new(), None);
        let node = ChainNode::create(
            &store,
            record,
            vec![
                content_file("body"),
                ContainerWritable::link("assets/logo.png", logo),
            ],
        )
        .await
        .unwrap();

        let resolved = node.asset_address("logo.png").unwrap();
        assert_eq!(store.get(&resolved).await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn record_filename_collision_is_dropped() {
        let store = InMemoryBlobStore::new();
        let record = Record::new(CONTENT_FILENAME, Meta::new(), None);
        let node = ChainNode::create(
            &store,
            record.clone(),
            vec![
                ContainerWritable::content(RECORD_FILENAME, b"bogus".to_vec()),
                content_file("body"),
            ],
        )
        .await
        .unwrap();

        let loaded = ChainNode::load(&store, node.address()).await.unwrap();
        assert_eq!(loaded.record(), &record);
    }

    // -----------------------------------------------------------------------
    // Generation-aware resolution
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn v1_node_resolves_bare_addresses() {
        let store = InMemoryBlobStore::new();
        let (node, content) = v1_node(&store, "v1 body");

        assert_eq!(node.generation().unwrap(), AddressGeneration::V1);
        assert_eq!(node.root().unwrap(), content);
        assert_eq!(node.content_address().unwrap(), content);
        assert_eq!(store.get(&node.content_address().unwrap()).await.unwrap(), b"v1 body");
    }

    #[tokio::test]
    async fn v2_node_strips_scheme() {
        let store = InMemoryBlobStore::new();
        let content = store.put_raw(b"v2 body".to_vec());
        let record = Record {
            uuid: uuid::Uuid::now_v7(),
            address: format!("bzz://{content}"),
            meta: Meta::new(),
            timestamp: 1000,
            previous: None,
        };
        let bare = store.put_raw(record.to_bytes().unwrap());
        let address = ContentAddress::from(format!("bzz://{bare}"));

        let node = ChainNode::load(&store, &address).await.unwrap();
        assert_eq!(node.generation().unwrap(), AddressGeneration::V2);
        assert_eq!(node.content_address().unwrap(), content);
    }

    #[tokio::test]
    async fn v3_root_is_address_before_first_separator() {
        let store = InMemoryBlobStore::new();
        let node = v3_node(&store, "hello").await;
        let expected = node.address().as_str().split('/').next().unwrap();
        assert_eq!(node.root().unwrap().as_str(), expected);
    }

    // -----------------------------------------------------------------------
    // Containers
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn v3_node_loads_its_container() {
        let store = InMemoryBlobStore::new();
        let node = v3_node(&store, "hello").await;
        let container = node.container(&store).await.unwrap();
        assert!(container.entry(RECORD_FILENAME).is_some());
        assert!(container.entry(CONTENT_FILENAME).is_some());
    }

    #[tokio::test]
    async fn v1_node_has_no_container() {
        let store = InMemoryBlobStore::new();
        let (node, _) = v1_node(&store, "v1 body");
        let err = node.container(&store).await.unwrap_err();
        assert!(matches!(err, ChainError::MissingContainer { .. }));
    }

    // -----------------------------------------------------------------------
    // Patching
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn patch_produces_new_address_and_keeps_uuid() {
        let store = InMemoryBlobStore::new();
        let node = v3_node(&store, "one").await;
        let mut meta = Meta::new();
        meta.insert("title".to_string(), json!("two"));

        let patched = node
            .patch(
                &store,
                RecordPatch::content(CONTENT_FILENAME, meta),
                vec![content_file("two")],
            )
            .await
            .unwrap();

        assert_ne!(patched.address(), node.address());
        assert_eq!(patched.record().uuid, node.record().uuid);
        assert_eq!(patched.record().previous, node.record().previous);
        assert_eq!(
            store.get(&patched.content_address().unwrap()).await.unwrap(),
            b"two"
        );
    }

    #[tokio::test]
    async fn relink_patch_keeps_content() {
        let store = InMemoryBlobStore::new();
        let node = v3_node(&store, "body").await;

        let relinked = node
            .patch(
                &store,
                RecordPatch::relink(Some(ContentAddress::from("abc123/block.json"))),
                vec![],
            )
            .await
            .unwrap();

        assert_eq!(
            relinked.record().previous,
            Some(ContentAddress::from("abc123/block.json"))
        );
        assert_eq!(
            store.get(&relinked.content_address().unwrap()).await.unwrap(),
            b"body"
        );
    }

    #[tokio::test]
    async fn relink_upgrades_legacy_node() {
        let store = InMemoryBlobStore::new();
        let (node, content) = v1_node(&store, "legacy body");

        let upgraded = node
            .patch(&store, RecordPatch::relink(None), vec![])
            .await
            .unwrap();

        assert_eq!(upgraded.generation().unwrap(), AddressGeneration::V3);
        assert_eq!(upgraded.record().uuid, node.record().uuid);
        assert_eq!(upgraded.record().address, CONTENT_FILENAME);
        // Content linked by reference, not copied.
        let container = upgraded.container(&store).await.unwrap();
        assert_eq!(container.entry(CONTENT_FILENAME).unwrap().address, content);
        assert_eq!(
            store.get(&upgraded.content_address().unwrap()).await.unwrap(),
            b"legacy body"
        );
    }
}
