use quill_types::ContentAddress;

/// New leaf bytes destined for a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WritableContent {
    /// Slash-separated path inside the container.
    pub path: String,
    /// Leaf content to store.
    pub content: Vec<u8>,
}

/// An existing address to attach by reference — no bytes are copied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WritableLink {
    /// Slash-separated path inside the container.
    pub path: String,
    /// Address of the existing node to link.
    pub address: ContentAddress,
}

/// One entry of a container write: content or link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerWritable {
    /// New leaf bytes to store.
    Content(WritableContent),
    /// An existing address to attach by reference.
    Link(WritableLink),
}

impl ContainerWritable {
    /// New leaf bytes at a path.
    pub fn content(path: impl Into<String>, content: Vec<u8>) -> Self {
        Self::Content(WritableContent {
            path: path.into(),
            content,
        })
    }

    /// An existing address linked at a path.
    pub fn link(path: impl Into<String>, address: ContentAddress) -> Self {
        Self::Link(WritableLink {
            path: path.into(),
            address,
        })
    }

    /// The path this writable lands at.
    pub fn path(&self) -> &str {
        match self {
            Self::Content(content) => &content.path,
            Self::Link(link) => &link.path,
        }
    }
}
