use quill_types::ContentAddress;

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is prepended to every hash computation so that different
/// node families with identical bytes cannot collide on an address.
/// Addresses are lowercase hex, which keeps them inside the bare (V1)
/// address alphabet.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for DAG nodes (leaves and directories alike).
    pub const NODE: Self = Self {
        domain: "quill-node-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes into a content address.
    pub fn hash(&self, data: &[u8]) -> ContentAddress {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentAddress::new(hex::encode(hasher.finalize().as_bytes()))
    }

    /// Verify that data hashes to the expected address.
    pub fn verify(&self, data: &[u8], expected: &ContentAddress) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
