use trust_types::BlockHash;

/// Domain-separated BLAKE3 block digest.
///
/// The digest covers the four block fields in the fixed order
/// `index, timestamp, data, previous_hash`. Each field is rendered as its
/// canonical string and fed to the hasher as an 8-byte little-endian length
/// followed by the UTF-8 bytes:
///
/// ```text
/// blake3("trust-block-v2:" || len(index) || index || len(ts) || ts
///        || len(data) || data || len(prev) || prev)
/// ```
///
/// `index` is decimal, `timestamp` and `previous_hash` are the stored strings
/// (`"0"` for genesis), and `data` is [`trust_types::Payload::canonical`],
/// which tags the payload variant.
/// Any change to this layout needs a new domain tag, otherwise historical
/// chains stop verifying.
pub struct BlockHasher {
    domain: &'static str,
}

impl BlockHasher {
    /// Hasher for ledger blocks.
    pub const BLOCK: Self = Self {
        domain: "trust-block-v2",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Digest the canonical field rendering of a block.
    pub fn digest(&self, index: u64, timestamp: &str, data: &str, previous_hash: &str) -> BlockHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        let index = index.to_string();
        for field in [index.as_str(), timestamp, data, previous_hash] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        BlockHash::from_hash(*hasher.finalize().as_bytes())
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
