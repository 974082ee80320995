use serde::{Deserialize, Serialize};
use trust_crypto::{BlockHasher, ChainLink};
use trust_types::hash::sentinel;
use trust_types::{BlockHash, Payload, Timestamp};

/// One immutable, hash-linked ledger record.
///
/// Field order here is the on-disk key order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: Timestamp,
    pub data: Payload,
    pub hash: BlockHash,
    /// Hash of the preceding block; `None` is stored as `"0"` for genesis.
    #[serde(with = "sentinel")]
    pub previous_hash: Option<BlockHash>,
}

impl Block {
    /// The genesis block for the given message.
    ///
    /// Every field is deterministic, so two ledgers created with the same
    /// message share a genesis hash.
    pub fn genesis(message: &str) -> Self {
        Self::seal(0, Timestamp::genesis(), Payload::text(message), None)
    }

    /// Build a block and compute its hash from the given fields.
    pub fn seal(
        index: u64,
        timestamp: Timestamp,
        data: Payload,
        previous_hash: Option<BlockHash>,
    ) -> Self {
        let hash = digest(index, &timestamp, &data, previous_hash.as_ref());
        Self {
            index,
            timestamp,
            data,
            hash,
            previous_hash,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash.is_none()
    }

    /// Stored predecessor in its canonical string form (`"0"` for genesis).
    pub fn previous_hash_str(&self) -> String {
        sentinel::render(&self.previous_hash)
    }
}

/// Digest over `(index, timestamp, data, previous_hash)`.
pub fn digest(
    index: u64,
    timestamp: &Timestamp,
    data: &Payload,
    previous_hash: Option<&BlockHash>,
) -> BlockHash {
    BlockHasher::BLOCK.digest(
        index,
        timestamp.as_str(),
        &data.canonical(),
        &sentinel::render(&previous_hash.copied()),
    )
}

impl ChainLink for Block {
    fn index(&self) -> u64 {
        self.index
    }

    fn block_hash(&self) -> BlockHash {
        self.hash
    }

    fn previous_hash(&self) -> Option<BlockHash> {
        self.previous_hash
    }

    fn recompute_hash(&self) -> BlockHash {
        digest(self.index, &self.timestamp, &self.data, self.previous_hash.as_ref())
    }
}
