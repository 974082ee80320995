use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// The 32-byte digest that seals a block.
///
/// On disk a `BlockHash` is always the 64-character lowercase hex string, so
/// persisted chains stay auditable with ordinary text tools.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    /// Wrap a pre-computed digest.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.short_hex())
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for BlockHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for BlockHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for predecessor links: `None` is stored as the `"0"` sentinel.
pub mod sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::BlockHash;

    /// The stored predecessor of the genesis block.
    pub const GENESIS_SENTINEL: &str = "0";

    /// Canonical string form of a predecessor link.
    pub fn render(link: &Option<BlockHash>) -> String {
        match link {
            Some(hash) => hash.to_hex(),
            None => GENESIS_SENTINEL.to_string(),
        }
    }

    pub fn serialize<S: Serializer>(link: &Option<BlockHash>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&render(link))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<BlockHash>, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == GENESIS_SENTINEL {
            return Ok(None);
        }
        BlockHash::from_hex(&s).map(Some).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let hash = BlockHash::from_hash([7; 32]);
        let parsed = BlockHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn rejects_short_input() {
        let err = BlockHash::from_hex("abcd").unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 32, actual: 2 });
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            BlockHash::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn serializes_as_hex_string() {
        let hash = BlockHash::from_hash([0xab; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
    }

    #[test]
    fn sentinel_renders_genesis_as_zero() {
        assert_eq!(sentinel::render(&None), "0");
        let hash = BlockHash::from_hash([1; 32]);
        assert_eq!(sentinel::render(&Some(hash)), hash.to_hex());
    }

    #[test]
    fn short_hex_is_8_chars() {
        assert_eq!(BlockHash::from_hash([3; 32]).short_hex().len(), 8);
    }
}
