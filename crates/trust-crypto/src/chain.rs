use std::fmt;

use trust_types::BlockHash;

/// Trait for records that participate in a hash chain.
pub trait ChainLink {
    /// Position the record claims in the chain.
    fn index(&self) -> u64;
    /// The record's stored hash.
    fn block_hash(&self) -> BlockHash;
    /// The stored predecessor hash (`None` for genesis).
    fn previous_hash(&self) -> Option<BlockHash>;
    /// Hash recomputed from the stored fields.
    fn recompute_hash(&self) -> BlockHash;
}

/// What went wrong at a given chain position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// The chain has no genesis block at all.
    MissingGenesis,
    /// Genesis block references a predecessor instead of the sentinel.
    GenesisLink,
    /// `previous_hash` does not match the preceding block's hash.
    BrokenLink,
    /// Recomputing the digest does not reproduce the stored hash.
    HashMismatch,
    /// Stored index differs from the block's position.
    IndexGap,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingGenesis => "missing genesis",
            Self::GenesisLink => "genesis link",
            Self::BrokenLink => "broken link",
            Self::HashMismatch => "hash mismatch",
            Self::IndexGap => "index gap",
        };
        f.write_str(name)
    }
}

/// A specific integrity violation detected during verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Chain position (not the stored index, which may itself be wrong).
    pub index: u64,
    pub kind: ViolationKind,
    pub description: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.index, self.kind, self.description)
    }
}

/// Result of walking a chain from genesis to tip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub blocks_checked: u64,
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// The lowest violating position, if any.
    pub fn first_violation(&self) -> Option<&Violation> {
        self.violations.iter().min_by_key(|v| v.index)
    }

    /// Distinct violating positions, ascending.
    pub fn violating_indices(&self) -> Vec<u64> {
        let mut indices: Vec<u64> = self.violations.iter().map(|v| v.index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Hash chain integrity verifier.
///
/// Checks, for every position `i`:
/// 1. genesis (`i == 0`) has no predecessor
/// 2. `previous_hash` equals the hash of block `i - 1`
/// 3. the stored hash equals the digest recomputed from the stored fields
/// 4. the stored index equals `i`
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Walk the whole chain and collect every violation.
    pub fn inspect<L: ChainLink>(blocks: &[L]) -> IntegrityReport {
        let mut violations = Vec::new();

        if blocks.is_empty() {
            violations.push(Violation {
                index: 0,
                kind: ViolationKind::MissingGenesis,
                description: "chain contains no blocks".into(),
            });
        }

        for (position, block) in blocks.iter().enumerate() {
            let position = position as u64;

            if block.index() != position {
                violations.push(Violation {
                    index: position,
                    kind: ViolationKind::IndexGap,
                    description: format!("expected index {position}, found {}", block.index()),
                });
            }

            if position == 0 {
                if block.previous_hash().is_some() {
                    violations.push(Violation {
                        index: 0,
                        kind: ViolationKind::GenesisLink,
                        description: "genesis block must reference the \"0\" sentinel".into(),
                    });
                }
            } else {
                let expected = blocks[position as usize - 1].block_hash();
                match block.previous_hash() {
                    Some(prev) if prev == expected => {}
                    Some(prev) => violations.push(Violation {
                        index: position,
                        kind: ViolationKind::BrokenLink,
                        description: format!(
                            "previous_hash {} does not match block #{} hash {}",
                            prev.short_hex(),
                            position - 1,
                            expected.short_hex()
                        ),
                    }),
                    None => violations.push(Violation {
                        index: position,
                        kind: ViolationKind::BrokenLink,
                        description: "non-genesis block carries the genesis sentinel".into(),
                    }),
                }
            }

            let computed = block.recompute_hash();
            if computed != block.block_hash() {
                violations.push(Violation {
                    index: position,
                    kind: ViolationKind::HashMismatch,
                    description: format!(
                        "stored {} but fields digest to {}",
                        block.block_hash().short_hex(),
                        computed.short_hex()
                    ),
                });
            }
        }

        IntegrityReport {
            blocks_checked: blocks.len() as u64,
            violations,
        }
    }

    /// Verify a chain, returning the full report on failure.
    pub fn verify_chain<L: ChainLink>(blocks: &[L]) -> Result<(), IntegrityReport> {
        let report = Self::inspect(blocks);
        if report.is_valid() {
            Ok(())
        } else {
            Err(report)
        }
    }

    /// Check that `next` may be appended after `tip` without walking the chain.
    pub fn verify_extension<L: ChainLink>(tip: &L, next: &L) -> Result<(), Violation> {
        let position = tip.index() + 1;
        if next.index() != position {
            return Err(Violation {
                index: position,
                kind: ViolationKind::IndexGap,
                description: format!("expected index {position}, found {}", next.index()),
            });
        }
        if next.previous_hash() != Some(tip.block_hash()) {
            return Err(Violation {
                index: position,
                kind: ViolationKind::BrokenLink,
                description: "extension does not reference the current tip".into(),
            });
        }
        if next.recompute_hash() != next.block_hash() {
            return Err(Violation {
                index: position,
                kind: ViolationKind::HashMismatch,
                description: "extension hash does not match its fields".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::hasher::BlockHasher;

    /// Minimal chain record for verification tests.
    #[derive(Clone)]
    struct TestBlock {
        index: u64,
        data: String,
        prev: Option<BlockHash>,
        hash: BlockHash,
    }

    impl TestBlock {
        fn digest(index: u64, data: &str, prev: Option<BlockHash>) -> BlockHash {
            let prev = prev.map(|p| p.to_hex()).unwrap_or_else(|| "0".into());
            BlockHasher::BLOCK.digest(index, "2024-01-01T00:00:00.000000Z", data, &prev)
        }
    }

    impl ChainLink for TestBlock {
        fn index(&self) -> u64 {
            self.index
        }
        fn block_hash(&self) -> BlockHash {
            self.hash
        }
        fn previous_hash(&self) -> Option<BlockHash> {
            self.prev
        }
        fn recompute_hash(&self) -> BlockHash {
            Self::digest(self.index, &self.data, self.prev)
        }
    }

    fn build_chain(count: usize) -> Vec<TestBlock> {
        let mut chain: Vec<TestBlock> = Vec::new();
        for i in 0..count as u64 {
            let prev = chain.last().map(|b| b.hash);
            let data = format!("entry-{i}");
            let hash = TestBlock::digest(i, &data, prev);
            chain.push(TestBlock { index: i, data, prev, hash });
        }
        chain
    }

    #[test]
    fn empty_chain_is_missing_genesis() {
        let report = HashChainVerifier::inspect::<TestBlock>(&[]);
        assert_eq!(report.violations[0].kind, ViolationKind::MissingGenesis);
    }

    #[test]
    fn valid_chain_passes() {
        let chain = build_chain(10);
        assert!(HashChainVerifier::verify_chain(&chain).is_ok());
    }

    #[test]
    fn genesis_with_prev_hash_fails() {
        let mut chain = build_chain(1);
        chain[0].prev = Some(BlockHash::from_hash([1; 32]));
        let report = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert!(report
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::GenesisLink && v.index == 0));
    }

    #[test]
    fn broken_link_detected() {
        let mut chain = build_chain(3);
        chain[2].prev = Some(BlockHash::from_hash([99; 32]));
        let report = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(report.first_violation().unwrap().index, 2);
        assert!(report.violations.iter().any(|v| v.kind == ViolationKind::BrokenLink));
    }

    #[test]
    fn sentinel_in_middle_detected() {
        let mut chain = build_chain(3);
        chain[1].prev = None;
        let report = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(report.violating_indices(), vec![1]);
    }

    #[test]
    fn tampered_data_detected() {
        let mut chain = build_chain(3);
        chain[1].data = "tampered".into();
        let report = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::HashMismatch);
        assert_eq!(report.violations[0].index, 1);
    }

    #[test]
    fn index_gap_detected() {
        let mut chain = build_chain(4);
        chain.remove(2);
        let report = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(report.first_violation().unwrap().index, 2);
        assert!(report.violations.iter().any(|v| v.kind == ViolationKind::IndexGap));
    }

    #[test]
    fn extension_checks_tip() {
        let chain = build_chain(3);
        assert!(HashChainVerifier::verify_extension(&chain[1], &chain[2]).is_ok());
        let err = HashChainVerifier::verify_extension(&chain[0], &chain[2]).unwrap_err();
        assert_eq!(err.kind, ViolationKind::IndexGap);
    }

    proptest! {
        #[test]
        fn any_single_field_mutation_is_detected(
            len in 1usize..12,
            target in 0usize..12,
            field in 0u8..4,
            byte in 1u8..=255,
        ) {
            let mut chain = build_chain(len);
            let target = target % len;
            let block = &mut chain[target];
            match field {
                0 => block.index = block.index.wrapping_add(byte as u64),
                1 => block.data.push(byte as char),
                2 => {
                    let mut raw = block.prev.map(|p| *p.as_bytes()).unwrap_or([0; 32]);
                    raw[0] ^= byte;
                    block.prev = Some(BlockHash::from_hash(raw));
                }
                _ => {
                    let mut raw = *block.hash.as_bytes();
                    raw[31] ^= byte;
                    block.hash = BlockHash::from_hash(raw);
                }
            }
            let report = HashChainVerifier::verify_chain(&chain).unwrap_err();
            prop_assert!(report.first_violation().unwrap().index >= target as u64);
        }
    }
}
