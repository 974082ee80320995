//! Cryptographic primitives for the trust ledger.
//!
//! Provides the domain-separated BLAKE3 block digest and hash chain
//! verification. All crypto operations wrap established libraries; there is
//! no custom cryptography.

pub mod chain;
pub mod hasher;

pub use chain::{ChainLink, HashChainVerifier, IntegrityReport, Violation, ViolationKind};
pub use hasher::BlockHasher;
