//! Hash-chained append-only ledger.
//!
//! This crate is the heart of the trust desk. It provides:
//! - [`Block`] records sealed with a BLAKE3 digest and linked to their predecessor
//! - the [`Ledger`] handle: open-or-create, append, verify, and reads
//! - an append-only JSON Lines store ([`BlockLog`]) guarded by a [`LockFile`]
//! - operator tools: export/import, quarantine, torn-tail repair

pub mod archive;
pub mod block;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod log;
pub mod validation;

pub use archive::{export, force_unlock, import, quarantine, repair_torn_tail, write_atomic};
pub use block::Block;
pub use config::{IntegrityPolicy, LedgerConfig, SyncMode};
pub use error::{IntegrityViolation, LedgerError, StorageError, ValidationError};
pub use ledger::{verify, Ledger};
pub use lock::LockFile;
pub use log::BlockLog;
pub use trust_crypto::{IntegrityReport, Violation, ViolationKind};
