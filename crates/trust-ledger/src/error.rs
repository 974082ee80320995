use std::io;
use std::path::PathBuf;

use trust_crypto::{IntegrityReport, Violation};

/// The persisted chain is unreadable, unparsable, or unwritable.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed record at {path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("incomplete trailing record at byte {offset} of {path}")]
    TornTail { path: PathBuf, offset: u64 },

    #[error("ledger log {0} contains no blocks")]
    Empty(PathBuf),

    #[error("ledger is locked by another writer ({0})")]
    Locked(PathBuf),

    #[error("ledger log already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("ledger log not found at {0}")]
    NotFound(PathBuf),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("block log {0} may hold a partial record; reopen the ledger to recover")]
    Unrecoverable(PathBuf),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// A recomputed hash or link did not match what is stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("integrity violation at block #{first_index}: {summary}")]
pub struct IntegrityViolation {
    /// Lowest violating chain position.
    pub first_index: u64,
    pub summary: String,
    /// Every violation found, in walk order.
    pub violations: Vec<Violation>,
}

impl IntegrityViolation {
    pub fn from_report(report: IntegrityReport) -> Self {
        let (first_index, summary) = match report.first_violation() {
            Some(v) => (v.index, format!("{} ({})", v.kind, v.description)),
            None => (0, "unknown".into()),
        };
        Self {
            first_index,
            summary,
            violations: report.violations,
        }
    }

    pub fn violating_indices(&self) -> Vec<u64> {
        let mut indices: Vec<u64> = self.violations.iter().map(|v| v.index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl From<Violation> for IntegrityViolation {
    fn from(violation: Violation) -> Self {
        Self::from_report(IntegrityReport {
            blocks_checked: 1,
            violations: vec![violation],
        })
    }
}

/// A payload offered to `append` was rejected before hashing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("payload text is empty")]
    EmptyText,

    #[error("movement description is empty")]
    EmptyDescription,

    #[error("movement amount is zero")]
    ZeroAmount,

    #[error("payload is {len} bytes; the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("payload contains control character {0:?}")]
    ControlCharacter(char),
}

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Integrity(#[from] IntegrityViolation),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("ledger is read-only until the operator resolves: {0}")]
    ReadOnly(IntegrityViolation),

    #[error("ledger state lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, LedgerError>;
