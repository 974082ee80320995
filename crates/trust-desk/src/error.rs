use std::io;
use std::path::PathBuf;

use trust_ledger::{LedgerError, StorageError};
use trust_types::{Amount, TypeError};

/// Errors raised by desk workflows.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed desk state at {path}: {message}")]
    State { path: PathBuf, message: String },

    #[error("malformed request inbox at {path}: {message}")]
    Inbox { path: PathBuf, message: String },

    #[error("request #{0} not found")]
    RequestNotFound(u64),

    #[error("request #{0} has already been processed")]
    RequestClosed(u64),

    #[error("disbursement amount must be positive, got {0}")]
    InvalidAmount(Amount),

    #[error("balance overflow while summing ledger movements")]
    BalanceOverflow,
}

impl DeskError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;
