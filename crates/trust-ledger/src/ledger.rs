use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use trust_crypto::HashChainVerifier;
use trust_types::{Movement, Payload, Timestamp};

use crate::block::Block;
use crate::config::{IntegrityPolicy, LedgerConfig};
use crate::error::{IntegrityViolation, LedgerError, Result, StorageError};
use crate::lock::LockFile;
use crate::log::BlockLog;
use crate::validation::validate_payload;

/// Walk a chain from genesis to tip and check every invariant.
pub fn verify(blocks: &[Block]) -> std::result::Result<(), IntegrityViolation> {
    HashChainVerifier::verify_chain(blocks).map_err(IntegrityViolation::from_report)
}

/// Handle on a hash-chained ledger.
///
/// The handle owns the backing log exclusively through a [`LockFile`] until
/// it is dropped. Appends are serialized by an internal mutex; the tip is
/// cached in memory so each append costs one record write.
pub struct Ledger {
    config: LedgerConfig,
    state: Mutex<LedgerState>,
    /// Set when a failing chain was opened under [`IntegrityPolicy::ReadOnly`].
    tainted: Option<IntegrityViolation>,
    _lock: LockFile,
}

struct LedgerState {
    blocks: Vec<Block>,
    log: BlockLog,
}

impl Ledger {
    /// Load the persisted chain, or create a genesis-only chain if none exists.
    ///
    /// The loaded chain is always verified before it is returned.
    pub fn open_or_create(config: LedgerConfig) -> Result<Self> {
        let lock = LockFile::acquire(&config.lock_path())?;

        let (blocks, log) = match std::fs::metadata(&config.path) {
            Ok(_) => {
                let blocks = BlockLog::load(&config.path)?;
                let log = BlockLog::open(&config.path, config.sync_mode)?;
                (blocks, log)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let genesis = Block::genesis(&config.genesis_message);
                info!(
                    path = %config.path.display(),
                    genesis = %genesis.hash,
                    "creating ledger"
                );
                let log = BlockLog::create(&config.path, std::slice::from_ref(&genesis), config.sync_mode)?;
                (vec![genesis], log)
            }
            Err(e) => return Err(StorageError::io(&config.path)(e).into()),
        };

        let tainted = match verify(&blocks) {
            Ok(()) => None,
            Err(violation) => match config.integrity_policy {
                IntegrityPolicy::Reject => {
                    warn!(
                        path = %config.path.display(),
                        first = violation.first_index,
                        "ledger failed verification; refusing to open"
                    );
                    return Err(violation.into());
                }
                IntegrityPolicy::ReadOnly => {
                    warn!(
                        path = %config.path.display(),
                        first = violation.first_index,
                        "ledger failed verification; opened read-only"
                    );
                    Some(violation)
                }
            },
        };

        debug!(path = %config.path.display(), blocks = blocks.len(), "ledger opened");
        Ok(Self {
            config,
            state: Mutex::new(LedgerState { blocks, log }),
            tainted,
            _lock: lock,
        })
    }

    /// Seal a payload onto the tip and persist it.
    ///
    /// The block is published to readers only after its record is on disk.
    /// If the write fails nothing changes, so a retry links to the same tip.
    pub fn append(&self, payload: impl Into<Payload>) -> Result<Block> {
        if let Some(violation) = &self.tainted {
            return Err(LedgerError::ReadOnly(violation.clone()));
        }
        let payload = payload.into();
        validate_payload(&payload, self.config.max_payload_len)?;

        let mut state = self.lock_state()?;
        let tip = state
            .blocks
            .last()
            .ok_or_else(|| StorageError::Empty(self.config.path.clone()))?;

        let block = Block::seal(tip.index + 1, Timestamp::now(), payload, Some(tip.hash));
        HashChainVerifier::verify_extension(tip, &block).map_err(IntegrityViolation::from)?;

        state.log.append(&block)?;
        state.blocks.push(block.clone());

        info!(index = block.index, hash = %block.hash, "block appended");
        Ok(block)
    }

    /// Re-walk the in-memory chain from genesis to tip.
    pub fn verify(&self) -> std::result::Result<(), IntegrityViolation> {
        // Blocks are only pushed after a successful write, so a poisoned
        // guard still holds a consistent chain.
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        verify(&state.blocks)
    }

    /// Violation that put this handle in read-only mode, if any.
    pub fn taint(&self) -> Option<&IntegrityViolation> {
        self.tainted.as_ref()
    }

    pub fn is_read_only(&self) -> bool {
        self.tainted.is_some()
    }

    /// Snapshot of the whole chain.
    pub fn blocks(&self) -> Result<Vec<Block>> {
        Ok(self.lock_state()?.blocks.clone())
    }

    pub fn tip(&self) -> Result<Block> {
        self.lock_state()?
            .blocks
            .last()
            .cloned()
            .ok_or_else(|| StorageError::Empty(self.config.path.clone()).into())
    }

    pub fn get(&self, index: u64) -> Result<Option<Block>> {
        let state = self.lock_state()?;
        Ok(usize::try_from(index)
            .ok()
            .and_then(|i| state.blocks.get(i))
            .cloned())
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock_state()?.blocks.len())
    }

    /// Up to `limit` most recent blocks, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<Block>> {
        let state = self.lock_state()?;
        Ok(state.blocks.iter().rev().take(limit).cloned().collect())
    }

    /// Every movement on the chain, oldest first.
    pub fn movements(&self) -> Result<Vec<Movement>> {
        let state = self.lock_state()?;
        Ok(state
            .blocks
            .iter()
            .filter_map(|b| b.data.as_movement().cloned())
            .collect())
    }

    /// The block recording the given intake request, if one exists.
    pub fn find_request(&self, request: u64) -> Result<Option<Block>> {
        let state = self.lock_state()?;
        Ok(state
            .blocks
            .iter()
            .find(|b| b.data.as_movement().and_then(|m| m.request) == Some(request))
            .cloned())
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|_| LedgerError::Poisoned)
    }
}
