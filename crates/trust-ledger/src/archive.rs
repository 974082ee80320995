//! Operator tools that act on a ledger file as a whole.
//!
//! Each of these takes the single-writer lock itself (except [`export`],
//! which works from an open handle), so none can run alongside a live
//! [`Ledger`].

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::block::Block;
use crate::config::{sibling, LedgerConfig};
use crate::error::{LedgerError, Result, StorageError};
use crate::ledger::{verify, Ledger};
use crate::lock::LockFile;
use crate::log::{parent_dir, sync_dir, torn_tail_offset, BlockLog};

/// Write the chain as a pretty-printed JSON array of blocks.
///
/// The target is replaced atomically.
pub fn export(ledger: &Ledger, target: &Path) -> Result<usize> {
    let blocks = ledger.blocks()?;
    let json = serde_json::to_vec_pretty(&blocks)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    write_atomic(target, &json)?;
    info!(target = %target.display(), blocks = blocks.len(), "ledger exported");
    Ok(blocks.len())
}

/// Seed a new ledger from a JSON array of blocks.
///
/// The array must verify end to end, and no log may exist at the configured
/// path yet.
pub fn import(source: &Path, config: LedgerConfig) -> Result<Ledger> {
    let bytes = fs::read(source).map_err(StorageError::io(source))?;
    let blocks: Vec<Block> = serde_json::from_slice(&bytes).map_err(|e| StorageError::Parse {
        path: source.to_path_buf(),
        line: e.line(),
        message: e.to_string(),
    })?;
    verify(&blocks)?;

    {
        let _lock = LockFile::acquire(&config.lock_path())?;
        BlockLog::create(&config.path, &blocks, config.sync_mode)?;
    }
    info!(source = %source.display(), blocks = blocks.len(), "ledger imported");
    Ledger::open_or_create(config)
}

/// Move a ledger log aside so the next open starts a fresh chain.
///
/// Returns the quarantine path. Nothing is deleted.
pub fn quarantine(config: &LedgerConfig) -> Result<PathBuf> {
    let _lock = LockFile::acquire(&config.lock_path())?;
    if !config.path.exists() {
        return Err(StorageError::NotFound(config.path.clone()).into());
    }

    let target = quarantine_target(config);
    fs::rename(&config.path, &target).map_err(StorageError::io(&config.path))?;
    sync_dir(parent_dir(&config.path));

    warn!(
        from = %config.path.display(),
        to = %target.display(),
        "ledger quarantined"
    );
    Ok(target)
}

/// First free `quarantine-<stamp>[-n]` sibling. Callers hold the ledger lock.
fn quarantine_target(config: &LedgerConfig) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
    let base = format!("quarantine-{stamp}");
    let mut target = sibling(&config.path, &base);
    let mut n = 1u32;
    while target.exists() {
        target = sibling(&config.path, &format!("{base}-{n}"));
        n += 1;
    }
    target
}

/// Drop an unterminated final record left by a crash mid-append.
///
/// Returns the number of bytes removed, or `None` if the log ends cleanly.
/// Complete records are never touched, and a log whose only record is torn
/// is left empty rather than re-seeded.
pub fn repair_torn_tail(config: &LedgerConfig) -> Result<Option<u64>> {
    let _lock = LockFile::acquire(&config.lock_path())?;
    let bytes = fs::read(&config.path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound(config.path.clone()),
        _ => StorageError::io(&config.path)(e),
    })?;

    let Some(offset) = torn_tail_offset(&bytes) else {
        return Ok(None);
    };
    let dropped = bytes.len() as u64 - offset;

    let file = OpenOptions::new()
        .write(true)
        .open(&config.path)
        .map_err(StorageError::io(&config.path))?;
    file.set_len(offset).map_err(StorageError::io(&config.path))?;
    file.sync_all().map_err(StorageError::io(&config.path))?;

    warn!(path = %config.path.display(), offset, dropped, "torn tail truncated");
    Ok(Some(dropped))
}

/// Remove a lock file left behind by a crashed writer.
///
/// Returns `true` if a lock was removed.
pub fn force_unlock(config: &LedgerConfig) -> Result<bool> {
    let path = config.lock_path();
    match fs::remove_file(&path) {
        Ok(()) => {
            warn!(path = %path.display(), "ledger lock forcibly removed");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(LedgerError::Storage(StorageError::io(&path)(e))),
    }
}

/// Replace `target` with `contents` via a temp file in the same directory.
pub fn write_atomic(target: &Path, contents: &[u8]) -> std::result::Result<(), StorageError> {
    let dir = parent_dir(target);
    fs::create_dir_all(dir).map_err(StorageError::io(dir))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(StorageError::io(dir))?;
    tmp.write_all(contents).map_err(StorageError::io(tmp.path()))?;
    tmp.as_file().sync_all().map_err(StorageError::io(tmp.path()))?;
    tmp.persist(target).map_err(|e| StorageError::io(target)(e.error))?;
    sync_dir(dir);
    Ok(())
}
