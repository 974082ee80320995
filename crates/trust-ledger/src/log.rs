use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::block::Block;
use crate::config::SyncMode;
use crate::error::StorageError;

/// Append-only block store.
///
/// On-disk format is JSON Lines, one [`Block`] per line, each terminated by
/// `\n`:
/// ```text
/// {"index":0,"timestamp":"1970-01-01T00:00:00.000000Z","data":"GENESIS ...","hash":"…","previous_hash":"0"}
/// {"index":1,"timestamp":"2026-10-16T09:30:00.123456Z","data":"INFLOW +50.00000000","hash":"…","previous_hash":"…"}
/// ```
/// A new log is created atomically (temp file + rename). Appends write one
/// line at the end of the file; a failed write is truncated away so the file
/// never keeps a partial record from this process. If that truncation fails
/// too, the handle refuses further appends until the log is reopened.
pub struct BlockLog {
    path: PathBuf,
    file: File,
    /// Current length of the file in bytes.
    len: u64,
    sync_mode: SyncMode,
    /// A partial record may sit past `len`.
    failed: bool,
}

impl BlockLog {
    /// Create a new log holding exactly the given blocks.
    ///
    /// Fails with [`StorageError::AlreadyExists`] if a log is already present.
    pub fn create(path: &Path, blocks: &[Block], sync_mode: SyncMode) -> Result<Self, StorageError> {
        let dir = parent_dir(path);
        fs::create_dir_all(dir).map_err(StorageError::io(dir))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(StorageError::io(dir))?;
        for block in blocks {
            tmp.write_all(&encode(block)?).map_err(StorageError::io(tmp.path()))?;
        }
        tmp.as_file().sync_all().map_err(StorageError::io(tmp.path()))?;

        tmp.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                StorageError::AlreadyExists(path.to_path_buf())
            } else {
                StorageError::io(path)(e.error)
            }
        })?;
        sync_dir(dir);

        debug!(path = %path.display(), blocks = blocks.len(), "block log created");
        Self::open(path, sync_mode)
    }

    /// Open an existing log for appending.
    pub fn open(path: &Path, sync_mode: SyncMode) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => StorageError::NotFound(path.to_path_buf()),
                _ => StorageError::io(path)(e),
            })?;
        let len = file.metadata().map_err(StorageError::io(path))?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
            sync_mode,
            failed: false,
        })
    }

    /// Wrap an already-open file handle.
    #[cfg(test)]
    pub(crate) fn from_file(path: &Path, file: File, sync_mode: SyncMode) -> Self {
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        Self {
            path: path.to_path_buf(),
            file,
            len,
            sync_mode,
            failed: false,
        }
    }

    /// Read every block, strictly.
    ///
    /// Any record that does not parse is a [`StorageError::Parse`]; a final
    /// record without its terminating newline is a [`StorageError::TornTail`].
    /// Nothing is skipped and nothing is repaired here.
    pub fn load(path: &Path) -> Result<Vec<Block>, StorageError> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_path_buf()),
            _ => StorageError::io(path)(e),
        })?;
        if bytes.is_empty() {
            return Err(StorageError::Empty(path.to_path_buf()));
        }

        if let Some(offset) = torn_tail_offset(&bytes) {
            return Err(StorageError::TornTail {
                path: path.to_path_buf(),
                offset,
            });
        }

        let mut blocks = Vec::new();
        for (number, line) in bytes.split(|b| *b == b'\n').enumerate() {
            if line.is_empty() {
                // The split after the final newline.
                continue;
            }
            let block: Block = serde_json::from_slice(line).map_err(|e| StorageError::Parse {
                path: path.to_path_buf(),
                line: number + 1,
                message: e.to_string(),
            })?;
            blocks.push(block);
        }

        if blocks.is_empty() {
            return Err(StorageError::Empty(path.to_path_buf()));
        }
        debug!(path = %path.display(), blocks = blocks.len(), "block log loaded");
        Ok(blocks)
    }

    /// Append one block. Returns the byte offset of the record.
    ///
    /// Fails with [`StorageError::Unrecoverable`] once a failed write could
    /// not be rolled back.
    pub fn append(&mut self, block: &Block) -> Result<u64, StorageError> {
        if self.failed {
            return Err(StorageError::Unrecoverable(self.path.clone()));
        }
        let record = encode(block)?;
        let offset = self.len;

        if let Err(e) = self.write_record(&record) {
            self.rollback(offset);
            return Err(StorageError::io(&self.path)(e));
        }

        self.len += record.len() as u64;
        debug!(offset, index = block.index, len = record.len(), "block appended");
        Ok(offset)
    }

    fn write_record(&mut self, record: &[u8]) -> io::Result<()> {
        self.file.write_all(record)?;
        self.file.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Drop whatever part of a failed record reached the file.
    fn rollback(&mut self, offset: u64) {
        if let Err(e) = self.file.set_len(offset) {
            warn!(offset, error = %e, "failed to truncate partial block record");
            self.failed = true;
        }
    }

    /// Current file length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Serialize a block as one newline-terminated record.
fn encode(block: &Block) -> Result<Vec<u8>, StorageError> {
    let mut record =
        serde_json::to_vec(block).map_err(|e| StorageError::Serialization(e.to_string()))?;
    record.push(b'\n');
    Ok(record)
}

/// Offset of an unterminated final record, if any.
pub(crate) fn torn_tail_offset(bytes: &[u8]) -> Option<u64> {
    if bytes.last() == Some(&b'\n') || bytes.is_empty() {
        return None;
    }
    let start = bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    Some(start as u64)
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Persist a rename by syncing the containing directory (best effort).
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        warn!(dir = %dir.display(), error = %e, "directory sync failed");
    }
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use trust_types::{Payload, Timestamp};

    use super::*;

    fn chain(len: u64) -> Vec<Block> {
        let mut blocks = vec![Block::genesis("GENESIS")];
        for i in 1..len {
            let prev = blocks.last().map(|b| b.hash);
            blocks.push(Block::seal(i, Timestamp::now(), Payload::text(format!("entry {i}")), prev));
        }
        blocks
    }

    #[test]
    fn create_append_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let blocks = chain(3);

        let mut log = BlockLog::create(&path, &blocks[..1], SyncMode::EveryWrite).unwrap();
        let first = log.append(&blocks[1]).unwrap();
        let second = log.append(&blocks[2]).unwrap();
        assert!(second > first);
        assert_eq!(log.len(), fs::metadata(&path).unwrap().len());

        assert_eq!(BlockLog::load(&path).unwrap(), blocks);
    }

    #[test]
    fn create_refuses_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        BlockLog::create(&path, &chain(1), SyncMode::OsDefault).unwrap();
        assert!(matches!(
            BlockLog::create(&path, &chain(1), SyncMode::OsDefault),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn one_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        BlockLog::create(&path, &chain(4), SyncMode::OsDefault).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn load_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        assert!(matches!(BlockLog::load(&path), Err(StorageError::NotFound(_))));

        fs::write(&path, b"").unwrap();
        assert!(matches!(BlockLog::load(&path), Err(StorageError::Empty(_))));
    }

    #[test]
    fn load_rejects_malformed_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        BlockLog::create(&path, &chain(2), SyncMode::OsDefault).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"index\":2,\"garbage\":true}\n").unwrap();

        match BlockLog::load(&path) {
            Err(StorageError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_reports_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        BlockLog::create(&path, &chain(3), SyncMode::OsDefault).unwrap();
        let full = fs::metadata(&path).unwrap().len();
        OpenOptions::new().write(true).open(&path).unwrap().set_len(full - 10).unwrap();

        match BlockLog::load(&path) {
            Err(StorageError::TornTail { offset, .. }) => assert!(offset > 0 && offset < full),
            other => panic!("expected torn tail, got {other:?}"),
        }
    }

    #[test]
    fn failed_append_leaves_length_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let blocks = chain(2);
        BlockLog::create(&path, &blocks[..1], SyncMode::OsDefault).unwrap();
        let before = fs::metadata(&path).unwrap().len();

        // A read-only handle makes every write fail.
        let mut log = BlockLog::from_file(&path, File::open(&path).unwrap(), SyncMode::OsDefault);
        assert!(matches!(log.append(&blocks[1]), Err(StorageError::Io { .. })));
        assert_eq!(log.len(), before);
        assert_eq!(BlockLog::load(&path).unwrap(), blocks[..1].to_vec());
    }

    #[test]
    fn unrolled_failure_blocks_later_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let blocks = chain(2);
        BlockLog::create(&path, &blocks[..1], SyncMode::OsDefault).unwrap();

        // Writes and truncation both fail on a read-only handle.
        let mut log = BlockLog::from_file(&path, File::open(&path).unwrap(), SyncMode::OsDefault);
        assert!(matches!(log.append(&blocks[1]), Err(StorageError::Io { .. })));
        assert!(matches!(log.append(&blocks[1]), Err(StorageError::Unrecoverable(_))));

        let mut reopened = BlockLog::open(&path, SyncMode::OsDefault).unwrap();
        reopened.append(&blocks[1]).unwrap();
        assert_eq!(BlockLog::load(&path).unwrap(), blocks);
    }

    #[test]
    fn torn_tail_offset_cases() {
        assert_eq!(torn_tail_offset(b""), None);
        assert_eq!(torn_tail_offset(b"a\nb\n"), None);
        assert_eq!(torn_tail_offset(b"a\nbc"), Some(2));
        assert_eq!(torn_tail_offset(b"abc"), Some(0));
    }
}
