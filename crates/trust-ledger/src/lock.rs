use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StorageError;

/// Exclusive single-writer lock, held for the lifetime of a ledger handle.
///
/// The lock is a sibling file created with `create_new`; it records the
/// owning process id and is removed on drop. A crash leaves it behind, and
/// only an explicit [`crate::force_unlock`] clears it.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    pub fn acquire(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::Locked(path.to_path_buf()));
            }
            Err(e) => return Err(StorageError::io(path)(e)),
        };
        writeln!(file, "{}", std::process::id()).map_err(StorageError::io(path))?;

        debug!(path = %path.display(), "ledger lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release ledger lock");
        }
    }
}
