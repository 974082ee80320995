use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Genesis payload used when the operator configures none.
pub const DEFAULT_GENESIS_MESSAGE: &str = "GENESIS BLOCK: LITTLE FOOTSTEPS TRUST ESTABLISHED";

/// Flush/sync strategy for block appends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every append (safest).
    #[default]
    EveryWrite,
    /// Flush to the OS and rely on page-cache write-back.
    OsDefault,
}

/// What `open_or_create` does with a chain that fails verification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityPolicy {
    /// Refuse to open.
    #[default]
    Reject,
    /// Open for inspection only; every append is refused.
    ReadOnly,
}

/// Configuration for a ledger handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Path of the JSON Lines block log.
    pub path: PathBuf,
    /// Text of the genesis block written on first use.
    pub genesis_message: String,
    pub sync_mode: SyncMode,
    pub integrity_policy: IntegrityPolicy,
    /// Upper bound on the canonical payload size, in bytes.
    pub max_payload_len: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ledger.jsonl"),
            genesis_message: DEFAULT_GENESIS_MESSAGE.to_string(),
            sync_mode: SyncMode::default(),
            integrity_policy: IntegrityPolicy::default(),
            max_payload_len: 4096,
        }
    }
}

impl LedgerConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Sibling lock file owned by the single writer.
    pub fn lock_path(&self) -> PathBuf {
        sibling(&self.path, "lock")
    }
}

/// `<path>.<suffix>` next to `path`.
pub(crate) fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = LedgerConfig::default();
        assert_eq!(c.path, PathBuf::from("ledger.jsonl"));
        assert_eq!(c.sync_mode, SyncMode::EveryWrite);
        assert_eq!(c.integrity_policy, IntegrityPolicy::Reject);
        assert_eq!(c.genesis_message, DEFAULT_GENESIS_MESSAGE);
    }

    #[test]
    fn lock_path_is_sibling() {
        let c = LedgerConfig::at("/var/trust/ledger.jsonl");
        assert_eq!(c.lock_path(), PathBuf::from("/var/trust/ledger.jsonl.lock"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let c: LedgerConfig = serde_json::from_str(r#"{"integrity_policy":"read_only"}"#).unwrap();
        assert_eq!(c.integrity_policy, IntegrityPolicy::ReadOnly);
        assert_eq!(c.max_payload_len, 4096);
    }
}
