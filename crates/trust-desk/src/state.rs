use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use trust_ledger::write_atomic;
use trust_types::{AlertLevel, Amount, Movement};

use crate::error::{DeskError, Result};

/// One communiqué shown on the portal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub msg: String,
}

/// Mutable desk state kept beside the ledger.
///
/// The balance is not stored here: it is the opening balance plus every
/// movement on the chain (see [`DeskState::balance`]).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskState {
    pub opening_balance: Amount,
    #[serde(alias = "defcon")]
    pub alert: AlertLevel,
    /// Newest first.
    pub news: Vec<NewsItem>,
}

impl DeskState {
    /// Read the state file; a missing file yields the default state.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no desk state yet; using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(DeskError::io(path)(e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| DeskError::State {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| DeskError::State {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        write_atomic(path, &json)?;
        debug!(path = %path.display(), "desk state saved");
        Ok(())
    }

    /// Prepend a news item dated `at`, keeping at most `limit` items.
    ///
    /// Blank messages are ignored; returns whether anything changed.
    pub fn post_news(&mut self, msg: &str, at: DateTime<Utc>, limit: usize) -> bool {
        let msg = msg.trim();
        if msg.is_empty() {
            return false;
        }
        self.news.insert(
            0,
            NewsItem {
                date: at.format("%Y-%m-%d").to_string(),
                msg: msg.to_string(),
            },
        );
        self.news.truncate(limit);
        true
    }

    /// Returns whether the level actually changed.
    pub fn set_alert(&mut self, level: AlertLevel) -> bool {
        let changed = self.alert != level;
        self.alert = level;
        changed
    }

    /// Opening balance plus the signed sum of `movements`.
    pub fn balance<'a>(&self, movements: impl IntoIterator<Item = &'a Movement>) -> Result<Amount> {
        movements
            .into_iter()
            .try_fold(self.opening_balance, |acc, m| acc.checked_add(m.amount))
            .ok_or(DeskError::BalanceOverflow)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = DeskState::load(&dir.path().join("state.json")).unwrap();
        assert_eq!(state, DeskState::default());
        assert_eq!(state.alert, AlertLevel::Green);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut state = DeskState {
            opening_balance: "1798306".parse().unwrap(),
            ..DeskState::default()
        };
        state.set_alert(AlertLevel::Amber);
        state.post_news("BRIDGE ACTIVE", day(1), 3);
        state.save(&path).unwrap();
        assert_eq!(DeskState::load(&path).unwrap(), state);
    }

    #[test]
    fn reads_legacy_defcon_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"defcon":"RED","news":[{"date":"2026-01-01","msg":"hi"}]}"#).unwrap();
        let state = DeskState::load(&path).unwrap();
        assert_eq!(state.alert, AlertLevel::Red);
        assert_eq!(state.news.len(), 1);
    }

    #[test]
    fn malformed_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(DeskState::load(&path), Err(DeskError::State { .. })));
    }

    #[test]
    fn news_is_newest_first_and_capped() {
        let mut state = DeskState::default();
        for (i, msg) in ["one", "two", "three", "four"].iter().enumerate() {
            assert!(state.post_news(msg, day(i as u32 + 1), 3));
        }
        let msgs: Vec<&str> = state.news.iter().map(|n| n.msg.as_str()).collect();
        assert_eq!(msgs, ["four", "three", "two"]);
        assert_eq!(state.news[0].date, "2026-10-04");
    }

    #[test]
    fn blank_news_is_ignored() {
        let mut state = DeskState::default();
        assert!(!state.post_news("   ", day(1), 3));
        assert!(state.news.is_empty());
    }

    #[test]
    fn set_alert_reports_change() {
        let mut state = DeskState::default();
        assert!(!state.set_alert(AlertLevel::Green));
        assert!(state.set_alert(AlertLevel::Red));
    }

    #[test]
    fn balance_sums_movements() {
        let state = DeskState {
            opening_balance: "10".parse().unwrap(),
            ..DeskState::default()
        };
        let movements = [
            Movement::new("INFLOW", "50".parse().unwrap()),
            Movement::new("SHELTER #4", "-0.15".parse().unwrap()),
        ];
        assert_eq!(state.balance(&movements).unwrap().to_string(), "+59.85000000");
    }
}
