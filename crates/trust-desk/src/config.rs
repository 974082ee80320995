use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use trust_ledger::LedgerConfig;

/// Bounds on how many ledger entries the portal lists.
pub const HISTORY_LIMIT_RANGE: (usize, usize) = (5, 10);

/// Configuration for the desk and the static portal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub ledger: LedgerConfig,
    /// JSON state file (opening balance, alert level, news).
    pub state_path: PathBuf,
    /// Local intake inbox read by [`crate::JsonInbox`].
    pub inbox_path: PathBuf,
    pub portal_path: PathBuf,
    pub explorer_path: PathBuf,
    /// Ledger entries listed on the portal; clamped to [`HISTORY_LIMIT_RANGE`].
    pub history_limit: usize,
    /// News items kept in the state file.
    pub news_limit: usize,
    pub site: SiteConfig,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            state_path: PathBuf::from("trust_data.json"),
            inbox_path: PathBuf::from("requests.json"),
            portal_path: PathBuf::from("index.html"),
            explorer_path: PathBuf::from("explorer.html"),
            history_limit: 10,
            news_limit: 3,
            site: SiteConfig::default(),
        }
    }
}

impl DeskConfig {
    pub fn effective_history_limit(&self) -> usize {
        let (min, max) = HISTORY_LIMIT_RANGE;
        self.history_limit.clamp(min, max)
    }
}

/// Static text baked into the rendered pages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub heading: String,
    pub steward: String,
    /// Target of the intake form; omitted from the page when unset.
    pub intake_url: Option<String>,
    /// Unit label shown next to amounts.
    pub unit: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "LITTLE FOOTSTEPS TRUST".to_string(),
            heading: "LITTLE FOOTSTEPS".to_string(),
            steward: "The Steward".to_string(),
            intake_url: None,
            unit: "BTC".to_string(),
        }
    }
}
