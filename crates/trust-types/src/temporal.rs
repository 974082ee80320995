use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Capture time of a block, kept as the exact string that was hashed.
///
/// New timestamps are rendered as RFC 3339 UTC with microsecond precision
/// (`2026-10-16T09:30:00.123456Z`), which sorts lexicographically in time
/// order. The stored string is never re-rendered: hashing always uses
/// [`Timestamp::as_str`], so a loaded block verifies byte-for-byte.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

impl Timestamp {
    /// Fixed capture time of every genesis block.
    pub const GENESIS: &'static str = "1970-01-01T00:00:00.000000Z";

    /// Capture the current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// The deterministic genesis timestamp.
    pub fn genesis() -> Self {
        Self(Self::GENESIS.to_string())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Parse and validate an RFC 3339 string, keeping it verbatim.
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(value).map_err(|e| TypeError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        // Construction guarantees the string parses.
        DateTime::parse_from_rfc3339(&self.0)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default()
    }

    /// Minute-resolution rendering used on the portal (`2026-10-16 09:30 UTC`).
    pub fn display_minutes(&self) -> String {
        self.to_datetime().format("%Y-%m-%d %H:%M UTC").to_string()
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
