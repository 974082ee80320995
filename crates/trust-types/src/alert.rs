use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Desk alert level shown in the portal status bar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    /// Stable.
    #[default]
    Green,
    /// Caution.
    Amber,
    /// Lockdown.
    Red,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 3] = [Self::Green, Self::Amber, Self::Red];

    /// Status bar colour.
    pub fn color(self) -> &'static str {
        match self {
            Self::Green => "#00ff00",
            Self::Amber => "#ffbf00",
            Self::Red => "#ff0000",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Amber => "AMBER",
            Self::Red => "RED",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AlertLevel {
    type Err = TypeError;

    /// Accepts names in any case, or the menu numbers `1`-`3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GREEN" | "1" => Ok(Self::Green),
            "AMBER" | "2" => Ok(Self::Amber),
            "RED" | "3" => Ok(Self::Red),
            _ => Err(TypeError::UnknownAlertLevel(s.to_string())),
        }
    }
}
