use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::amount::Amount;

/// A value movement recorded on the ledger.
///
/// `request` carries the id of the intake request a disbursement answered,
/// which lets the desk detect an already-recorded request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Movement {
    pub description: String,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<u64>,
}

impl Movement {
    pub fn new(description: impl Into<String>, amount: Amount) -> Self {
        Self {
            description: description.into(),
            amount,
            request: None,
        }
    }

    pub fn for_request(mut self, request: u64) -> Self {
        self.request = Some(request);
        self
    }
}

/// The notarized content of a block.
///
/// Plain strings deserialize as [`Payload::Text`]; objects as
/// [`Payload::Movement`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Movement(Movement),
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Canonical string fed to the block digest.
    ///
    /// Each variant carries its own prefix so a text block can never hash
    /// like a movement. Text renders as `text:` followed by the string. A
    /// movement renders as `movement:` followed by compact JSON with keys in
    /// the fixed order `description`, `amount`, `request` (the last omitted
    /// when absent). This rendering is part of the hash format.
    pub fn canonical(&self) -> String {
        match self {
            Self::Text(text) => format!("text:{text}"),
            Self::Movement(m) => {
                let mut out = format!(
                    "movement:{{\"description\":{},\"amount\":\"{}\"",
                    Value::String(m.description.clone()),
                    m.amount
                );
                if let Some(request) = m.request {
                    out.push_str(&format!(",\"request\":{request}"));
                }
                out.push('}');
                out
            }
        }
    }

    /// Human-readable description for listings.
    pub fn description(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Movement(m) => &m.description,
        }
    }

    pub fn amount(&self) -> Option<Amount> {
        match self {
            Self::Text(_) => None,
            Self::Movement(m) => Some(m.amount),
        }
    }

    pub fn as_movement(&self) -> Option<&Movement> {
        match self {
            Self::Movement(m) => Some(m),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Movement(m) => write!(f, "{} {}", m.description, m.amount),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Movement> for Payload {
    fn from(movement: Movement) -> Self {
        Self::Movement(movement)
    }
}
