//! Foundation types for the trust ledger.
//!
//! Every other trust crate depends on `trust-types`.
//!
//! # Key Types
//!
//! - [`BlockHash`] — 32-byte block digest, hex-encoded on the wire
//! - [`Timestamp`] — ISO-8601 UTC capture time, stored verbatim
//! - [`Amount`] — signed fixed-point value with eight decimal places
//! - [`Payload`] — the notarized content of a block (text or [`Movement`])
//! - [`AlertLevel`] — desk status shown on the portal

pub mod alert;
pub mod amount;
pub mod error;
pub mod hash;
pub mod payload;
pub mod temporal;

pub use alert::AlertLevel;
pub use amount::Amount;
pub use error::TypeError;
pub use hash::BlockHash;
pub use payload::{Movement, Payload};
pub use temporal::Timestamp;
