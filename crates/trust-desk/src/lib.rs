//! The trust desk: everything around the ledger that an operator touches.
//!
//! - [`DeskState`]: opening balance, alert level and news, in a JSON file
//! - [`RequestSource`]: intake requests ([`JsonInbox`], [`MemoryInbox`])
//! - [`Desk`]: disbursements, reconciliation, and portal rendering
//! - [`site`]: static HTML for the portal and block explorer

pub mod config;
pub mod desk;
pub mod error;
pub mod requests;
pub mod site;
pub mod state;

pub use config::{DeskConfig, SiteConfig};
pub use desk::{Desk, Disbursement};
pub use error::DeskError;
pub use requests::{JsonInbox, MemoryInbox, Request, RequestSource, RequestState};
pub use state::{DeskState, NewsItem};
