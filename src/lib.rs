//! Generative Token Issuance Engine
//!
//! Orchestrates generative-art edition campaigns: pluggable pricing and
//! early-access reserve strategies, commit-reveal per-token randomness, and a
//! Harberger-taxed market of deferred mint tickets.

pub mod config;
pub mod engine;
pub mod error;
pub mod issuer;
pub mod oracle;
pub mod pricing;
pub mod reserve;
pub mod ticket;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use engine::{Clock, IssuanceEngine, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use issuer::Issuer;
pub use types::{Address, Payout, PayoutKind, ProjectId, TicketId, TokenId};
