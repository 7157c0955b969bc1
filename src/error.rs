//! Error types for the issuance engine

use thiserror::Error;

use crate::types::{ProjectId, TicketId};

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the issuance engine.
///
/// Every failure is a categorical, all-or-nothing rejection: no operation
/// leaves partial state behind when it returns one of these.
#[derive(Error, Debug)]
pub enum Error {
    // Project lifecycle errors
    #[error("project {0} already exists")]
    ProjectExists(ProjectId),

    #[error("project {0} does not exist")]
    ProjectNotFound(ProjectId),

    #[error("edition amount must be positive")]
    InvalidAmount,

    #[error("combined split percentages exceed 10000 bps: {total}")]
    SplitsExceedDenominator { total: u32 },

    #[error("project is disabled")]
    ProjectDisabled,

    #[error("project is locked until {available_at}")]
    ProjectLocked { available_at: u64 },

    #[error("no remaining balance")]
    SupplyExhausted,

    #[error("reserve amounts exceed total supply")]
    ReservesExceedSupply,

    // Pricing errors
    #[error("pricing strategy {0} is not registered")]
    PricingMethodNotFound(u8),

    #[error("pricing strategy {0} is disabled")]
    PricingMethodDisabled(u8),

    #[error("sale not opened yet (opens at {opens_at})")]
    NotOpenedYet { opens_at: u64 },

    #[error("dutch auction levels must strictly decrement")]
    PricesMustDecrement,

    #[error("decrement duration {got}s is below the minimum {min}s")]
    DecrementTooShort { got: u64, min: u64 },

    #[error("invalid price")]
    InvalidPrice,

    // Reserve errors
    #[error("reserve method {0} is not registered")]
    ReserveMethodNotFound(u8),

    #[error("reserve method {0} is disabled")]
    ReserveMethodDisabled(u8),

    #[error("invalid reserve data: {0}")]
    InvalidReserveData(String),

    #[error("remaining reserve allocation is exhausted")]
    InvalidCurrentAmount,

    // Mint pass errors
    #[error("mint pass signature is invalid")]
    PassInvalidSignature,

    #[error("mint pass is bound to a different recipient")]
    PassWrongRecipient,

    #[error("mint pass group cap reached for token")]
    PassMaxPerToken,

    #[error("mint pass group cap reached for token within project")]
    PassMaxPerProject,

    #[error("mint pass has not been consumed")]
    PassNotConsumed,

    // Randomness oracle errors
    #[error("seed already requested for this token")]
    SeedAlreadyRequested,

    #[error("seed was never requested for this token")]
    SeedNotRequested,

    #[error("seed already revealed for this token")]
    SeedAlreadyRevealed,

    #[error("reveal batch of {requested} exceeds remaining chain depth {remaining}")]
    RevealDepthExceeded { requested: u64, remaining: u64 },

    #[error("preimage does not walk back to the stored commitment")]
    CommitmentMismatch,

    // Ticket market errors
    #[error("ticket {0} does not exist")]
    TicketNotFound(TicketId),

    #[error("still inside the gracing period (until {until})")]
    GracingPeriod { until: u64 },

    #[error("gracing period must be at least 1 day")]
    GracingUnder1,

    #[error("price is below the minimum of {min}")]
    PriceBelowMinPrice { min: u64 },

    #[error("tax coverage must be at least 1 day")]
    MinCoverage,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("payment of {sent} is under the required {required}")]
    AmountUnderPrice { required: u64, sent: u64 },

    #[error("ticket belongs to a different project")]
    WrongProject,

    #[error("project does not issue tickets")]
    TicketsNotEnabled,

    // Authorization errors
    #[error("caller lacks the {role} role")]
    Unauthorized { role: &'static str },

    #[error("caller is not allowed to mint: {0}")]
    MintNotAllowed(String),

    // Payload decoding errors
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl Error {
    /// Timing failures: the caller must retry later, nothing was consumed.
    pub fn is_timing(&self) -> bool {
        matches!(
            self,
            Error::NotOpenedYet { .. }
                | Error::GracingPeriod { .. }
                | Error::ProjectLocked { .. }
        )
    }

    /// Resource exhaustion: retrying with identical parameters cannot succeed.
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            Error::SupplyExhausted
                | Error::InvalidCurrentAmount
                | Error::InsufficientBalance
                | Error::RevealDepthExceeded { .. }
        )
    }
}

// Conversion from serde_json errors (opaque strategy payload decoding)
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedPayload(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_classification() {
        assert!(Error::NotOpenedYet { opens_at: 10 }.is_timing());
        assert!(Error::GracingPeriod { until: 10 }.is_timing());
        assert!(!Error::SupplyExhausted.is_timing());
    }

    #[test]
    fn test_exhaustion_classification() {
        assert!(Error::SupplyExhausted.is_exhaustion());
        assert!(Error::InsufficientBalance.is_exhaustion());
        assert!(!Error::PassInvalidSignature.is_exhaustion());
    }
}
