//! Shared ledger types
//!
//! Amounts are in indivisible base units. Percentages are basis points
//! (100 bps = 1%). Ledger time is unix seconds, always passed explicitly.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Account identity on the ledger
pub type Address = Pubkey;

pub type ProjectId = u64;
pub type TokenId = u64;
pub type TicketId = u64;

/// Basis point denominator (10000 bps = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Share of `amount` expressed in basis points, rounded down.
pub fn bps_share(amount: u64, bps: u16) -> u64 {
    ((amount as u128 * bps as u128) / BPS_DENOMINATOR as u128) as u64
}

/// Revenue split: recipient plus a percentage in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub receiver: Address,
    pub percent_bps: u16,
}

/// Early-access allocation attached to a project.
///
/// `amount` only moves toward zero, one unit per successful application.
/// `data` is an opaque strategy-specific payload owned by the reserve method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveEntry {
    pub method_id: u8,
    pub amount: u64,
    pub data: Vec<u8>,
}

/// Pricing reference stored on a project.
///
/// `locked_price` is frozen at project creation when `lock_for_reserves` is
/// set, and is the price reserve holders pay regardless of elapsed time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRef {
    pub strategy_id: u8,
    pub details: Vec<u8>,
    pub lock_for_reserves: bool,
    pub locked_price: Option<u64>,
}

/// Destination of an outbound value transfer.
///
/// Operations never move value themselves: they finish all state writes and
/// return the transfers for the embedding layer to execute
/// (checks-effects-interactions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub to: Address,
    pub amount: u64,
    pub kind: PayoutKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutKind {
    /// Platform fee and rounding remainders
    Treasury,
    /// Primary sale proceeds
    Primary,
    /// Referrer share of the platform fee
    Referrer,
    /// Sale price paid to a ticket's previous owner
    Seller,
    /// Consumed Harberger tax
    Tax,
    /// Unconsumed tax escrow returned to its owner
    EscrowRelease,
    /// Excess payment returned to the caller
    Refund,
}

impl Payout {
    pub fn new(to: Address, amount: u64, kind: PayoutKind) -> Self {
        Self { to, amount, kind }
    }
}

/// Drop zero-amount entries; rounding regularly produces them.
pub fn compact_payouts(payouts: Vec<Payout>) -> Vec<Payout> {
    payouts.into_iter().filter(|p| p.amount > 0).collect()
}
