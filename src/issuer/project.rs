//! Project records and operation inputs

use crate::types::{Address, Payout, PricingRef, ProjectId, ReserveEntry, Split, TicketId, TokenId};

/// A generative-art edition campaign.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub author: Address,
    pub supply: u64,
    /// Remaining mintable balance; reaching zero is permanent
    pub balance: u64,
    pub iterations: u64,
    pub pricing: PricingRef,
    pub reserves: Vec<ReserveEntry>,
    pub primary_split: Split,
    pub royalties_split: Split,
    pub tags: Vec<u16>,
    /// Cleared only through the moderation entry point
    pub enabled: bool,
    pub has_tickets: bool,
    /// Opens for minting at this time (author lock window)
    pub available_at: u64,
    pub created_at: u64,
    /// Provenance record id resolved through the codex collaborator
    pub codex_id: u64,
    pub metadata: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectState {
    /// Registered but not yet open for minting
    Created,
    Open,
    /// Balance reached zero; terminal
    Exhausted,
}

impl Project {
    pub fn state(&self, now: u64) -> ProjectState {
        if self.balance == 0 {
            ProjectState::Exhausted
        } else if now >= self.available_at {
            ProjectState::Open
        } else {
            ProjectState::Created
        }
    }

    /// Supply still backing reserve entries. Saturating; a wrapped sum
    /// would understate the reservation.
    pub fn total_reserved(&self) -> u64 {
        self.reserves
            .iter()
            .fold(0u64, |acc, e| acc.saturating_add(e.amount))
    }
}

#[derive(Debug, Clone)]
pub struct PricingInput {
    pub strategy_id: u8,
    pub details: Vec<u8>,
    pub lock_for_reserves: bool,
}

#[derive(Debug, Clone)]
pub struct TicketSettings {
    pub gracing_period_days: u32,
    pub metadata: String,
}

#[derive(Debug, Clone)]
pub struct CreateProjectInput {
    pub project_id: ProjectId,
    pub amount: u64,
    pub pricing: PricingInput,
    pub reserves: Vec<ReserveEntry>,
    pub primary_split: Split,
    pub royalties_split: Split,
    pub enabled: bool,
    pub tags: Vec<u16>,
    pub metadata: String,
    pub codex_input: Vec<u8>,
    /// Present when buyers may defer finalization into a ticket
    pub ticket_settings: Option<TicketSettings>,
}

/// Caller-selected reserve to spend on this mint.
#[derive(Debug, Clone)]
pub struct ReserveInput {
    pub method_id: u8,
    pub input: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MintInput {
    pub project_id: ProjectId,
    pub recipient: Address,
    pub payment: u64,
    pub referrer: Option<Address>,
    pub reserve_input: Option<ReserveInput>,
    /// Mint a deferred ticket instead of finalizing the token
    pub create_ticket: bool,
    pub input_bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MintWithTicketInput {
    pub project_id: ProjectId,
    pub ticket_id: TicketId,
    pub recipient: Address,
    pub input_bytes: Vec<u8>,
}

/// What a mint produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintedAsset {
    Token(TokenId),
    Ticket(TicketId),
}

#[derive(Debug, Clone)]
pub struct MintOutcome {
    pub asset: MintedAsset,
    /// Resolved unit price charged for this mint
    pub price: u64,
    pub payouts: Vec<Payout>,
}
