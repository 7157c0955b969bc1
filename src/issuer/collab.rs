//! External collaborator seams
//!
//! Ownership/transfer of final tokens, moderation internals, and provenance
//! storage live outside this engine; the orchestrator reaches them through
//! these traits, injected at construction.

use std::collections::HashSet;

use crate::error::Result;
use crate::types::{Address, ProjectId, TokenId};

/// Eligibility oracle consulted before any mint or project creation.
pub trait MintGate: Send + Sync {
    fn is_allowed(&self, caller: Address, now: u64) -> Result<()>;

    /// Verified authors skip the project lock window.
    fn is_verified(&self, _user: Address) -> bool {
        false
    }
}

/// Provenance registry: append-only record of a project's source data.
pub trait Codex: Send + Sync {
    fn resolve_or_create(&mut self, author: Address, input: &[u8]) -> Result<u64>;
}

/// Final token data handed to the external token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalToken {
    pub project: ProjectId,
    pub token_id: TokenId,
    pub owner: Address,
    pub input_bytes: Vec<u8>,
}

/// Final-token minter.
pub trait TokenMinter: Send + Sync {
    fn mint(&mut self, token: FinalToken) -> Result<()>;
}

/// Gate that admits everyone, with an optional verified set.
#[derive(Debug, Default)]
pub struct AllowAllGate {
    verified: HashSet<Address>,
}

impl AllowAllGate {
    pub fn with_verified(mut self, user: Address) -> Self {
        self.verified.insert(user);
        self
    }
}

impl MintGate for AllowAllGate {
    fn is_allowed(&self, _caller: Address, _now: u64) -> Result<()> {
        Ok(())
    }

    fn is_verified(&self, user: Address) -> bool {
        self.verified.contains(&user)
    }
}

/// Codex handing out sequential record ids.
#[derive(Debug, Default)]
pub struct SequentialCodex {
    next: u64,
}

impl Codex for SequentialCodex {
    fn resolve_or_create(&mut self, _author: Address, _input: &[u8]) -> Result<u64> {
        let id = self.next;
        self.next += 1;
        Ok(id)
    }
}

/// Minter that records every finalized token; the in-process stand-in for
/// the external token contract.
#[derive(Debug, Default)]
pub struct CollectingMinter {
    pub minted: Vec<FinalToken>,
}

impl TokenMinter for CollectingMinter {
    fn mint(&mut self, token: FinalToken) -> Result<()> {
        self.minted.push(token);
        Ok(())
    }
}
