//! Signed mint-pass reserve
//!
//! A trusted authority signs capability payloads off-ledger; holders present
//! them at mint time. Pass groups enforce global caps per token identifier
//! and per (token, project) pair, and record the consumer so a pass cannot
//! migrate between wallets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use tracing::debug;

use crate::error::{Error, Result};
use crate::reserve::{ApplyContext, ReserveApplication, ReserveMethod};
use crate::types::{Address, ProjectId, ReserveEntry};

/// Capability payload signed by the group authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassPayload {
    /// Token identifier scoping the pass
    pub token: String,
    /// Scope identifier (the project the pass is spent against)
    pub project: ProjectId,
    /// The wallet the pass is bound to
    pub address: Address,
}

/// A signed pass as presented by the caller: serialized payload plus the
/// authority's ed25519 signature over those exact bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintPass {
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl MintPass {
    /// Sign a payload with the group authority key.
    pub fn sign(authority: &Keypair, payload: &PassPayload) -> Result<Self> {
        let payload = serde_json::to_vec(payload)?;
        let signature = authority.sign_message(&payload);
        Ok(Self {
            payload,
            signature: signature.as_ref().to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Per-token consumption record inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRecord {
    pub minted: u64,
    /// Ledger time of the most recent consumption
    pub level_consumed: u64,
    pub consumer: Address,
}

/// A group of passes sharing an authority key and consumption caps.
pub struct MintPassGroup {
    authority: Address,
    max_per_token: u64,
    max_per_token_per_project: u64,
    tokens: HashMap<String, TokenRecord>,
    projects: HashMap<(String, ProjectId), u64>,
}

impl MintPassGroup {
    pub fn new(authority: Address, max_per_token: u64, max_per_token_per_project: u64) -> Self {
        Self {
            authority,
            max_per_token,
            max_per_token_per_project,
            tokens: HashMap::new(),
            projects: HashMap::new(),
        }
    }

    /// Update the caps (group authority only).
    pub fn set_constraints(
        &mut self,
        caller: Address,
        max_per_token: u64,
        max_per_token_per_project: u64,
    ) -> Result<()> {
        if caller != self.authority {
            return Err(Error::Unauthorized { role: "authority" });
        }
        self.max_per_token = max_per_token;
        self.max_per_token_per_project = max_per_token_per_project;
        Ok(())
    }

    pub fn max_per_token(&self) -> u64 {
        self.max_per_token
    }

    pub fn max_per_token_per_project(&self) -> u64 {
        self.max_per_token_per_project
    }

    /// Consumption record for a token identifier; fails until the first
    /// consumption happens.
    pub fn pass_consumption(&self, token: &str) -> Result<&TokenRecord> {
        self.tokens.get(token).ok_or(Error::PassNotConsumed)
    }

    /// Verify a pass for `sender` without consuming it: signature, recipient
    /// binding, both caps, and consumer stability.
    pub fn verify(&self, sender: Address, pass: &MintPass) -> Result<PassPayload> {
        let signature = Signature::try_from(pass.signature.as_slice())
            .map_err(|_| Error::PassInvalidSignature)?;
        if !signature.verify(self.authority.as_ref(), &pass.payload) {
            return Err(Error::PassInvalidSignature);
        }

        let payload: PassPayload = serde_json::from_slice(&pass.payload)?;
        if payload.address != sender {
            return Err(Error::PassWrongRecipient);
        }

        let minted = self.tokens.get(&payload.token).map_or(0, |r| r.minted);
        if minted + 1 > self.max_per_token {
            return Err(Error::PassMaxPerToken);
        }
        if let Some(record) = self.tokens.get(&payload.token) {
            if record.consumer != sender {
                return Err(Error::PassWrongRecipient);
            }
        }
        let per_project = self
            .projects
            .get(&(payload.token.clone(), payload.project))
            .copied()
            .unwrap_or(0);
        if per_project + 1 > self.max_per_token_per_project {
            return Err(Error::PassMaxPerProject);
        }
        Ok(payload)
    }

    /// Verify and consume a pass for `sender`.
    pub fn consume(&mut self, sender: Address, pass: &MintPass, now: u64) -> Result<()> {
        let payload = self.verify(sender, pass)?;

        let minted = self.tokens.get(&payload.token).map_or(0, |r| r.minted);
        let project_key = (payload.token.clone(), payload.project);
        let per_project = self.projects.get(&project_key).copied().unwrap_or(0);

        self.tokens.insert(
            payload.token.clone(),
            TokenRecord {
                minted: minted + 1,
                level_consumed: now,
                consumer: sender,
            },
        );
        self.projects.insert(project_key, per_project + 1);

        debug!(token = %payload.token, project = payload.project, "mint pass consumed");
        Ok(())
    }
}

/// Opaque reserve-entry data: points a project reserve at a pass group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub group: u64,
}

/// Reserve method backed by a registry of pass groups.
pub struct MintPassReserve {
    groups: HashMap<u64, MintPassGroup>,
}

impl MintPassReserve {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    pub fn with_group(mut self, id: u64, group: MintPassGroup) -> Self {
        self.groups.insert(id, group);
        self
    }

    pub fn group(&self, id: u64) -> Option<&MintPassGroup> {
        self.groups.get(&id)
    }
}

impl Default for MintPassReserve {
    fn default() -> Self {
        Self::new()
    }
}

impl ReserveMethod for MintPassReserve {
    fn is_valid(&self, entry: &ReserveEntry) -> Result<bool> {
        let group_ref: GroupRef = serde_json::from_slice(&entry.data)
            .map_err(|e| Error::InvalidReserveData(e.to_string()))?;
        Ok(self.groups.contains_key(&group_ref.group))
    }

    fn apply(&self, ctx: ApplyContext<'_>) -> Result<ReserveApplication> {
        if ctx.current_amount == 0 {
            return Err(Error::InvalidCurrentAmount);
        }

        let group_ref: GroupRef = serde_json::from_slice(ctx.entry_data)
            .map_err(|e| Error::InvalidReserveData(e.to_string()))?;
        let pass: MintPass = serde_json::from_slice(ctx.user_input)?;

        let group = self
            .groups
            .get(&group_ref.group)
            .ok_or_else(|| Error::InvalidReserveData(format!("unknown group {}", group_ref.group)))?;
        group.verify(ctx.sender, &pass)?;

        Ok(ReserveApplication {
            applied: true,
            new_data: ctx.entry_data.to_vec(),
        })
    }

    fn commit(&mut self, ctx: ApplyContext<'_>) -> Result<()> {
        let group_ref: GroupRef = serde_json::from_slice(ctx.entry_data)
            .map_err(|e| Error::InvalidReserveData(e.to_string()))?;
        let pass: MintPass = serde_json::from_slice(ctx.user_input)?;

        let group = self
            .groups
            .get_mut(&group_ref.group)
            .ok_or_else(|| Error::InvalidReserveData(format!("unknown group {}", group_ref.group)))?;
        group.consume(ctx.sender, &pass, ctx.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(holder: Address) -> PassPayload {
        PassPayload {
            token: "TOKEN1".into(),
            project: 1,
            address: holder,
        }
    }

    fn group(authority: &Keypair) -> MintPassGroup {
        MintPassGroup::new(authority.pubkey(), 10, 5)
    }

    #[test]
    fn test_consume_valid_pass() {
        let authority = Keypair::new();
        let holder = Address::new_unique();
        let mut g = group(&authority);

        let pass = MintPass::sign(&authority, &payload(holder)).unwrap();
        g.consume(holder, &pass, 1000).unwrap();

        let record = g.pass_consumption("TOKEN1").unwrap();
        assert_eq!(record.minted, 1);
        assert_eq!(record.level_consumed, 1000);
        assert_eq!(record.consumer, holder);
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let authority = Keypair::new();
        let impostor = Keypair::new();
        let holder = Address::new_unique();
        let mut g = group(&authority);

        let pass = MintPass::sign(&impostor, &payload(holder)).unwrap();
        assert!(matches!(
            g.consume(holder, &pass, 0),
            Err(Error::PassInvalidSignature)
        ));
    }

    #[test]
    fn test_pass_bound_to_recipient() {
        let authority = Keypair::new();
        let holder = Address::new_unique();
        let mut g = group(&authority);

        let pass = MintPass::sign(&authority, &payload(holder)).unwrap();
        assert!(matches!(
            g.consume(Address::new_unique(), &pass, 0),
            Err(Error::PassWrongRecipient)
        ));
    }

    #[test]
    fn test_per_project_cap() {
        let authority = Keypair::new();
        let holder = Address::new_unique();
        let mut g = MintPassGroup::new(authority.pubkey(), 10, 2);

        let pass = MintPass::sign(&authority, &payload(holder)).unwrap();
        g.consume(holder, &pass, 0).unwrap();
        g.consume(holder, &pass, 1).unwrap();
        assert!(matches!(
            g.consume(holder, &pass, 2),
            Err(Error::PassMaxPerProject)
        ));
    }

    #[test]
    fn test_per_token_cap() {
        let authority = Keypair::new();
        let holder = Address::new_unique();
        let mut g = MintPassGroup::new(authority.pubkey(), 2, 5);

        let pass = MintPass::sign(&authority, &payload(holder)).unwrap();
        g.consume(holder, &pass, 0).unwrap();
        g.consume(holder, &pass, 1).unwrap();
        assert!(matches!(
            g.consume(holder, &pass, 2),
            Err(Error::PassMaxPerToken)
        ));
    }

    #[test]
    fn test_consumption_query_before_consume_fails() {
        let authority = Keypair::new();
        let g = group(&authority);
        assert!(matches!(
            g.pass_consumption("TOKEN1"),
            Err(Error::PassNotConsumed)
        ));
    }

    #[test]
    fn test_set_constraints_authority_only() {
        let authority = Keypair::new();
        let mut g = group(&authority);
        assert!(g.set_constraints(Address::new_unique(), 20, 10).is_err());
        g.set_constraints(authority.pubkey(), 20, 10).unwrap();
        assert_eq!(g.max_per_token(), 20);
        assert_eq!(g.max_per_token_per_project(), 10);
    }

    #[test]
    fn test_reserve_method_apply_then_commit() {
        let authority = Keypair::new();
        let holder = Address::new_unique();
        let mut method =
            MintPassReserve::new().with_group(7, MintPassGroup::new(authority.pubkey(), 10, 5));

        let entry_data = serde_json::to_vec(&GroupRef { group: 7 }).unwrap();
        let pass = MintPass::sign(&authority, &payload(holder)).unwrap();
        let input = pass.to_bytes().unwrap();
        let ctx = ApplyContext {
            entry_data: &entry_data,
            user_input: &input,
            current_amount: 3,
            sender: holder,
            now: 50,
        };

        // Apply alone leaves the group untouched
        let app = method.apply(ctx).unwrap();
        assert!(app.applied);
        assert_eq!(app.new_data, entry_data);
        assert!(matches!(
            method.group(7).unwrap().pass_consumption("TOKEN1"),
            Err(Error::PassNotConsumed)
        ));

        method.commit(ctx).unwrap();
        let record = method.group(7).unwrap().pass_consumption("TOKEN1").unwrap();
        assert_eq!(record.minted, 1);
        assert_eq!(record.level_consumed, 50);
    }

    #[test]
    fn test_reserve_method_zero_amount() {
        let authority = Keypair::new();
        let method =
            MintPassReserve::new().with_group(7, MintPassGroup::new(authority.pubkey(), 10, 5));

        let entry_data = serde_json::to_vec(&GroupRef { group: 7 }).unwrap();
        let err = method
            .apply(ApplyContext {
                entry_data: &entry_data,
                user_input: &[],
                current_amount: 0,
                sender: Address::new_unique(),
                now: 0,
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCurrentAmount));
    }

    #[test]
    fn test_is_valid_checks_group_exists() {
        let authority = Keypair::new();
        let method =
            MintPassReserve::new().with_group(7, MintPassGroup::new(authority.pubkey(), 10, 5));

        let entry = ReserveEntry {
            method_id: 2,
            amount: 1,
            data: serde_json::to_vec(&GroupRef { group: 7 }).unwrap(),
        };
        assert!(method.is_valid(&entry).unwrap());

        let entry = ReserveEntry {
            data: serde_json::to_vec(&GroupRef { group: 8 }).unwrap(),
            ..entry
        };
        assert!(!method.is_valid(&entry).unwrap());

        let entry = ReserveEntry {
            data: b"junk".to_vec(),
            ..entry
        };
        assert!(matches!(
            method.is_valid(&entry),
            Err(Error::InvalidReserveData(_))
        ));
    }
}
