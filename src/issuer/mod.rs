//! Project orchestrator
//!
//! Creates projects, resolves price and reserve strategies on each mint,
//! requests per-token randomness, and defers to the ticket market when a
//! buyer wants a transferable mint right instead of an immediate token.
//!
//! Every operation is an atomic transition: all validation and internal
//! state writes happen before anything external (the final-token minter) is
//! touched, and returned payouts are executed by the embedding layer.

pub mod collab;
pub mod project;

use std::collections::{HashMap, HashSet};

use anyhow::Context;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::oracle::{OracleSetup, RandomnessOracle, SeedRecord, TokenKey};
use crate::pricing::{PricingResolver, PricingStrategy};
use crate::reserve::{ApplyContext, ReserveMethod, ReserveResolver};
use crate::ticket::TicketMarket;
use crate::types::{
    bps_share, compact_payouts, Address, Payout, PayoutKind, PricingRef, ProjectId, Split,
    TokenId, BPS_DENOMINATOR,
};

pub use collab::{
    AllowAllGate, Codex, CollectingMinter, FinalToken, MintGate, SequentialCodex, TokenMinter,
};
pub use project::{
    CreateProjectInput, MintInput, MintOutcome, MintWithTicketInput, MintedAsset, PricingInput,
    Project, ProjectState, ReserveInput, TicketSettings,
};

pub struct Issuer {
    admin: Address,
    /// The orchestrator's own ledger identity; holds the oracle issuer role
    identity: Address,
    treasury: Address,
    platform_fee_bps: u16,
    referrer_share_bps: u16,
    lock_duration: u64,
    projects: HashMap<ProjectId, Project>,
    next_token: TokenId,
    moderators: HashSet<Address>,
    pricing: PricingResolver,
    reserves: ReserveResolver,
    oracle: RandomnessOracle,
    tickets: TicketMarket,
    gate: Box<dyn MintGate>,
    codex: Box<dyn Codex>,
    minter: Box<dyn TokenMinter>,
}

impl Issuer {
    pub fn new(
        config: &Config,
        admin: Address,
        oracle_setup: OracleSetup,
        gate: Box<dyn MintGate>,
        codex: Box<dyn Codex>,
        minter: Box<dyn TokenMinter>,
    ) -> anyhow::Result<Self> {
        let treasury = config.treasury_address()?;
        let identity = Address::new_unique();
        let mut oracle = RandomnessOracle::new(
            admin,
            oracle_setup.commitment,
            oracle_setup.salt,
            oracle_setup.depth,
        );
        oracle
            .grant_issuer(admin, identity)
            .context("granting the orchestrator its oracle issuer role")?;

        Ok(Self {
            admin,
            identity,
            treasury,
            platform_fee_bps: config.fees.platform_fee_bps,
            referrer_share_bps: config.fees.referrer_share_bps,
            lock_duration: config.issuance.lock_duration_secs,
            projects: HashMap::new(),
            next_token: 0,
            moderators: HashSet::new(),
            pricing: PricingResolver::new(admin),
            reserves: ReserveResolver::new(admin),
            oracle,
            tickets: TicketMarket::new(&config.ticket, treasury),
            gate,
            codex,
            minter,
        })
    }

    // ---- administration ----------------------------------------------------

    pub fn register_pricing_strategy(
        &mut self,
        caller: Address,
        id: u8,
        strategy: Box<dyn PricingStrategy>,
        enabled: bool,
    ) -> Result<()> {
        self.pricing.register(caller, id, strategy, enabled)
    }

    pub fn set_pricing_enabled(&mut self, caller: Address, id: u8, enabled: bool) -> Result<()> {
        self.pricing.set_enabled(caller, id, enabled)
    }

    pub fn register_reserve_method(
        &mut self,
        caller: Address,
        id: u8,
        method: Box<dyn ReserveMethod>,
        enabled: bool,
    ) -> Result<()> {
        self.reserves.register(caller, id, method, enabled)
    }

    pub fn set_reserve_enabled(&mut self, caller: Address, id: u8, enabled: bool) -> Result<()> {
        self.reserves.set_enabled(caller, id, enabled)
    }

    pub fn add_moderator(&mut self, caller: Address, moderator: Address) -> Result<()> {
        if caller != self.admin {
            return Err(Error::Unauthorized { role: "admin" });
        }
        self.moderators.insert(moderator);
        Ok(())
    }

    /// Moderation switch: blocks minting regardless of balance.
    pub fn set_enabled(&mut self, caller: Address, project: ProjectId, enabled: bool) -> Result<()> {
        if !self.moderators.contains(&caller) {
            return Err(Error::Unauthorized { role: "moderator" });
        }
        let project = self
            .projects
            .get_mut(&project)
            .ok_or(Error::ProjectNotFound(project))?;
        project.enabled = enabled;
        info!(project = project.id, enabled, "project moderation flag set");
        Ok(())
    }

    pub fn grant_reveal_authority(&mut self, caller: Address, grantee: Address) -> Result<()> {
        self.oracle.grant_authority(caller, grantee)
    }

    // ---- project lifecycle -------------------------------------------------

    /// Register a new project. One-time per project id.
    pub fn create_project(
        &mut self,
        author: Address,
        input: CreateProjectInput,
        now: u64,
    ) -> Result<()> {
        self.gate.is_allowed(author, now)?;

        if input.amount == 0 {
            return Err(Error::InvalidAmount);
        }
        let total_bps =
            input.primary_split.percent_bps as u32 + input.royalties_split.percent_bps as u32;
        if total_bps as u64 > BPS_DENOMINATOR {
            return Err(Error::SplitsExceedDenominator { total: total_bps });
        }
        if self.projects.contains_key(&input.project_id) {
            return Err(Error::ProjectExists(input.project_id));
        }

        let mut pricing = PricingRef {
            strategy_id: input.pricing.strategy_id,
            details: input.pricing.details,
            lock_for_reserves: input.pricing.lock_for_reserves,
            locked_price: None,
        };
        self.pricing.validate(&pricing, now)?;
        if pricing.lock_for_reserves {
            pricing.locked_price = Some(self.pricing.lock_price(&pricing)?);
        }

        // Author-supplied amounts; sum wide so they cannot overflow
        let mut total_reserved: u128 = 0;
        for entry in &input.reserves {
            if !self.reserves.is_valid(entry)? {
                return Err(Error::InvalidReserveData(
                    "declared amount is not backed by the reserve state".into(),
                ));
            }
            total_reserved += entry.amount as u128;
        }
        if total_reserved > input.amount as u128 {
            return Err(Error::ReservesExceedSupply);
        }

        let codex_id = self.codex.resolve_or_create(author, &input.codex_input)?;

        let has_tickets = input.ticket_settings.is_some();
        if let Some(settings) = input.ticket_settings {
            self.tickets.create_project(
                input.project_id,
                settings.gracing_period_days,
                settings.metadata,
            )?;
        }

        // Unverified authors wait out the lock window
        let available_at = if self.gate.is_verified(author) {
            now
        } else {
            now + self.lock_duration
        };

        let project = Project {
            id: input.project_id,
            author,
            supply: input.amount,
            balance: input.amount,
            iterations: 0,
            pricing,
            reserves: input.reserves,
            primary_split: input.primary_split,
            royalties_split: input.royalties_split,
            tags: input.tags,
            enabled: input.enabled,
            has_tickets,
            available_at,
            created_at: now,
            codex_id,
            metadata: input.metadata,
        };
        info!(
            project = project.id,
            author = %project.author,
            supply = project.supply,
            "project created"
        );
        self.projects.insert(project.id, project);
        Ok(())
    }

    // ---- minting -----------------------------------------------------------

    /// Mint one iteration: resolve the price, optionally consume a reserve,
    /// request a seed, and either finalize the token or create a ticket.
    pub fn mint(&mut self, caller: Address, input: MintInput, now: u64) -> Result<MintOutcome> {
        let project = self
            .projects
            .get(&input.project_id)
            .ok_or(Error::ProjectNotFound(input.project_id))?;
        if !project.enabled {
            return Err(Error::ProjectDisabled);
        }
        if now < project.available_at {
            return Err(Error::ProjectLocked {
                available_at: project.available_at,
            });
        }
        if project.balance == 0 {
            return Err(Error::SupplyExhausted);
        }
        if input.create_ticket && !project.has_tickets {
            return Err(Error::TicketsNotEnabled);
        }
        self.gate.is_allowed(caller, now)?;

        let mut price = self.pricing.price_at(&project.pricing, now)?;

        // Reserve application: effect-free check here; the method state is
        // committed only after every remaining precondition has passed. On
        // success the entry shrinks by one and, with a locked pricing, the
        // frozen price applies.
        let mut applied: Option<(usize, Vec<u8>)> = None;
        if let Some(reserve_input) = &input.reserve_input {
            let idx = project
                .reserves
                .iter()
                .position(|e| e.method_id == reserve_input.method_id && e.amount > 0)
                .ok_or(Error::InvalidCurrentAmount)?;
            let entry = &project.reserves[idx];
            let application = self.reserves.apply(
                entry.method_id,
                ApplyContext {
                    entry_data: &entry.data,
                    user_input: &reserve_input.input,
                    current_amount: entry.amount,
                    sender: caller,
                    now,
                },
            )?;
            if application.applied {
                if let (true, Some(locked)) =
                    (project.pricing.lock_for_reserves, project.pricing.locked_price)
                {
                    price = locked;
                }
                applied = Some((idx, application.new_data));
            }
        }

        // Standard mints cannot eat into supply still backing reserves
        if applied.is_none() && project.balance <= project.total_reserved() {
            return Err(Error::SupplyExhausted);
        }

        if input.payment < price {
            return Err(Error::AmountUnderPrice {
                required: price,
                sent: input.payment,
            });
        }

        let primary_split = project.primary_split;
        let project_id = project.id;

        // Effects: method-internal reserve state first, then the project
        // record, all before the external minter call
        if let (Some((idx, _)), Some(reserve_input)) = (&applied, &input.reserve_input) {
            let project = self
                .projects
                .get(&project_id)
                .ok_or(Error::ProjectNotFound(project_id))?;
            let entry = &project.reserves[*idx];
            self.reserves.commit(
                entry.method_id,
                ApplyContext {
                    entry_data: &entry.data,
                    user_input: &reserve_input.input,
                    current_amount: entry.amount,
                    sender: caller,
                    now,
                },
            )?;
        }
        let project = self
            .projects
            .get_mut(&project_id)
            .ok_or(Error::ProjectNotFound(project_id))?;
        if let Some((idx, new_data)) = applied {
            let entry = &mut project.reserves[idx];
            entry.amount -= 1;
            entry.data = new_data;
        }
        project.balance -= 1;

        let asset = if input.create_ticket {
            let ticket_id = self
                .tickets
                .mint(project_id, input.recipient, price, now)?;
            MintedAsset::Ticket(ticket_id)
        } else {
            project.iterations += 1;
            let token_id = self.next_token;
            self.next_token += 1;
            self.oracle.generate(
                self.identity,
                TokenKey {
                    project: project_id,
                    token: token_id,
                },
            )?;
            self.minter.mint(FinalToken {
                project: project_id,
                token_id,
                owner: input.recipient,
                input_bytes: input.input_bytes,
            })?;
            MintedAsset::Token(token_id)
        };

        let payouts =
            self.split_mint_payment(price, input.payment, caller, input.referrer, primary_split);
        debug!(project = project_id, ?asset, price, "mint settled");
        Ok(MintOutcome {
            asset,
            price,
            payouts,
        })
    }

    /// Redeem a ticket for the final token. The price was escrowed at ticket
    /// creation, so no payment is taken here.
    pub fn mint_with_ticket(
        &mut self,
        caller: Address,
        input: MintWithTicketInput,
        now: u64,
    ) -> Result<MintOutcome> {
        let project = self
            .projects
            .get(&input.project_id)
            .ok_or(Error::ProjectNotFound(input.project_id))?;
        if !project.enabled {
            return Err(Error::ProjectDisabled);
        }
        self.gate.is_allowed(caller, now)?;

        let payouts = self
            .tickets
            .consume(caller, input.ticket_id, input.project_id, now)?;

        let project = self
            .projects
            .get_mut(&input.project_id)
            .ok_or(Error::ProjectNotFound(input.project_id))?;
        project.iterations += 1;
        let token_id = self.next_token;
        self.next_token += 1;
        self.oracle.generate(
            self.identity,
            TokenKey {
                project: input.project_id,
                token: token_id,
            },
        )?;
        self.minter.mint(FinalToken {
            project: input.project_id,
            token_id,
            owner: input.recipient,
            input_bytes: input.input_bytes,
        })?;

        info!(
            project = input.project_id,
            ticket = input.ticket_id,
            token = token_id,
            "ticket redeemed"
        );
        Ok(MintOutcome {
            asset: MintedAsset::Token(token_id),
            price: 0,
            payouts,
        })
    }

    /// Split a mint payment: platform fee (with optional referrer share) off
    /// the top, the primary split from the remainder, every rounding crumb
    /// to the treasury, excess payment back to the payer.
    fn split_mint_payment(
        &self,
        price: u64,
        payment: u64,
        payer: Address,
        referrer: Option<Address>,
        primary: Split,
    ) -> Vec<Payout> {
        let fee = bps_share(price, self.platform_fee_bps);
        let referrer_amount = referrer.map(|r| (r, bps_share(fee, self.referrer_share_bps)));
        let net = price - fee;
        let primary_amount = bps_share(net, primary.percent_bps);
        let referred = referrer_amount.map_or(0, |(_, a)| a);
        let treasury_amount = price - primary_amount - referred;

        let mut payouts = vec![
            Payout::new(primary.receiver, primary_amount, PayoutKind::Primary),
            Payout::new(self.treasury, treasury_amount, PayoutKind::Treasury),
        ];
        if let Some((receiver, amount)) = referrer_amount {
            payouts.push(Payout::new(receiver, amount, PayoutKind::Referrer));
        }
        payouts.push(Payout::new(payer, payment - price, PayoutKind::Refund));
        compact_payouts(payouts)
    }

    // ---- randomness passthrough --------------------------------------------

    /// Reveal a batch of seeds (oracle authority role).
    pub fn reveal(
        &mut self,
        caller: Address,
        keys: &[TokenKey],
        preimage: crate::oracle::Digest,
    ) -> Result<()> {
        self.oracle.reveal(caller, keys, preimage)
    }

    pub fn get_seed(&self, project: ProjectId, token: TokenId) -> Result<&SeedRecord> {
        self.oracle.get_seed(project, token)
    }

    // ---- accessors ---------------------------------------------------------

    pub fn project(&self, id: ProjectId) -> Result<&Project> {
        self.projects.get(&id).ok_or(Error::ProjectNotFound(id))
    }

    pub fn tickets(&self) -> &TicketMarket {
        &self.tickets
    }

    pub fn tickets_mut(&mut self) -> &mut TicketMarket {
        &mut self.tickets
    }

    pub fn oracle(&self) -> &RandomnessOracle {
        &self.oracle
    }
}
