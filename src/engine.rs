//! Async issuance engine
//!
//! Thin concurrent facade over the orchestrator: one shared state guarded by
//! an async lock, a clock injected at construction so time-sensitive flows
//! are testable, and tracing around every entry point. Clones share state.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::issuer::{
    Codex, CreateProjectInput, Issuer, MintGate, MintInput, MintOutcome, MintWithTicketInput,
    Project, TokenMinter,
};
use crate::oracle::{Digest, OracleSetup, SeedRecord, TokenKey};
use crate::pricing::PricingStrategy;
use crate::reserve::ReserveMethod;
use crate::ticket::{ClaimOutcome, TaxPayment, Ticket};
use crate::types::{Address, Payout, ProjectId, TicketId, TokenId};

/// Time source. Operations never read the wall clock directly.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Settable clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: std::sync::atomic::AtomicU64,
}

impl ManualClock {
    pub fn at(now: u64) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now
            .fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct IssuanceEngine {
    issuer: Arc<RwLock<Issuer>>,
    clock: Arc<dyn Clock>,
}

impl IssuanceEngine {
    pub fn new(
        config: &Config,
        admin: Address,
        oracle_setup: OracleSetup,
        clock: Arc<dyn Clock>,
        gate: Box<dyn MintGate>,
        codex: Box<dyn Codex>,
        minter: Box<dyn TokenMinter>,
    ) -> anyhow::Result<Self> {
        let issuer = Issuer::new(config, admin, oracle_setup, gate, codex, minter)?;
        info!(admin = %admin, "issuance engine started");
        Ok(Self {
            issuer: Arc::new(RwLock::new(issuer)),
            clock,
        })
    }

    // ---- administration ----------------------------------------------------

    pub async fn register_pricing_strategy(
        &self,
        caller: Address,
        id: u8,
        strategy: Box<dyn PricingStrategy>,
        enabled: bool,
    ) -> Result<()> {
        self.issuer
            .write()
            .await
            .register_pricing_strategy(caller, id, strategy, enabled)
    }

    pub async fn register_reserve_method(
        &self,
        caller: Address,
        id: u8,
        method: Box<dyn ReserveMethod>,
        enabled: bool,
    ) -> Result<()> {
        self.issuer
            .write()
            .await
            .register_reserve_method(caller, id, method, enabled)
    }

    pub async fn add_moderator(&self, caller: Address, moderator: Address) -> Result<()> {
        self.issuer.write().await.add_moderator(caller, moderator)
    }

    pub async fn set_enabled(
        &self,
        caller: Address,
        project: ProjectId,
        enabled: bool,
    ) -> Result<()> {
        self.issuer
            .write()
            .await
            .set_enabled(caller, project, enabled)
    }

    pub async fn grant_reveal_authority(&self, caller: Address, grantee: Address) -> Result<()> {
        self.issuer
            .write()
            .await
            .grant_reveal_authority(caller, grantee)
    }

    // ---- project and mint flows --------------------------------------------

    #[instrument(skip(self, input), fields(project = input.project_id))]
    pub async fn create_project(&self, author: Address, input: CreateProjectInput) -> Result<()> {
        let now = self.clock.now();
        self.issuer.write().await.create_project(author, input, now)
    }

    #[instrument(skip(self, input), fields(project = input.project_id))]
    pub async fn mint(&self, caller: Address, input: MintInput) -> Result<MintOutcome> {
        let now = self.clock.now();
        self.issuer.write().await.mint(caller, input, now)
    }

    #[instrument(skip(self, input), fields(ticket = input.ticket_id))]
    pub async fn mint_with_ticket(
        &self,
        caller: Address,
        input: MintWithTicketInput,
    ) -> Result<MintOutcome> {
        let now = self.clock.now();
        self.issuer
            .write()
            .await
            .mint_with_ticket(caller, input, now)
    }

    // ---- ticket market -----------------------------------------------------

    pub async fn pay_tax(&self, ticket: TicketId, amount: u64) -> Result<TaxPayment> {
        self.issuer.write().await.tickets_mut().pay_tax(ticket, amount)
    }

    #[instrument(skip(self))]
    pub async fn update_ticket_price(
        &self,
        caller: Address,
        ticket: TicketId,
        price: u64,
        coverage: u64,
    ) -> Result<Vec<Payout>> {
        let now = self.clock.now();
        self.issuer
            .write()
            .await
            .tickets_mut()
            .update_price(caller, ticket, price, coverage, now)
    }

    #[instrument(skip(self))]
    pub async fn claim_ticket(
        &self,
        caller: Address,
        ticket: TicketId,
        expected_price: u64,
        coverage: u64,
        recipient: Address,
        payment: u64,
    ) -> Result<ClaimOutcome> {
        let now = self.clock.now();
        self.issuer.write().await.tickets_mut().claim(
            caller,
            ticket,
            expected_price,
            coverage,
            recipient,
            payment,
            now,
        )
    }

    pub async fn ticket(&self, id: TicketId) -> Result<Ticket> {
        self.issuer
            .read()
            .await
            .tickets()
            .token_data(id)
            .cloned()
    }

    // ---- randomness --------------------------------------------------------

    pub async fn reveal(
        &self,
        caller: Address,
        keys: &[TokenKey],
        preimage: Digest,
    ) -> Result<()> {
        self.issuer.write().await.reveal(caller, keys, preimage)
    }

    pub async fn seed(&self, project: ProjectId, token: TokenId) -> Result<SeedRecord> {
        self.issuer
            .read()
            .await
            .get_seed(project, token)
            .copied()
    }

    // ---- views -------------------------------------------------------------

    pub async fn project(&self, id: ProjectId) -> Result<Project> {
        self.issuer.read().await.project(id).cloned()
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }
}
