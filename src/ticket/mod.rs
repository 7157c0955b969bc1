//! Harberger-taxed mint tickets
//!
//! A ticket is a transferable right to mint one token at a price escrowed at
//! creation. Holders self-assess a price and prepay a daily tax on it; once
//! the escrow stops covering the tax, anyone may force-buy the ticket at a
//! price that decays linearly to the floor over one day of being overdue.
//!
//! Tax settlement policy: `pay_tax` credits whole-day multiples of the daily
//! tax and refunds the remainder.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::TicketConfig;
use crate::error::{Error, Result};
use crate::types::{
    bps_share, compact_payouts, Address, Payout, PayoutKind, ProjectId, TicketId, SECONDS_PER_DAY,
};

/// Ticket-side registration of an issuing project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketProject {
    pub gracing_period_days: u32,
    pub metadata: String,
}

/// A live mint right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub project: ProjectId,
    pub owner: Address,
    /// Self-assessed price; the tax base and the forced-sale ask
    pub price: u64,
    /// Start of the current taxation window (gracing end at creation)
    pub taxation_start: u64,
    /// Prepaid tax escrow
    pub taxation_locked: u64,
    pub created_at: u64,
}

/// Outcome of a `pay_tax` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxPayment {
    pub credited: u64,
    pub refund: u64,
}

/// Outcome of a forced claim.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    /// Decayed price actually paid
    pub price: u64,
    pub payouts: Vec<Payout>,
}

pub struct TicketMarket {
    min_price: u64,
    daily_tax_bps: u16,
    min_gracing_days: u32,
    treasury: Address,
    projects: HashMap<ProjectId, TicketProject>,
    tickets: HashMap<TicketId, Ticket>,
    next_id: TicketId,
}

impl TicketMarket {
    pub fn new(config: &TicketConfig, treasury: Address) -> Self {
        Self {
            min_price: config.min_price,
            daily_tax_bps: config.daily_tax_bps,
            min_gracing_days: config.min_gracing_days,
            treasury,
            projects: HashMap::new(),
            tickets: HashMap::new(),
            next_id: 0,
        }
    }

    /// Daily Harberger tax on a self-assessed price.
    pub fn daily_tax(&self, price: u64) -> u64 {
        bps_share(price, self.daily_tax_bps)
    }

    pub fn min_price(&self) -> u64 {
        self.min_price
    }

    /// One-time ticket-side project registration.
    pub fn create_project(
        &mut self,
        project: ProjectId,
        gracing_period_days: u32,
        metadata: String,
    ) -> Result<()> {
        if self.projects.contains_key(&project) {
            return Err(Error::ProjectExists(project));
        }
        if gracing_period_days < self.min_gracing_days {
            return Err(Error::GracingUnder1);
        }
        self.projects.insert(
            project,
            TicketProject {
                gracing_period_days,
                metadata,
            },
        );
        Ok(())
    }

    /// Create a ticket for `minter`. The price was already charged by the
    /// orchestrator; prices under the floor are clamped up to it.
    pub fn mint(
        &mut self,
        project: ProjectId,
        minter: Address,
        price: u64,
        now: u64,
    ) -> Result<TicketId> {
        let settings = self
            .projects
            .get(&project)
            .ok_or(Error::ProjectNotFound(project))?;

        let id = self.next_id;
        self.next_id += 1;
        let price = price.max(self.min_price);
        // The tax clock starts when gracing ends
        let taxation_start = now + settings.gracing_period_days as u64 * SECONDS_PER_DAY;
        self.tickets.insert(
            id,
            Ticket {
                project,
                owner: minter,
                price,
                taxation_start,
                taxation_locked: 0,
                created_at: now,
            },
        );
        info!(ticket = id, project, price, "ticket minted");
        Ok(id)
    }

    fn ticket(&self, id: TicketId) -> Result<&Ticket> {
        self.tickets.get(&id).ok_or(Error::TicketNotFound(id))
    }

    /// Tax consumed since the start of the taxation window, capped by the
    /// escrow. Zero while gracing is still running.
    fn consumed_tax(&self, ticket: &Ticket, now: u64) -> u64 {
        let elapsed_days = now.saturating_sub(ticket.taxation_start) / SECONDS_PER_DAY;
        (self.daily_tax(ticket.price) * elapsed_days).min(ticket.taxation_locked)
    }

    /// Top up the tax escrow; anyone may pay. Only whole-day multiples of
    /// the daily tax are credited, the remainder is refunded.
    pub fn pay_tax(&mut self, id: TicketId, amount: u64) -> Result<TaxPayment> {
        let daily_tax = {
            let ticket = self.ticket(id)?;
            self.daily_tax(ticket.price)
        };
        let days = amount / daily_tax;
        let credited = days * daily_tax;

        let ticket = self.tickets.get_mut(&id).expect("checked above");
        ticket.taxation_locked += credited;
        debug!(ticket = id, credited, "tax escrow credited");
        Ok(TaxPayment {
            credited,
            refund: amount - credited,
        })
    }

    /// Re-assess the ticket's price (owner only). The escrow must cover the
    /// new daily tax for at least `coverage` days; consumed tax settles to
    /// the treasury and the surplus is released to the owner.
    pub fn update_price(
        &mut self,
        caller: Address,
        id: TicketId,
        new_price: u64,
        coverage: u64,
        now: u64,
    ) -> Result<Vec<Payout>> {
        let ticket = self.ticket(id)?;
        if ticket.owner != caller {
            return Err(Error::InsufficientBalance);
        }
        if new_price < self.min_price {
            return Err(Error::PriceBelowMinPrice {
                min: self.min_price,
            });
        }
        if coverage < 1 {
            return Err(Error::MinCoverage);
        }

        let consumed = self.consumed_tax(ticket, now);
        let available = ticket.taxation_locked - consumed;
        let required = self.daily_tax(new_price) * coverage;
        if available < required {
            return Err(Error::InsufficientBalance);
        }

        let owner = ticket.owner;
        let released = available - required;
        let treasury = self.treasury;

        let ticket = self.tickets.get_mut(&id).expect("checked above");
        ticket.price = new_price;
        ticket.taxation_start = now;
        ticket.taxation_locked = required;
        info!(ticket = id, new_price, coverage, "ticket price updated");

        Ok(compact_payouts(vec![
            Payout::new(treasury, consumed, PayoutKind::Tax),
            Payout::new(owner, released, PayoutKind::EscrowRelease),
        ]))
    }

    /// Forced sale. The ask decays linearly from `expected_price` to the
    /// floor over one day once the escrow stops covering the tax.
    #[allow(clippy::too_many_arguments)]
    pub fn claim(
        &mut self,
        caller: Address,
        id: TicketId,
        expected_price: u64,
        coverage: u64,
        recipient: Address,
        payment: u64,
        now: u64,
    ) -> Result<ClaimOutcome> {
        let ticket = self.ticket(id)?;
        let settings = self
            .projects
            .get(&ticket.project)
            .ok_or(Error::ProjectNotFound(ticket.project))?;

        let gracing_until =
            ticket.created_at + settings.gracing_period_days as u64 * SECONDS_PER_DAY;
        if now < gracing_until {
            return Err(Error::GracingPeriod {
                until: gracing_until,
            });
        }
        if expected_price < self.min_price {
            return Err(Error::PriceBelowMinPrice {
                min: self.min_price,
            });
        }
        if coverage < 1 {
            return Err(Error::MinCoverage);
        }

        let days_covered = ticket.taxation_locked / self.daily_tax(expected_price);
        let foreclosure = ticket.taxation_start + days_covered * SECONDS_PER_DAY;
        let overdue = now.saturating_sub(foreclosure).min(SECONDS_PER_DAY);
        let range = expected_price - self.min_price;
        let new_price =
            expected_price - ((range as u128 * overdue as u128) / SECONDS_PER_DAY as u128) as u64;

        if payment < new_price {
            return Err(Error::AmountUnderPrice {
                required: new_price,
                sent: payment,
            });
        }
        // The new owner's first escrow is funded from the same payment
        let new_escrow = self.daily_tax(new_price) * coverage;
        if payment < new_price + new_escrow {
            return Err(Error::InsufficientBalance);
        }

        let consumed = self.consumed_tax(ticket, now);
        let released = ticket.taxation_locked - consumed;
        let previous_owner = ticket.owner;
        let treasury = self.treasury;
        let refund = payment - new_price - new_escrow;

        let ticket = self.tickets.get_mut(&id).expect("checked above");
        ticket.owner = recipient;
        ticket.price = new_price;
        ticket.taxation_start = now;
        ticket.taxation_locked = new_escrow;
        info!(
            ticket = id,
            new_price,
            overdue,
            %recipient,
            "ticket claimed"
        );

        Ok(ClaimOutcome {
            price: new_price,
            payouts: compact_payouts(vec![
                Payout::new(previous_owner, new_price, PayoutKind::Seller),
                Payout::new(treasury, consumed, PayoutKind::Tax),
                Payout::new(previous_owner, released, PayoutKind::EscrowRelease),
                Payout::new(caller, refund, PayoutKind::Refund),
            ]),
        })
    }

    /// Redeem a ticket for the final token: validates ownership and project,
    /// destroys the ticket, and settles its escrow.
    pub fn consume(
        &mut self,
        minter: Address,
        id: TicketId,
        project: ProjectId,
        now: u64,
    ) -> Result<Vec<Payout>> {
        let ticket = self.ticket(id)?;
        if ticket.project != project {
            return Err(Error::WrongProject);
        }
        if ticket.owner != minter {
            return Err(Error::InsufficientBalance);
        }

        let consumed = self.consumed_tax(ticket, now);
        let released = ticket.taxation_locked - consumed;
        let owner = ticket.owner;
        let treasury = self.treasury;

        self.tickets.remove(&id);
        info!(ticket = id, project, "ticket consumed");

        Ok(compact_payouts(vec![
            Payout::new(treasury, consumed, PayoutKind::Tax),
            Payout::new(owner, released, PayoutKind::EscrowRelease),
        ]))
    }

    pub fn token_data(&self, id: TicketId) -> Result<&Ticket> {
        self.ticket(id)
    }

    pub fn project_data(&self, project: ProjectId) -> Result<&TicketProject> {
        self.projects
            .get(&project)
            .ok_or(Error::ProjectNotFound(project))
    }
}
