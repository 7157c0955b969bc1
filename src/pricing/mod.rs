//! Price-over-time strategy resolution
//!
//! Strategies are registered under small integer ids by an admin and reached
//! through the resolver, so new pricing curves plug in without touching the
//! orchestrator. Strategy details travel as opaque JSON byte payloads decoded
//! per-strategy.

pub mod dutch;
pub mod fixed;

use std::collections::HashMap;

use tracing::info;

use crate::error::{Error, Result};
use crate::types::{Address, PricingRef};

pub use dutch::{DutchAuctionDetails, DutchAuctionPricing};
pub use fixed::{FixedPriceDetails, FixedPricing};

/// A pluggable price-over-time strategy.
pub trait PricingStrategy: Send + Sync {
    /// Reject malformed or inconsistent details at registration time.
    fn validate(&self, details: &[u8], now: u64) -> Result<()>;

    /// Current unit price. Fails with `NotOpenedYet` before the sale opens.
    fn price_at(&self, details: &[u8], now: u64) -> Result<u64>;

    /// Price frozen for reserve holders when the project locks its pricing.
    fn lock_price(&self, details: &[u8]) -> Result<u64>;
}

struct Registered {
    strategy: Box<dyn PricingStrategy>,
    enabled: bool,
}

/// Registry of pricing strategies keyed by small integer ids.
pub struct PricingResolver {
    admin: Address,
    strategies: HashMap<u8, Registered>,
}

impl PricingResolver {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            strategies: HashMap::new(),
        }
    }

    fn require_admin(&self, caller: Address) -> Result<()> {
        if caller != self.admin {
            return Err(Error::Unauthorized { role: "admin" });
        }
        Ok(())
    }

    /// Register a strategy under `id` (admin only). Re-registering an id
    /// replaces the previous strategy.
    pub fn register(
        &mut self,
        caller: Address,
        id: u8,
        strategy: Box<dyn PricingStrategy>,
        enabled: bool,
    ) -> Result<()> {
        self.require_admin(caller)?;
        info!(strategy_id = id, enabled, "pricing strategy registered");
        self.strategies.insert(id, Registered { strategy, enabled });
        Ok(())
    }

    /// Enable or disable a registered strategy (admin only).
    pub fn set_enabled(&mut self, caller: Address, id: u8, enabled: bool) -> Result<()> {
        self.require_admin(caller)?;
        let entry = self
            .strategies
            .get_mut(&id)
            .ok_or(Error::PricingMethodNotFound(id))?;
        entry.enabled = enabled;
        Ok(())
    }

    fn get(&self, id: u8) -> Result<&dyn PricingStrategy> {
        let entry = self
            .strategies
            .get(&id)
            .ok_or(Error::PricingMethodNotFound(id))?;
        if !entry.enabled {
            return Err(Error::PricingMethodDisabled(id));
        }
        Ok(entry.strategy.as_ref())
    }

    /// Validate a pricing reference at project creation.
    pub fn validate(&self, pricing: &PricingRef, now: u64) -> Result<()> {
        self.get(pricing.strategy_id)?.validate(&pricing.details, now)
    }

    /// Resolve the current price.
    pub fn price_at(&self, pricing: &PricingRef, now: u64) -> Result<u64> {
        self.get(pricing.strategy_id)?.price_at(&pricing.details, now)
    }

    /// Resolve the frozen reserve-holder price.
    pub fn lock_price(&self, pricing: &PricingRef) -> Result<u64> {
        self.get(pricing.strategy_id)?.lock_price(&pricing.details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_ref(price: u64, opens_at: u64) -> PricingRef {
        PricingRef {
            strategy_id: 1,
            details: serde_json::to_vec(&FixedPriceDetails { price, opens_at }).unwrap(),
            lock_for_reserves: false,
            locked_price: None,
        }
    }

    fn resolver() -> (PricingResolver, Address) {
        let admin = Address::new_unique();
        let mut resolver = PricingResolver::new(admin);
        resolver
            .register(admin, 1, Box::new(FixedPricing), true)
            .unwrap();
        (resolver, admin)
    }

    #[test]
    fn test_register_requires_admin() {
        let (mut resolver, _) = resolver();
        let outsider = Address::new_unique();
        let err = resolver
            .register(outsider, 2, Box::new(FixedPricing), true)
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { role: "admin" }));
    }

    #[test]
    fn test_unknown_strategy() {
        let (resolver, _) = resolver();
        let mut pricing = fixed_ref(100, 0);
        pricing.strategy_id = 9;
        assert!(matches!(
            resolver.price_at(&pricing, 10),
            Err(Error::PricingMethodNotFound(9))
        ));
    }

    #[test]
    fn test_disabled_strategy() {
        let (mut resolver, admin) = resolver();
        resolver.set_enabled(admin, 1, false).unwrap();
        let pricing = fixed_ref(100, 0);
        assert!(matches!(
            resolver.price_at(&pricing, 10),
            Err(Error::PricingMethodDisabled(1))
        ));
    }

    #[test]
    fn test_dispatch() {
        let (resolver, _) = resolver();
        let pricing = fixed_ref(100, 5);
        assert_eq!(resolver.price_at(&pricing, 5).unwrap(), 100);
        assert_eq!(resolver.lock_price(&pricing).unwrap(), 100);
    }
}
