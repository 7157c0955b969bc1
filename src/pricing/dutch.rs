//! Dutch auction pricing: step-wise decreasing price levels
//!
//! `price(t) = levels[min((t - opens_at) / decrement_duration, levels-1)]`.
//! Levels must strictly decrease; the last level is the resting price.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pricing::PricingStrategy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutchAuctionDetails {
    pub opens_at: u64,
    pub decrement_duration: u64,
    pub levels: Vec<u64>,
}

pub struct DutchAuctionPricing {
    /// Floor on the step duration, from configuration
    min_decrement_duration: u64,
}

impl DutchAuctionPricing {
    pub fn new(min_decrement_duration: u64) -> Self {
        Self {
            min_decrement_duration,
        }
    }
}

impl PricingStrategy for DutchAuctionPricing {
    fn validate(&self, details: &[u8], _now: u64) -> Result<()> {
        let details: DutchAuctionDetails = serde_json::from_slice(details)?;
        if details.levels.is_empty() || *details.levels.last().unwrap() == 0 {
            return Err(Error::InvalidPrice);
        }
        if details.levels.windows(2).any(|w| w[1] >= w[0]) {
            return Err(Error::PricesMustDecrement);
        }
        if details.decrement_duration < self.min_decrement_duration {
            return Err(Error::DecrementTooShort {
                got: details.decrement_duration,
                min: self.min_decrement_duration,
            });
        }
        Ok(())
    }

    fn price_at(&self, details: &[u8], now: u64) -> Result<u64> {
        let details: DutchAuctionDetails = serde_json::from_slice(details)?;
        if now < details.opens_at {
            return Err(Error::NotOpenedYet {
                opens_at: details.opens_at,
            });
        }
        let steps = (now - details.opens_at) / details.decrement_duration;
        let idx = (steps as usize).min(details.levels.len() - 1);
        Ok(details.levels[idx])
    }

    fn lock_price(&self, details: &[u8]) -> Result<u64> {
        let details: DutchAuctionDetails = serde_json::from_slice(details)?;
        details.levels.first().copied().ok_or(Error::InvalidPrice)
    }
}
