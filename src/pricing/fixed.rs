//! Fixed pricing: constant unit price once the sale opens

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pricing::PricingStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPriceDetails {
    pub price: u64,
    pub opens_at: u64,
}

pub struct FixedPricing;

impl PricingStrategy for FixedPricing {
    fn validate(&self, details: &[u8], _now: u64) -> Result<()> {
        let details: FixedPriceDetails = serde_json::from_slice(details)?;
        if details.price == 0 {
            return Err(Error::InvalidPrice);
        }
        Ok(())
    }

    fn price_at(&self, details: &[u8], now: u64) -> Result<u64> {
        let details: FixedPriceDetails = serde_json::from_slice(details)?;
        if now < details.opens_at {
            return Err(Error::NotOpenedYet {
                opens_at: details.opens_at,
            });
        }
        Ok(details.price)
    }

    fn lock_price(&self, details: &[u8]) -> Result<u64> {
        let details: FixedPriceDetails = serde_json::from_slice(details)?;
        Ok(details.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(price: u64, opens_at: u64) -> Vec<u8> {
        serde_json::to_vec(&FixedPriceDetails { price, opens_at }).unwrap()
    }

    #[test]
    fn test_price_before_open_fails() {
        let d = details(100, 1000);
        let err = FixedPricing.price_at(&d, 999).unwrap_err();
        assert!(matches!(err, Error::NotOpenedYet { opens_at: 1000 }));
    }

    #[test]
    fn test_price_constant_after_open() {
        let d = details(100, 1000);
        assert_eq!(FixedPricing.price_at(&d, 1000).unwrap(), 100);
        assert_eq!(FixedPricing.price_at(&d, 1_000_000).unwrap(), 100);
    }

    #[test]
    fn test_zero_price_rejected() {
        let d = details(0, 0);
        assert!(matches!(
            FixedPricing.validate(&d, 0),
            Err(Error::InvalidPrice)
        ));
    }

    #[test]
    fn test_malformed_details_rejected() {
        assert!(matches!(
            FixedPricing.price_at(b"garbage", 0),
            Err(Error::MalformedPayload(_))
        ));
    }
}
