//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::types::{Address, BPS_DENOMINATOR};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub fees: FeesConfig,
    #[serde(default)]
    pub issuance: IssuanceConfig,
    #[serde(default)]
    pub ticket: TicketConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

/// Treasury address and fee shares
#[derive(Debug, Clone, Deserialize)]
pub struct FeesConfig {
    /// Protocol treasury (base58 pubkey); receives platform fees and all
    /// integer-division rounding remainders
    pub treasury: String,
    #[serde(default = "default_platform_fee_bps")]
    pub platform_fee_bps: u16,
    /// Share of the platform fee forwarded to an optional referrer
    #[serde(default = "default_referrer_share_bps")]
    pub referrer_share_bps: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuanceConfig {
    /// Delay before an unverified author's project opens for minting
    #[serde(default = "default_lock_duration_secs")]
    pub lock_duration_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketConfig {
    /// Floor for self-assessed ticket prices
    #[serde(default = "default_min_price")]
    pub min_price: u64,
    /// Daily Harberger tax rate in basis points of the self-assessed price
    #[serde(default = "default_daily_tax_bps")]
    pub daily_tax_bps: u16,
    #[serde(default = "default_min_gracing_days")]
    pub min_gracing_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Minimum dutch-auction step duration
    #[serde(default = "default_min_decrement_secs")]
    pub min_decrement_secs: u64,
}

// Default value functions
fn default_platform_fee_bps() -> u16 {
    2500
}

fn default_referrer_share_bps() -> u16 {
    2000
}

fn default_lock_duration_secs() -> u64 {
    3600
}

fn default_min_price() -> u64 {
    100_000_000
}

fn default_daily_tax_bps() -> u16 {
    14
}

fn default_min_gracing_days() -> u32 {
    1
}

fn default_min_decrement_secs() -> u64 {
    60
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            lock_duration_secs: default_lock_duration_secs(),
        }
    }
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            min_price: default_min_price(),
            daily_tax_bps: default_daily_tax_bps(),
            min_gracing_days: default_min_gracing_days(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            min_decrement_secs: default_min_decrement_secs(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix GENMINT_)
            .add_source(
                config::Environment::with_prefix("GENMINT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.treasury_address()?;

        if self.fees.platform_fee_bps as u64 > BPS_DENOMINATOR {
            anyhow::bail!("platform_fee_bps cannot exceed 10000 (100%)");
        }

        if self.fees.referrer_share_bps as u64 > BPS_DENOMINATOR {
            anyhow::bail!("referrer_share_bps cannot exceed 10000 (100%)");
        }

        if self.ticket.min_gracing_days < 1 {
            anyhow::bail!("min_gracing_days must be at least 1");
        }

        // The tax arithmetic divides by dailyTax(price); the floor price must
        // carry a nonzero daily tax.
        if (self.ticket.min_price as u128 * self.ticket.daily_tax_bps as u128)
            < BPS_DENOMINATOR as u128
        {
            anyhow::bail!("min_price * daily_tax_bps must be at least 10000");
        }

        if self.pricing.min_decrement_secs == 0 {
            anyhow::bail!("min_decrement_secs must be positive");
        }

        Ok(())
    }

    /// Parsed treasury address
    pub fn treasury_address(&self) -> Result<Address> {
        Address::from_str(&self.fees.treasury)
            .with_context(|| format!("Invalid treasury address: {}", self.fees.treasury))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fees: FeesConfig {
                treasury: Address::new_unique().to_string(),
                platform_fee_bps: default_platform_fee_bps(),
                referrer_share_bps: default_referrer_share_bps(),
            },
            issuance: IssuanceConfig::default(),
            ticket: TicketConfig::default(),
            pricing: PricingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ticket.daily_tax_bps, 14);
        assert_eq!(config.fees.platform_fee_bps, 2500);
    }

    #[test]
    fn test_invalid_treasury_rejected() {
        let mut config = Config::default();
        config.fees.treasury = "not-a-pubkey".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_daily_tax_at_floor_rejected() {
        let mut config = Config::default();
        config.ticket.min_price = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let treasury = Address::new_unique();
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[fees]\ntreasury = \"{}\"\nplatform_fee_bps = 1000\n\n[ticket]\nmin_price = 200000000\n",
            treasury
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.fees.platform_fee_bps, 1000);
        assert_eq!(config.ticket.min_price, 200_000_000);
        assert_eq!(config.treasury_address().unwrap(), treasury);
        // Untouched sections fall back to defaults
        assert_eq!(config.pricing.min_decrement_secs, 60);
    }
}
