//! Whitelist reserve: per-address allowances carried in the entry data

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reserve::{ApplyContext, ReserveApplication, ReserveMethod};
use crate::types::{Address, ReserveEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistSlot {
    pub address: Address,
    pub allowance: u64,
}

/// Stateless method: all state lives in the entry's opaque data as a JSON
/// list of `(address, remaining allowance)` slots.
pub struct WhitelistReserve;

impl ReserveMethod for WhitelistReserve {
    fn is_valid(&self, entry: &ReserveEntry) -> Result<bool> {
        let slots: Vec<WhitelistSlot> = serde_json::from_slice(&entry.data)?;
        // Caller-supplied allowances; sum wide so they cannot overflow
        let total: u128 = slots.iter().map(|s| s.allowance as u128).sum();
        Ok(total >= entry.amount as u128)
    }

    fn apply(&self, ctx: ApplyContext<'_>) -> Result<ReserveApplication> {
        let mut slots: Vec<WhitelistSlot> = serde_json::from_slice(ctx.entry_data)?;

        if ctx.current_amount == 0 {
            return Ok(ReserveApplication::skipped(ctx.entry_data));
        }

        match slots
            .iter_mut()
            .find(|s| s.address == ctx.sender && s.allowance > 0)
        {
            Some(slot) => {
                slot.allowance -= 1;
                Ok(ReserveApplication {
                    applied: true,
                    new_data: serde_json::to_vec(&slots)?,
                })
            }
            None => Ok(ReserveApplication::skipped(ctx.entry_data)),
        }
    }
}
