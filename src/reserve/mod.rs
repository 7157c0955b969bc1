//! Early-access reserve strategy resolution
//!
//! A reserve entry gates part of a project's supply behind a pluggable
//! method. Methods are registered under integer ids by an admin; the entry's
//! `data` payload is opaque to everything except the owning method.

pub mod mint_pass;
pub mod whitelist;

use std::collections::HashMap;

use tracing::info;

use crate::error::{Error, Result};
use crate::types::{Address, ReserveEntry};

pub use mint_pass::{GroupRef, MintPass, MintPassGroup, MintPassReserve, PassPayload};
pub use whitelist::{WhitelistReserve, WhitelistSlot};

/// Inputs to a reserve application attempt, driven by a single mint.
#[derive(Debug, Clone, Copy)]
pub struct ApplyContext<'a> {
    /// The entry's opaque state
    pub entry_data: &'a [u8],
    /// Caller-supplied opaque input (e.g. a signed pass)
    pub user_input: &'a [u8],
    /// Remaining allocation on the reserve entry
    pub current_amount: u64,
    pub sender: Address,
    pub now: u64,
}

/// Outcome of a reserve application.
///
/// `applied == false` means the mint proceeds at standard terms and the
/// entry state is unchanged.
#[derive(Debug, Clone)]
pub struct ReserveApplication {
    pub applied: bool,
    pub new_data: Vec<u8>,
}

impl ReserveApplication {
    pub fn skipped(data: &[u8]) -> Self {
        Self {
            applied: false,
            new_data: data.to_vec(),
        }
    }
}

/// A pluggable early-access allocation method.
///
/// `apply` must be free of side effects: the caller runs it during its
/// validation phase and a rejected mint must leave the method untouched.
/// Internal method state moves only in `commit`, invoked with the same
/// context once every remaining precondition has passed.
pub trait ReserveMethod: Send + Sync {
    /// Whether an entry's declared amount is backed by its opaque state.
    fn is_valid(&self, entry: &ReserveEntry) -> Result<bool>;

    /// Check one unit of the reserve for `ctx.sender` without consuming it.
    fn apply(&self, ctx: ApplyContext<'_>) -> Result<ReserveApplication>;

    /// Write the method-internal state for an application `apply` accepted.
    fn commit(&mut self, ctx: ApplyContext<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}

struct Registered {
    method: Box<dyn ReserveMethod>,
    enabled: bool,
}

/// Registry of reserve methods keyed by small integer ids.
pub struct ReserveResolver {
    admin: Address,
    methods: HashMap<u8, Registered>,
}

impl ReserveResolver {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            methods: HashMap::new(),
        }
    }

    fn require_admin(&self, caller: Address) -> Result<()> {
        if caller != self.admin {
            return Err(Error::Unauthorized { role: "admin" });
        }
        Ok(())
    }

    /// Register a method under `id` (admin only).
    pub fn register(
        &mut self,
        caller: Address,
        id: u8,
        method: Box<dyn ReserveMethod>,
        enabled: bool,
    ) -> Result<()> {
        self.require_admin(caller)?;
        info!(method_id = id, enabled, "reserve method registered");
        self.methods.insert(id, Registered { method, enabled });
        Ok(())
    }

    /// Enable or disable a registered method (admin only).
    pub fn set_enabled(&mut self, caller: Address, id: u8, enabled: bool) -> Result<()> {
        self.require_admin(caller)?;
        let entry = self
            .methods
            .get_mut(&id)
            .ok_or(Error::ReserveMethodNotFound(id))?;
        entry.enabled = enabled;
        Ok(())
    }

    fn get(&self, id: u8) -> Result<&Registered> {
        let entry = self
            .methods
            .get(&id)
            .ok_or(Error::ReserveMethodNotFound(id))?;
        if !entry.enabled {
            return Err(Error::ReserveMethodDisabled(id));
        }
        Ok(entry)
    }

    /// Validate a reserve entry at project creation.
    pub fn is_valid(&self, entry: &ReserveEntry) -> Result<bool> {
        self.get(entry.method_id)?.method.is_valid(entry)
    }

    /// Dispatch an effect-free reserve application to the owning method.
    pub fn apply(&self, method_id: u8, ctx: ApplyContext<'_>) -> Result<ReserveApplication> {
        self.get(method_id)?.method.apply(ctx)
    }

    /// Commit an accepted application's method-internal state.
    pub fn commit(&mut self, method_id: u8, ctx: ApplyContext<'_>) -> Result<()> {
        // get() borrows immutably; repeat the lookup mutably after the check
        self.get(method_id)?;
        let entry = self.methods.get_mut(&method_id).expect("checked above");
        entry.method.commit(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whitelist_entry(admin: Address) -> (ReserveResolver, ReserveEntry) {
        let mut resolver = ReserveResolver::new(admin);
        resolver
            .register(admin, 1, Box::new(WhitelistReserve), true)
            .unwrap();
        let slots = vec![WhitelistSlot {
            address: Address::new_unique(),
            allowance: 3,
        }];
        let entry = ReserveEntry {
            method_id: 1,
            amount: 2,
            data: serde_json::to_vec(&slots).unwrap(),
        };
        (resolver, entry)
    }

    #[test]
    fn test_unknown_method() {
        let admin = Address::new_unique();
        let (resolver, mut entry) = whitelist_entry(admin);
        entry.method_id = 7;
        assert!(matches!(
            resolver.is_valid(&entry),
            Err(Error::ReserveMethodNotFound(7))
        ));
    }

    #[test]
    fn test_disabled_method() {
        let admin = Address::new_unique();
        let (mut resolver, entry) = whitelist_entry(admin);
        resolver.set_enabled(admin, 1, false).unwrap();
        assert!(matches!(
            resolver.is_valid(&entry),
            Err(Error::ReserveMethodDisabled(1))
        ));
    }

    #[test]
    fn test_register_requires_admin() {
        let admin = Address::new_unique();
        let (mut resolver, _) = whitelist_entry(admin);
        let err = resolver
            .register(Address::new_unique(), 2, Box::new(WhitelistReserve), true)
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { role: "admin" }));
    }
}
