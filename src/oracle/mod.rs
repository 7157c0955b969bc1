//! Commit-reveal randomness oracle
//!
//! Per-token randomness that no single party can bias after seeing which
//! token requested it: `generate` binds a token to the currently published
//! (still unrevealed) chain link, and `reveal` later walks the chain backward
//! one link per token. The issuer role (generate) and the authority role
//! (reveal) are disjoint from minting callers.

pub mod chain;

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{Address, ProjectId, TokenId};

pub use chain::{Digest, HashChain};

/// Index key for a seed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenKey {
    pub project: ProjectId,
    pub token: TokenId,
}

/// Write-once randomness record for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedRecord {
    /// Chain link published at request time
    pub chain_seed: Digest,
    /// Monotonic request serial
    pub serial_id: u64,
    /// Absent until the authority reveals the matching chain segment
    pub revealed: Option<Digest>,
}

/// Setup parameters handed to whoever constructs the oracle: the published
/// top link of a precomputed chain, its salt, and its reveal capacity.
#[derive(Debug, Clone, Copy)]
pub struct OracleSetup {
    pub commitment: Digest,
    pub salt: Digest,
    pub depth: u64,
}

impl OracleSetup {
    pub fn of_chain(chain: &HashChain) -> Self {
        Self {
            commitment: chain.commitment(),
            salt: chain.salt(),
            depth: chain.depth(),
        }
    }
}

/// Disjoint permission sets, checked against explicit caller identities.
#[derive(Debug, Default)]
struct Roles {
    admins: HashSet<Address>,
    issuers: HashSet<Address>,
    authorities: HashSet<Address>,
}

pub struct RandomnessOracle {
    salt: Digest,
    /// Single mutable cursor into the precomputed chain; only `reveal`
    /// moves it, and only backward.
    commitment: Digest,
    remaining_depth: u64,
    count_requested: u64,
    count_revealed: u64,
    seeds: HashMap<TokenKey, SeedRecord>,
    roles: Roles,
}

impl RandomnessOracle {
    /// Set up the oracle with the published commitment of a precomputed
    /// chain of `depth` links.
    pub fn new(admin: Address, commitment: Digest, salt: Digest, depth: u64) -> Self {
        let mut roles = Roles::default();
        roles.admins.insert(admin);
        Self {
            salt,
            commitment,
            remaining_depth: depth,
            count_requested: 0,
            count_revealed: 0,
            seeds: HashMap::new(),
            roles,
        }
    }

    fn require_admin(&self, caller: Address) -> Result<()> {
        if !self.roles.admins.contains(&caller) {
            return Err(Error::Unauthorized { role: "admin" });
        }
        Ok(())
    }

    pub fn grant_issuer(&mut self, caller: Address, grantee: Address) -> Result<()> {
        self.require_admin(caller)?;
        self.roles.issuers.insert(grantee);
        Ok(())
    }

    pub fn revoke_issuer(&mut self, caller: Address, grantee: Address) -> Result<()> {
        self.require_admin(caller)?;
        self.roles.issuers.remove(&grantee);
        Ok(())
    }

    pub fn grant_authority(&mut self, caller: Address, grantee: Address) -> Result<()> {
        self.require_admin(caller)?;
        self.roles.authorities.insert(grantee);
        Ok(())
    }

    pub fn revoke_authority(&mut self, caller: Address, grantee: Address) -> Result<()> {
        self.require_admin(caller)?;
        self.roles.authorities.remove(&grantee);
        Ok(())
    }

    /// Bind a token to the currently published chain link (issuer role).
    ///
    /// The published link predates this request, so the eventual revealer
    /// cannot choose a value favorable to this specific token.
    pub fn generate(&mut self, caller: Address, key: TokenKey) -> Result<u64> {
        if !self.roles.issuers.contains(&caller) {
            return Err(Error::Unauthorized { role: "issuer" });
        }
        if self.seeds.contains_key(&key) {
            return Err(Error::SeedAlreadyRequested);
        }

        self.count_requested += 1;
        let serial_id = self.count_requested;
        self.seeds.insert(
            key,
            SeedRecord {
                chain_seed: self.commitment,
                serial_id,
                revealed: None,
            },
        );
        debug!(
            project = key.project,
            token = key.token,
            serial_id,
            "seed requested"
        );
        Ok(serial_id)
    }

    /// Reveal a batch of seeds (authority role).
    ///
    /// `preimage` must sit exactly `keys.len()` links below the stored
    /// commitment. Keys are processed in caller-supplied order and each one
    /// consumes a distinct chain link, so different orderings of the same
    /// key set produce different revealed values.
    pub fn reveal(&mut self, caller: Address, keys: &[TokenKey], preimage: Digest) -> Result<()> {
        if !self.roles.authorities.contains(&caller) {
            return Err(Error::Unauthorized { role: "authority" });
        }
        let batch = keys.len() as u64;
        if batch > self.remaining_depth {
            return Err(Error::RevealDepthExceeded {
                requested: batch,
                remaining: self.remaining_depth,
            });
        }

        // All-or-nothing: compute every revealed value before writing any
        let mut cursor = preimage;
        let mut revealed = Vec::with_capacity(keys.len());
        let mut seen = HashSet::with_capacity(keys.len());
        for key in keys {
            // A key listed twice would consume two chain links for one record
            if !seen.insert(*key) {
                return Err(Error::SeedAlreadyRevealed);
            }
            let record = self.seeds.get(key).ok_or(Error::SeedNotRequested)?;
            if record.revealed.is_some() {
                return Err(Error::SeedAlreadyRevealed);
            }
            revealed.push(chain::derive(&cursor, &record.chain_seed));
            cursor = chain::link(&self.salt, &cursor);
        }
        if cursor != self.commitment {
            return Err(Error::CommitmentMismatch);
        }

        for (key, value) in keys.iter().zip(revealed) {
            let record = self.seeds.get_mut(key).expect("checked above");
            record.revealed = Some(value);
        }
        self.commitment = preimage;
        self.remaining_depth -= batch;
        self.count_revealed += batch;
        info!(batch, remaining_depth = self.remaining_depth, "seeds revealed");
        Ok(())
    }

    pub fn get_seed(&self, project: ProjectId, token: TokenId) -> Result<&SeedRecord> {
        self.seeds
            .get(&TokenKey { project, token })
            .ok_or(Error::SeedNotRequested)
    }

    pub fn commitment(&self) -> Digest {
        self.commitment
    }

    pub fn remaining_depth(&self) -> u64 {
        self.remaining_depth
    }

    pub fn count_requested(&self) -> u64 {
        self.count_requested
    }

    pub fn count_revealed(&self) -> u64 {
        self.count_revealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        chain: HashChain,
        oracle: RandomnessOracle,
        admin: Address,
        issuer: Address,
        authority: Address,
    }

    fn fixture(depth: usize) -> Fixture {
        let admin = Address::new_unique();
        let issuer = Address::new_unique();
        let authority = Address::new_unique();
        let chain = HashChain::generate([7u8; 32], [9u8; 32], depth);
        let mut oracle =
            RandomnessOracle::new(admin, chain.commitment(), chain.salt(), chain.depth());
        oracle.grant_issuer(admin, issuer).unwrap();
        oracle.grant_authority(admin, authority).unwrap();
        Fixture {
            chain,
            oracle,
            admin,
            issuer,
            authority,
        }
    }

    fn key(token: TokenId) -> TokenKey {
        TokenKey { project: 1, token }
    }

    #[test]
    fn test_generate_requires_issuer_role() {
        let mut f = fixture(4);
        let err = f.oracle.generate(f.admin, key(0)).unwrap_err();
        assert!(matches!(err, Error::Unauthorized { role: "issuer" }));
    }

    #[test]
    fn test_generate_binds_commitment_and_serial() {
        let mut f = fixture(4);
        assert_eq!(f.oracle.generate(f.issuer, key(0)).unwrap(), 1);
        assert_eq!(f.oracle.generate(f.issuer, key(1)).unwrap(), 2);

        let record = f.oracle.get_seed(1, 0).unwrap();
        assert_eq!(record.chain_seed, f.chain.commitment());
        assert_eq!(record.serial_id, 1);
        assert!(record.revealed.is_none());
    }

    #[test]
    fn test_generate_twice_fails() {
        let mut f = fixture(4);
        f.oracle.generate(f.issuer, key(0)).unwrap();
        assert!(matches!(
            f.oracle.generate(f.issuer, key(0)),
            Err(Error::SeedAlreadyRequested)
        ));
    }

    #[test]
    fn test_reveal_single_and_advance() {
        let mut f = fixture(4);
        f.oracle.generate(f.issuer, key(0)).unwrap();

        let preimage = f.chain.preimage_at(1).unwrap();
        f.oracle.reveal(f.authority, &[key(0)], preimage).unwrap();

        let record = f.oracle.get_seed(1, 0).unwrap();
        assert_eq!(
            record.revealed.unwrap(),
            chain::derive(&preimage, &f.chain.commitment())
        );
        // Commitment retreated to the preimage
        assert_eq!(f.oracle.commitment(), preimage);
        assert_eq!(f.oracle.remaining_depth(), 3);
    }

    #[test]
    fn test_reveal_order_sensitivity() {
        // Same chain, same preimage, permuted key order: every token must
        // end with a different revealed value.
        let chain = HashChain::generate([7u8; 32], [9u8; 32], 8);
        let preimage = chain.preimage_at(3).unwrap();

        let run = |order: &[TokenKey]| {
            let admin = Address::new_unique();
            let issuer = Address::new_unique();
            let authority = Address::new_unique();
            let mut oracle =
                RandomnessOracle::new(admin, chain.commitment(), chain.salt(), chain.depth());
            oracle.grant_issuer(admin, issuer).unwrap();
            oracle.grant_authority(admin, authority).unwrap();
            for t in 0..3 {
                oracle.generate(issuer, key(t)).unwrap();
            }
            oracle.reveal(authority, order, preimage).unwrap();
            (0..3)
                .map(|t| oracle.get_seed(1, t).unwrap().revealed.unwrap())
                .collect::<Vec<_>>()
        };

        let forward = run(&[key(0), key(1), key(2)]);
        let backward = run(&[key(2), key(1), key(0)]);
        assert_ne!(forward[0], backward[0]);
        assert_ne!(forward[2], backward[2]);
    }

    #[test]
    fn test_reveal_depth_exceeded() {
        let mut f = fixture(2);
        for t in 0..3 {
            f.oracle.generate(f.issuer, key(t)).unwrap();
        }
        let preimage = f.chain.preimage_at(2).unwrap();
        let err = f
            .oracle
            .reveal(f.authority, &[key(0), key(1), key(2)], preimage)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RevealDepthExceeded {
                requested: 3,
                remaining: 2
            }
        ));
    }

    #[test]
    fn test_reveal_wrong_preimage() {
        let mut f = fixture(4);
        f.oracle.generate(f.issuer, key(0)).unwrap();
        let err = f
            .oracle
            .reveal(f.authority, &[key(0)], [0u8; 32])
            .unwrap_err();
        assert!(matches!(err, Error::CommitmentMismatch));
        // Nothing was consumed
        assert!(f.oracle.get_seed(1, 0).unwrap().revealed.is_none());
        assert_eq!(f.oracle.remaining_depth(), 4);
    }

    #[test]
    fn test_reveal_unknown_or_repeated_key() {
        let mut f = fixture(4);
        f.oracle.generate(f.issuer, key(0)).unwrap();
        let preimage = f.chain.preimage_at(1).unwrap();

        assert!(matches!(
            f.oracle.reveal(f.authority, &[key(9)], preimage),
            Err(Error::SeedNotRequested)
        ));

        f.oracle.reveal(f.authority, &[key(0)], preimage).unwrap();
        let deeper = f.chain.preimage_at(2).unwrap();
        assert!(matches!(
            f.oracle.reveal(f.authority, &[key(0)], deeper),
            Err(Error::SeedAlreadyRevealed)
        ));
    }

    #[test]
    fn test_reveal_rejects_duplicate_key_in_batch() {
        let mut f = fixture(4);
        f.oracle.generate(f.issuer, key(0)).unwrap();
        f.oracle.generate(f.issuer, key(1)).unwrap();

        let preimage = f.chain.preimage_at(2).unwrap();
        let err = f
            .oracle
            .reveal(f.authority, &[key(0), key(0)], preimage)
            .unwrap_err();
        assert!(matches!(err, Error::SeedAlreadyRevealed));
        // Nothing was consumed
        assert!(f.oracle.get_seed(1, 0).unwrap().revealed.is_none());
        assert_eq!(f.oracle.remaining_depth(), 4);
        assert_eq!(f.oracle.count_revealed(), 0);
    }

    #[test]
    fn test_sequential_batches_walk_backward() {
        let mut f = fixture(4);
        for t in 0..4 {
            f.oracle.generate(f.issuer, key(t)).unwrap();
        }
        let first = f.chain.preimage_at(2).unwrap();
        f.oracle
            .reveal(f.authority, &[key(0), key(1)], first)
            .unwrap();
        let second = f.chain.preimage_at(4).unwrap();
        f.oracle
            .reveal(f.authority, &[key(2), key(3)], second)
            .unwrap();
        assert_eq!(f.oracle.remaining_depth(), 0);
        assert_eq!(f.oracle.count_revealed(), 4);
        for t in 0..4 {
            assert!(f.oracle.get_seed(1, t).unwrap().revealed.is_some());
        }
    }
}
