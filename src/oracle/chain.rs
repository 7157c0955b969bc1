//! Salted hash-chain construction
//!
//! The chain is precomputed off-ledger: `links[0] = seed`,
//! `links[k] = H(salt || links[k-1])`. Only the final link (the commitment)
//! is handed to the oracle at setup; reveals walk strictly backward.

use sha2::{Digest as _, Sha256};

pub type Digest = [u8; 32];

/// One chain step: `H(salt || value)`.
pub fn link(salt: &Digest, value: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(value);
    hasher.finalize().into()
}

/// Per-token seed derivation: `H(preimage || chain_seed)`.
pub fn derive(preimage: &Digest, chain_seed: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(preimage);
    hasher.update(chain_seed);
    hasher.finalize().into()
}

/// A fully materialized hash chain, used by the revealing authority and by
/// tests. The oracle itself only ever holds one link.
pub struct HashChain {
    salt: Digest,
    links: Vec<Digest>,
}

impl HashChain {
    /// Precompute `depth` links above `seed`.
    pub fn generate(seed: Digest, salt: Digest, depth: usize) -> Self {
        let mut links = Vec::with_capacity(depth + 1);
        links.push(seed);
        for k in 1..=depth {
            let next = link(&salt, &links[k - 1]);
            links.push(next);
        }
        Self { salt, links }
    }

    pub fn salt(&self) -> Digest {
        self.salt
    }

    /// The published commitment (topmost link).
    pub fn commitment(&self) -> Digest {
        *self.links.last().expect("chain has at least the seed link")
    }

    /// Total reveal capacity.
    pub fn depth(&self) -> u64 {
        (self.links.len() - 1) as u64
    }

    /// The preimage sitting `steps_back` links below the commitment; this is
    /// what the authority supplies to reveal a batch of that size.
    pub fn preimage_at(&self, steps_back: usize) -> Option<Digest> {
        let top = self.links.len() - 1;
        top.checked_sub(steps_back).map(|i| self.links[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_links_verify() {
        let chain = HashChain::generate([1u8; 32], [2u8; 32], 8);
        assert_eq!(chain.depth(), 8);

        // Walking any preimage forward reaches the commitment
        let mut cursor = chain.preimage_at(3).unwrap();
        for _ in 0..3 {
            cursor = link(&chain.salt(), &cursor);
        }
        assert_eq!(cursor, chain.commitment());
    }

    #[test]
    fn test_preimage_bounds() {
        let chain = HashChain::generate([0u8; 32], [0u8; 32], 4);
        assert_eq!(chain.preimage_at(0).unwrap(), chain.commitment());
        assert!(chain.preimage_at(4).is_some());
        assert!(chain.preimage_at(5).is_none());
    }

    #[test]
    fn test_derive_depends_on_both_inputs() {
        let a = derive(&[1u8; 32], &[2u8; 32]);
        let b = derive(&[2u8; 32], &[1u8; 32]);
        let c = derive(&[1u8; 32], &[3u8; 32]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
