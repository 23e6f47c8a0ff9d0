//! Interface to the deterministic coordinator registry.
//!
//! The registry itself is maintained externally (out of scope); the core
//! only needs lookup by collateral outpoint, membership tests, and the
//! registry size for the advertisement rate threshold.

use std::collections::HashMap;

use tumbler_types::{KeyPair, OutPoint, PublicKey};

/// One qualified coordinator: its collateral reference and operator key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryEntry {
    pub collateral_outpoint: OutPoint,
    pub operator_key: PublicKey,
}

/// A snapshot of the eligible-coordinator list.
#[derive(Clone, Debug, Default)]
pub struct CoordinatorRegistry {
    entries: HashMap<OutPoint, RegistryEntry>,
}

impl CoordinatorRegistry {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.collateral_outpoint, e))
                .collect(),
        }
    }

    /// Look up a coordinator by its collateral outpoint.
    pub fn by_outpoint(&self, outpoint: &OutPoint) -> Option<&RegistryEntry> {
        self.entries.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.entries.contains_key(outpoint)
    }

    /// Number of qualified coordinators; feeds the `/5` advertisement
    /// rate threshold.
    pub fn valid_count(&self) -> usize {
        self.entries.len()
    }
}

/// This node's own coordinator identity: the registry outpoint it is
/// listed under and the operator key pair used to sign advertisements
/// and broadcast records.
pub struct CoordinatorIdentity {
    pub outpoint: OutPoint,
    pub keys: KeyPair,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumbler_crypto::keypair_from_seed;
    use tumbler_types::TxHash;

    fn entry(byte: u8) -> RegistryEntry {
        RegistryEntry {
            collateral_outpoint: OutPoint::new(TxHash::new([byte; 32]), 0),
            operator_key: keypair_from_seed(&[byte; 32]).public,
        }
    }

    #[test]
    fn lookup_by_outpoint() {
        let registry = CoordinatorRegistry::new(vec![entry(1), entry(2)]);
        let outpoint = OutPoint::new(TxHash::new([1u8; 32]), 0);
        assert!(registry.contains(&outpoint));
        assert_eq!(
            registry.by_outpoint(&outpoint).unwrap().operator_key,
            keypair_from_seed(&[1u8; 32]).public
        );
    }

    #[test]
    fn unknown_outpoint_is_absent() {
        let registry = CoordinatorRegistry::new(vec![entry(1)]);
        let outpoint = OutPoint::new(TxHash::new([9u8; 32]), 0);
        assert!(!registry.contains(&outpoint));
        assert!(registry.by_outpoint(&outpoint).is_none());
    }

    #[test]
    fn valid_count_matches_entries() {
        let registry = CoordinatorRegistry::new((0..50).map(entry).collect());
        assert_eq!(registry.valid_count(), 50);
    }
}
