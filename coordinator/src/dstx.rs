//! Process-wide index of signed broadcast-tx records.
//!
//! Finalized mixing transactions are wrapped in a coordinator-signed
//! [`SignedFinalTx`] and indexed by transaction hash for network-wide
//! relay. The index has its own lock, separate from the session actor.

use std::collections::HashMap;
use std::sync::Mutex;

use tumbler_messages::SignedFinalTx;
use tumbler_types::TxHash;

/// Hash-keyed store of signed broadcast records. First write wins;
/// re-adding the same hash never overwrites.
pub struct SignedTxIndex {
    map: Mutex<HashMap<TxHash, SignedFinalTx>>,
}

impl SignedTxIndex {
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a record under its transaction hash. Returns false when a
    /// record with the same hash already exists (the original is kept).
    pub fn add(&self, dstx: SignedFinalTx) -> bool {
        let hash = dstx.tx_hash();
        let mut map = self.map.lock().expect("dstx index lock poisoned");
        if map.contains_key(&hash) {
            return false;
        }
        map.insert(hash, dstx);
        true
    }

    /// O(1) lookup by transaction hash.
    pub fn get(&self, hash: &TxHash) -> Option<SignedFinalTx> {
        self.map
            .lock()
            .expect("dstx index lock poisoned")
            .get(hash)
            .cloned()
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.map
            .lock()
            .expect("dstx index lock poisoned")
            .contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.map.lock().expect("dstx index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SignedTxIndex {
    fn default() -> Self {
        Self::new()
    }
}
