//! Reference to a spendable transaction output.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::TxHash;

/// A (transaction-hash, output-index) pair uniquely identifying a coin.
///
/// Ordering is lexicographic on `(txid, index)` — the canonical input
/// ordering of an assembled mixing transaction relies on this.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxHash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: TxHash, index: u32) -> Self {
        Self { txid, index }
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.txid, self.index)
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_by_txid_then_index() {
        let a = OutPoint::new(TxHash::new([1u8; 32]), 5);
        let b = OutPoint::new(TxHash::new([1u8; 32]), 9);
        let c = OutPoint::new(TxHash::new([2u8; 32]), 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn equal_outpoints_compare_equal() {
        let a = OutPoint::new(TxHash::new([7u8; 32]), 3);
        let b = OutPoint::new(TxHash::new([7u8; 32]), 3);
        assert_eq!(a, b);
    }
}
