//! Transaction primitives for the mixing protocol.
//!
//! The coordinator never validates scripts against a full interpreter; it
//! works with a reduced transaction shape where an output pays to the
//! Blake2b-256 of a recipient public key and an input is authorized by a
//! single Ed25519 signature over the joint transaction's signing digest.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::keys::PublicKey;
use crate::outpoint::OutPoint;

/// Default input sequence number.
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

/// A recipient locking script.
///
/// The standard shape is exactly 32 bytes: the Blake2b-256 hash of the
/// recipient's public key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScriptPubKey(pub Vec<u8>);

impl ScriptPubKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether this script has the standard pay-to-pubkey-hash shape.
    pub fn is_standard(&self) -> bool {
        self.0.len() == 32
    }
}

/// A transaction input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
    /// Witness bytes. Empty while the joint transaction is being assembled.
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    /// The public key that must authorize spending `prevout`.
    pub prev_pubkey: PublicKey,
}

impl TxIn {
    pub fn new(prevout: OutPoint, prev_pubkey: PublicKey) -> Self {
        Self {
            prevout,
            script_sig: Vec::new(),
            sequence: SEQUENCE_FINAL,
            prev_pubkey,
        }
    }

    /// Whether the input carries a witness.
    pub fn has_sig(&self) -> bool {
        !self.script_sig.is_empty()
    }
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxOut {
    pub amount: Amount,
    pub script_pubkey: ScriptPubKey,
}

impl TxOut {
    pub fn new(amount: Amount, script_pubkey: ScriptPubKey) -> Self {
        Self {
            amount,
            script_pubkey,
        }
    }
}

/// A transaction: a list of inputs spending prior outputs and a list of
/// newly created outputs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self { inputs, outputs }
    }

    /// Sum of output values; `None` on overflow.
    pub fn total_output_value(&self) -> Option<Amount> {
        self.outputs
            .iter()
            .try_fold(Amount::ZERO, |acc, out| acc.checked_add(out.amount))
    }

    /// Whether every input carries a witness.
    pub fn is_fully_signed(&self) -> bool {
        !self.inputs.is_empty() && self.inputs.iter().all(TxIn::has_sig)
    }

    /// A copy with every input's witness stripped — the form input
    /// signatures commit to.
    pub fn unsigned_clone(&self) -> Transaction {
        let mut tx = self.clone();
        for input in &mut tx.inputs {
            input.script_sig.clear();
        }
        tx
    }

    /// Sort inputs by `(prev_hash, prev_index)` and outputs by
    /// `(amount, script)`, the canonical ordering of a joint transaction.
    pub fn sort_canonically(&mut self) {
        self.inputs.sort_by(|a, b| a.prevout.cmp(&b.prevout));
        self.outputs.sort();
    }
}

/// A participant's collateral: a complete, pre-signed transaction plus the
/// participant-declared total value of its inputs.
///
/// The declared input value stands in for a UTXO-set lookup — collateral
/// validation is deterministic and never consults live chain state. Whether
/// the declaration was honest surfaces when the collateral is submitted to
/// the mempool on the consumption path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralTx {
    pub tx: Transaction,
    pub declared_input_value: Amount,
}

impl CollateralTx {
    pub fn new(tx: Transaction, declared_input_value: Amount) -> Self {
        Self {
            tx,
            declared_input_value,
        }
    }

    /// Declared fee: declared input value minus total output value.
    /// `None` when the declaration does not cover the outputs.
    pub fn declared_fee(&self) -> Option<Amount> {
        self.declared_input_value
            .checked_sub(self.tx.total_output_value()?)
    }
}
