//! A participant's contribution to a mixing session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tumbler_network::PeerId;
use tumbler_types::{CollateralTx, TxIn, TxOut};

/// Shared handle to an admitted collateral. The session and the
/// fee-consumption path hold references; the contents never mutate.
pub type CollateralRef = Arc<CollateralTx>;

/// A session input together with its signing status.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MixInput {
    pub txin: TxIn,
    /// Set once the participant's witness for this input has been accepted.
    pub has_sig: bool,
}

impl MixInput {
    pub fn new(txin: TxIn) -> Self {
        Self {
            txin,
            has_sig: false,
        }
    }
}

/// One participant's admitted contribution: inputs, outputs, and the
/// collateral backing them. Immutable after admission except that empty
/// input witnesses are populated during the signing phase.
#[derive(Clone, Debug)]
pub struct Entry {
    /// Where status updates and the final transaction are sent.
    pub participant: PeerId,
    pub collateral: CollateralRef,
    pub inputs: Vec<MixInput>,
    pub outputs: Vec<TxOut>,
}

impl Entry {
    pub fn new(
        participant: PeerId,
        collateral: CollateralRef,
        inputs: Vec<TxIn>,
        outputs: Vec<TxOut>,
    ) -> Self {
        Self {
            participant,
            collateral,
            inputs: inputs.into_iter().map(MixInput::new).collect(),
            outputs,
        }
    }

    /// Record a participant's witness: find the input with matching
    /// outpoint and sequence, set its script. Returns false when the
    /// input is already signed or nothing matches.
    pub fn add_script_sig(&mut self, txin: &TxIn) -> bool {
        for input in &mut self.inputs {
            if input.txin.prevout == txin.prevout && input.txin.sequence == txin.sequence {
                if input.has_sig {
                    return false;
                }
                input.txin.script_sig = txin.script_sig.clone();
                input.has_sig = true;
                return true;
            }
        }
        false
    }

    /// Whether every input of this entry has been signed.
    pub fn is_fully_signed(&self) -> bool {
        self.inputs.iter().all(|i| i.has_sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumbler_types::{Amount, OutPoint, PublicKey, ScriptPubKey, Transaction, TxHash};

    fn txin(byte: u8, index: u32) -> TxIn {
        TxIn::new(
            OutPoint::new(TxHash::new([byte; 32]), index),
            PublicKey([byte; 32]),
        )
    }

    fn entry_with_inputs(inputs: Vec<TxIn>) -> Entry {
        Entry::new(
            "1.0.0.1:7200".to_string(),
            Arc::new(CollateralTx::new(Transaction::default(), Amount::ZERO)),
            inputs,
            vec![TxOut::new(
                Amount::from_coins(1),
                ScriptPubKey::new(vec![0u8; 32]),
            )],
        )
    }

    fn signed(mut txin: TxIn) -> TxIn {
        txin.script_sig = vec![0xAB; 64];
        txin
    }

    #[test]
    fn add_script_sig_sets_matching_input() {
        let mut entry = entry_with_inputs(vec![txin(1, 0), txin(2, 0)]);
        assert!(entry.add_script_sig(&signed(txin(2, 0))));
        assert!(entry.inputs[1].has_sig);
        assert_eq!(entry.inputs[1].txin.script_sig, vec![0xAB; 64]);
        assert!(!entry.inputs[0].has_sig);
    }

    #[test]
    fn add_script_sig_rejects_double_signing() {
        let mut entry = entry_with_inputs(vec![txin(1, 0)]);
        assert!(entry.add_script_sig(&signed(txin(1, 0))));
        assert!(!entry.add_script_sig(&signed(txin(1, 0))));
    }

    #[test]
    fn add_script_sig_rejects_unknown_outpoint() {
        let mut entry = entry_with_inputs(vec![txin(1, 0)]);
        assert!(!entry.add_script_sig(&signed(txin(9, 0))));
    }

    #[test]
    fn add_script_sig_requires_matching_sequence() {
        let mut entry = entry_with_inputs(vec![txin(1, 0)]);
        let mut mismatched = signed(txin(1, 0));
        mismatched.sequence = 0;
        assert!(!entry.add_script_sig(&mismatched));
    }

    #[test]
    fn fully_signed_tracks_all_inputs() {
        let mut entry = entry_with_inputs(vec![txin(1, 0), txin(2, 0)]);
        assert!(!entry.is_fully_signed());
        entry.add_script_sig(&signed(txin(1, 0)));
        assert!(!entry.is_fully_signed());
        entry.add_script_sig(&signed(txin(2, 0)));
        assert!(entry.is_fully_signed());
    }
}
