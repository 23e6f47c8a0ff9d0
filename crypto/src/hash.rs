//! Blake2b hashing for transactions and signing digests.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use tumbler_types::{Transaction, TxHash};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash a transaction (witnesses included) to produce its `TxHash`.
pub fn hash_transaction(tx: &Transaction) -> TxHash {
    let bytes = bincode::serialize(tx).expect("transaction is always serializable");
    TxHash::new(blake2b_256(&bytes))
}

/// The digest an input signature commits to: the transaction with every
/// witness stripped, followed by the input index (little-endian).
///
/// Stripping all witnesses makes the digest identical for every signer of
/// a joint transaction regardless of which inputs were populated first.
pub fn input_signing_digest(tx: &Transaction, input_index: u32) -> [u8; 32] {
    let unsigned = tx.unsigned_clone();
    let bytes = bincode::serialize(&unsigned).expect("transaction is always serializable");
    blake2b_256_multi(&[&bytes, &input_index.to_le_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumbler_types::{Amount, OutPoint, PublicKey, ScriptPubKey, TxIn, TxOut};

    fn sample_tx() -> Transaction {
        Transaction::new(
            vec![TxIn::new(
                OutPoint::new(TxHash::new([1u8; 32]), 0),
                PublicKey([2u8; 32]),
            )],
            vec![TxOut::new(
                Amount::from_coins(1),
                ScriptPubKey::new(vec![3u8; 32]),
            )],
        )
    }

    #[test]
    fn blake2b_deterministic() {
        let h1 = blake2b_256(b"hello tumbler");
        let h2 = blake2b_256(b"hello tumbler");
        assert_eq!(h1, h2);
    }

    #[test]
    fn blake2b_different_inputs() {
        assert_ne!(blake2b_256(b"hello"), blake2b_256(b"world"));
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn transaction_hash_changes_with_witness() {
        let mut tx = sample_tx();
        let unsigned_hash = hash_transaction(&tx);
        tx.inputs[0].script_sig = vec![0xAB; 64];
        assert_ne!(hash_transaction(&tx), unsigned_hash);
    }

    #[test]
    fn signing_digest_ignores_witnesses() {
        let mut tx = sample_tx();
        let before = input_signing_digest(&tx, 0);
        tx.inputs[0].script_sig = vec![0xAB; 64];
        assert_eq!(input_signing_digest(&tx, 0), before);
    }

    #[test]
    fn signing_digest_differs_per_input_index() {
        let tx = sample_tx();
        assert_ne!(input_signing_digest(&tx, 0), input_signing_digest(&tx, 1));
    }
}
