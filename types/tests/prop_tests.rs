use proptest::prelude::*;

use tumbler_types::{
    amount_to_denomination, denomination_to_amount, denominations_of_outputs,
    is_valid_denomination, outside_validity_window, standard_denominations, Amount, OutPoint,
    ScriptPubKey, Transaction, TxHash, TxIn, TxOut,
};

fn arb_outpoint() -> impl Strategy<Value = OutPoint> {
    (prop::array::uniform32(0u8..), any::<u32>())
        .prop_map(|(bytes, index)| OutPoint::new(TxHash::new(bytes), index))
}

proptest! {
    /// TxHash roundtrip: new -> as_bytes -> new produces identical hash.
    #[test]
    fn tx_hash_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        prop_assert_eq!(hash.as_bytes(), &bytes);
    }

    /// TxHash::is_zero is true only for all-zero bytes.
    #[test]
    fn tx_hash_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        prop_assert_eq!(hash.is_zero(), bytes == [0u8; 32]);
    }

    /// TxHash bincode serialization roundtrip.
    #[test]
    fn tx_hash_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = TxHash::new(bytes);
        let encoded = bincode::serialize(&hash).unwrap();
        let decoded: TxHash = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded.as_bytes(), hash.as_bytes());
    }

    /// OutPoint ordering matches lexicographic (txid, index) ordering.
    #[test]
    fn outpoint_ordering_lexicographic(a in arb_outpoint(), b in arb_outpoint()) {
        let manual = a.txid.cmp(&b.txid).then(a.index.cmp(&b.index));
        prop_assert_eq!(a.cmp(&b), manual);
    }

    /// The validity window agrees with manual arithmetic and is symmetric
    /// around `now`: a skew of exactly the window passes, one second more
    /// fails, in both directions.
    #[test]
    fn validity_window_matches_skew(
        now in 0i64..2_000_000_000,
        window in 1i64..3600,
        skew in -10_000i64..10_000,
    ) {
        let timestamp = now - skew;
        prop_assert_eq!(
            outside_validity_window(timestamp, now, window),
            skew.abs() > window
        );
        prop_assert_eq!(
            outside_validity_window(now + skew, now, window),
            outside_validity_window(now - skew, now, window)
        );
    }

    /// Amount checked_add agrees with u64 checked_add.
    #[test]
    fn amount_checked_add_matches_u64(a in any::<u64>(), b in any::<u64>()) {
        let sum = Amount::new(a).checked_add(Amount::new(b));
        prop_assert_eq!(sum.map(|s| s.raw()), a.checked_add(b));
    }

    /// Every standard amount round-trips through its denomination code,
    /// and a single output of that amount summarizes to exactly that code.
    #[test]
    fn denomination_code_roundtrip(i in 0usize..4) {
        let amount = standard_denominations()[i];
        let code = amount_to_denomination(amount).unwrap();
        prop_assert!(is_valid_denomination(code));
        prop_assert_eq!(denomination_to_amount(code), Some(amount));

        let outputs = vec![TxOut::new(amount, ScriptPubKey::new(vec![0u8; 32]))];
        prop_assert_eq!(denominations_of_outputs(&outputs), code);
    }

    /// Canonical sorting is idempotent and preserves multiset of prevouts.
    #[test]
    fn canonical_sort_idempotent(outpoints in prop::collection::vec(arb_outpoint(), 0..12)) {
        let inputs: Vec<TxIn> = outpoints
            .iter()
            .map(|&p| TxIn::new(p, tumbler_types::PublicKey([0u8; 32])))
            .collect();
        let mut tx = Transaction::new(inputs, Vec::new());
        tx.sort_canonically();
        let once: Vec<_> = tx.inputs.iter().map(|i| i.prevout).collect();
        tx.sort_canonically();
        let twice: Vec<_> = tx.inputs.iter().map(|i| i.prevout).collect();
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.windows(2).all(|w| w[0] <= w[1]));

        let mut expected = outpoints.clone();
        expected.sort();
        prop_assert_eq!(once, expected);
    }
}
