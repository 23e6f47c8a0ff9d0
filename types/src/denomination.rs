//! The denomination catalog.
//!
//! Mixing only admits a small fixed set of amounts. A denomination code is
//! a bitset over the standard amounts in descending order: bit 0 is the
//! largest amount, so a set of outputs can be summarized by OR-ing the
//! single-bit codes of each output's amount. A session is labeled by a
//! single-bit code.

use crate::amount::{Amount, COIN};
use crate::transaction::TxOut;

/// The standard denominations, largest first: 10, 1, 0.1, 0.01 coins.
const STANDARD_DENOMINATIONS: [Amount; 4] = [
    Amount::new(10 * COIN),
    Amount::new(COIN),
    Amount::new(COIN / 10),
    Amount::new(COIN / 100),
];

/// The standard mixing amounts in descending order.
pub fn standard_denominations() -> &'static [Amount] {
    &STANDARD_DENOMINATIONS
}

/// The smallest standard denomination.
pub fn smallest_denomination() -> Amount {
    STANDARD_DENOMINATIONS[STANDARD_DENOMINATIONS.len() - 1]
}

/// Whether `code` labels exactly one standard denomination.
pub fn is_valid_denomination(code: u32) -> bool {
    code.count_ones() == 1 && (code.trailing_zeros() as usize) < STANDARD_DENOMINATIONS.len()
}

/// The amount a single-bit denomination code stands for.
pub fn denomination_to_amount(code: u32) -> Option<Amount> {
    if !is_valid_denomination(code) {
        return None;
    }
    Some(STANDARD_DENOMINATIONS[code.trailing_zeros() as usize])
}

/// The single-bit code for a standard amount, if it is one.
pub fn amount_to_denomination(amount: Amount) -> Option<u32> {
    STANDARD_DENOMINATIONS
        .iter()
        .position(|&denom| denom == amount)
        .map(|i| 1u32 << i)
}

/// Summarize a set of outputs as the OR of each output's single-bit code.
///
/// Outputs whose amount is not a standard denomination contribute nothing.
pub fn denominations_of_outputs(outputs: &[TxOut]) -> u32 {
    outputs
        .iter()
        .filter_map(|out| amount_to_denomination(out.amount))
        .fold(0, |acc, bit| acc | bit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::ScriptPubKey;

    fn out(amount: Amount) -> TxOut {
        TxOut::new(amount, ScriptPubKey::new(vec![0u8; 32]))
    }

    #[test]
    fn catalog_is_descending() {
        let denoms = standard_denominations();
        assert!(denoms.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn smallest_is_one_hundredth_coin() {
        assert_eq!(smallest_denomination(), Amount::new(COIN / 100));
    }

    #[test]
    fn single_bit_codes_are_valid() {
        for bit in 0..4 {
            assert!(is_valid_denomination(1 << bit));
        }
    }

    #[test]
    fn multi_bit_and_out_of_range_codes_are_invalid() {
        assert!(!is_valid_denomination(0));
        assert!(!is_valid_denomination(0b11));
        assert!(!is_valid_denomination(1 << 4));
    }

    #[test]
    fn code_amount_roundtrip() {
        for &amount in standard_denominations() {
            let code = amount_to_denomination(amount).unwrap();
            assert_eq!(denomination_to_amount(code), Some(amount));
        }
    }

    #[test]
    fn non_standard_amount_has_no_code() {
        assert_eq!(amount_to_denomination(Amount::new(42)), None);
    }

    #[test]
    fn outputs_summarize_to_or_of_bits() {
        let outputs = vec![
            out(Amount::from_coins(10)),
            out(Amount::new(COIN / 10)),
            out(Amount::new(COIN / 10)),
        ];
        assert_eq!(denominations_of_outputs(&outputs), 0b101);
    }

    #[test]
    fn non_denomination_outputs_are_ignored() {
        let outputs = vec![out(Amount::new(12345)), out(Amount::from_coins(1))];
        assert_eq!(denominations_of_outputs(&outputs), 0b10);
    }

    #[test]
    fn empty_outputs_summarize_to_zero() {
        assert_eq!(denominations_of_outputs(&[]), 0);
    }
}
