//! Fundamental types for the tumbler mixing protocol.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: amounts, hashes, outpoints, transactions, keys, timestamps,
//! the denomination catalog, and the protocol constants.

pub mod amount;
pub mod denomination;
pub mod hash;
pub mod keys;
pub mod outpoint;
pub mod params;
pub mod time;
pub mod transaction;

pub use amount::{Amount, COIN};
pub use denomination::{
    amount_to_denomination, denomination_to_amount, denominations_of_outputs,
    is_valid_denomination, smallest_denomination, standard_denominations,
};
pub use hash::TxHash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use outpoint::OutPoint;
pub use time::{outside_validity_window, unix_now_ms, unix_now_secs};
pub use transaction::{CollateralTx, ScriptPubKey, Transaction, TxIn, TxOut};
