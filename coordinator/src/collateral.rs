//! Collateral validation.
//!
//! A collateral is a small, fully signed transaction a participant pledges
//! when joining a session. It is only ever submitted to the mempool as a
//! punishment. Validation here is deterministic and never consults live
//! chain state; whether the inputs are still unspent surfaces on the
//! consumption path.

use tumbler_types::params::{collateral_fee, MAX_COLLATERAL_SIZE};
use tumbler_types::CollateralTx;

/// Whether a proposed collateral satisfies the fee/size/shape rules.
pub fn is_collateral_valid(collateral: &CollateralTx) -> bool {
    let tx = &collateral.tx;

    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        tracing::debug!("collateral rejected: empty inputs or outputs");
        return false;
    }

    if !tx.is_fully_signed() {
        tracing::debug!("collateral rejected: not fully signed");
        return false;
    }

    // Structural validity: no input may be spent twice within the tx.
    for (i, input) in tx.inputs.iter().enumerate() {
        if tx.inputs[..i].iter().any(|prev| prev.prevout == input.prevout) {
            tracing::debug!(prevout = %input.prevout, "collateral rejected: duplicate input");
            return false;
        }
    }

    if tx.outputs.iter().any(|out| !out.script_pubkey.is_standard()) {
        tracing::debug!("collateral rejected: non-standard output script");
        return false;
    }

    match bincode::serialized_size(tx) {
        Ok(size) if size as usize <= MAX_COLLATERAL_SIZE => {}
        _ => {
            tracing::debug!("collateral rejected: oversized");
            return false;
        }
    }

    match collateral.declared_fee() {
        Some(fee) if fee >= collateral_fee() => true,
        Some(fee) => {
            tracing::debug!(%fee, required = %collateral_fee(), "collateral rejected: fee too low");
            false
        }
        None => {
            tracing::debug!("collateral rejected: declared inputs do not cover outputs");
            false
        }
    }
}
