//! Interface to transaction validation and mempool admission.
//!
//! The coordinator never blocks on chain state: submission is attempted
//! with a non-blocking try-lock on the host's chain lock, surfaced here
//! as [`SubmitOutcome::Busy`]. A busy outcome defers the transition and
//! is retried on the next maintenance tick.

use tumbler_types::Transaction;

/// Result of a mempool submission attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted into the mempool; the host layer relays it network-wide.
    Accepted,
    /// Validation failed (e.g. an input is already spent).
    Rejected(String),
    /// The chain lock could not be acquired without blocking; retry later.
    Busy,
}

/// External collaborator performing transaction validation and mempool
/// admission on behalf of the coordinator.
pub trait TxSubmitter: Send + Sync {
    fn try_submit(&self, tx: &Transaction) -> SubmitOutcome;
}
