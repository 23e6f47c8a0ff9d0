//! The per-coordinator mixing session.
//!
//! `Session` holds the pure state of one mixing round and the transitions
//! over it: admission bookkeeping, entry validation, joint-transaction
//! assembly, and witness collection. Everything with a side effect beyond
//! this struct (relaying, collateral consumption, mempool submission)
//! lives in [`crate::server`]; rejection values carry a
//! `consume_collateral` flag so the caller can punish where the protocol
//! demands it.

use tumbler_crypto::input_signing_digest;
use tumbler_messages::{PoolReason, PoolState, QueueAdvertisement};
use tumbler_types::params::MAX_ENTRY_INPUTS;
use tumbler_types::{amount_to_denomination, OutPoint, Signature, Transaction, TxIn};

use crate::entry::{CollateralRef, Entry};

/// Why an entry was refused, and whether the offender's collateral is
/// forfeit for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryRejection {
    pub reason: PoolReason,
    pub consume_collateral: bool,
}

impl EntryRejection {
    fn new(reason: PoolReason) -> Self {
        Self {
            reason,
            consume_collateral: false,
        }
    }

    fn punished(reason: PoolReason) -> Self {
        Self {
            reason,
            consume_collateral: true,
        }
    }
}

/// State of one mixing round on this coordinator.
///
/// Invariants (hold between any two public calls):
/// * `id != 0` iff `state != Idle`;
/// * `entries.len() <= collaterals.len()`;
/// * `final_tx.is_some()` iff `state == Signing`;
/// * no two entries share an input outpoint.
pub struct Session {
    state: PoolState,
    id: u32,
    denom: u32,
    /// One collateral per admitted participant, in admission order.
    pub collaterals: Vec<CollateralRef>,
    /// Contributions received while accepting entries.
    pub entries: Vec<Entry>,
    final_tx: Option<Transaction>,
    /// Monotonic timestamp (ms) of the last successful transition.
    last_step_time_ms: i64,
    /// Deduplication buffer of queue advertisements seen on the network,
    /// our own included.
    pub seen_queues: Vec<QueueAdvertisement>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: PoolState::Idle,
            id: 0,
            denom: 0,
            collaterals: Vec::new(),
            entries: Vec::new(),
            final_tx: None,
            last_step_time_ms: 0,
            seen_queues: Vec::new(),
        }
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn denom(&self) -> u32 {
        self.denom
    }

    pub fn final_tx(&self) -> Option<&Transaction> {
        self.final_tx.as_ref()
    }

    pub fn entries_count(&self) -> usize {
        self.entries.len()
    }

    pub fn collaterals_count(&self) -> usize {
        self.collaterals.len()
    }

    pub fn last_step_time_ms(&self) -> i64 {
        self.last_step_time_ms
    }

    /// Move to a new state and stamp the step time. `Error` and `Success`
    /// are client-side states; a coordinator refuses to enter them.
    pub fn set_state(&mut self, new_state: PoolState, now_ms: i64) {
        if matches!(new_state, PoolState::Error | PoolState::Success) {
            tracing::warn!(state = new_state.label(), "refusing client-side pool state");
            return;
        }
        tracing::debug!(from = self.state.label(), to = new_state.label(), "pool state change");
        self.last_step_time_ms = now_ms;
        self.state = new_state;
    }

    /// Open a fresh session: assign the id and denomination, admit the
    /// first collateral, and move to Queue.
    pub fn open(&mut self, id: u32, denom: u32, collateral: CollateralRef, now_ms: i64) {
        debug_assert_eq!(self.state, PoolState::Idle);
        debug_assert_ne!(id, 0);
        self.id = id;
        self.denom = denom;
        self.collaterals.push(collateral);
        self.set_state(PoolState::Queue, now_ms);
    }

    /// Admit another participant's collateral while queueing.
    pub fn push_collateral(&mut self, collateral: CollateralRef) {
        self.collaterals.push(collateral);
    }

    /// Drop all round state and return to Idle.
    pub fn reset(&mut self, now_ms: i64) {
        self.state = PoolState::Idle;
        self.id = 0;
        self.denom = 0;
        self.collaterals.clear();
        self.entries.clear();
        self.final_tx = None;
        self.seen_queues.clear();
        self.last_step_time_ms = now_ms;
    }

    /// Whether the current phase outlived its timeout.
    pub fn has_timed_out(
        &self,
        now_ms: i64,
        queue_timeout_secs: i64,
        signing_timeout_secs: i64,
    ) -> bool {
        if self.state == PoolState::Idle {
            return false;
        }
        let timeout_secs = if self.state == PoolState::Signing {
            signing_timeout_secs
        } else {
            queue_timeout_secs
        };
        now_ms - self.last_step_time_ms >= timeout_secs * 1000
    }

    /// Whether any admitted entry already spends `prevout`.
    pub fn has_input(&self, prevout: &OutPoint) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.inputs.iter().any(|i| i.txin.prevout == *prevout))
    }

    /// Validate and admit a contribution.
    ///
    /// Rejection order and punishments follow the pool protocol: a full
    /// pool, an invalid collateral, and duplicate inputs are refused
    /// without charge (a duplicate could be someone replaying a victim's
    /// inputs to force a charge); an oversized entry and malformed
    /// scripts forfeit the collateral.
    pub fn add_entry(&mut self, entry: Entry) -> Result<(), EntryRejection> {
        if self.entries.len() >= self.collaterals.len() {
            return Err(EntryRejection::new(PoolReason::EntriesFull));
        }

        if !crate::collateral::is_collateral_valid(&entry.collateral) {
            return Err(EntryRejection::new(PoolReason::InvalidCollateral));
        }

        if entry.inputs.len() > MAX_ENTRY_INPUTS {
            return Err(EntryRejection::punished(PoolReason::Maximum));
        }

        for (i, input) in entry.inputs.iter().enumerate() {
            let in_pool = self.has_input(&input.txin.prevout);
            let in_entry = entry.inputs[..i]
                .iter()
                .any(|prev| prev.txin.prevout == input.txin.prevout);
            if in_pool || in_entry {
                return Err(EntryRejection::new(PoolReason::AlreadyHave));
            }
        }

        self.check_in_outs(&entry)?;

        tracing::debug!(
            participant = %entry.participant,
            inputs = entry.inputs.len(),
            entries = self.entries.len() + 1,
            "entry admitted"
        );
        self.entries.push(entry);
        Ok(())
    }

    /// Shape validation of an entry's inputs and outputs against the
    /// session denomination.
    fn check_in_outs(&self, entry: &Entry) -> Result<(), EntryRejection> {
        if entry.inputs.is_empty() || entry.inputs.len() != entry.outputs.len() {
            return Err(EntryRejection::new(PoolReason::InvalidInput));
        }

        for out in &entry.outputs {
            if out.script_pubkey.as_bytes().is_empty() {
                return Err(EntryRejection::punished(PoolReason::InvalidScript));
            }
            if !out.script_pubkey.is_standard() {
                return Err(EntryRejection::punished(PoolReason::NonStandardPubkey));
            }
            if amount_to_denomination(out.amount) != Some(self.denom) {
                return Err(EntryRejection::new(PoolReason::Denom));
            }
        }

        Ok(())
    }

    /// Concatenate every entry's inputs and outputs into the joint
    /// transaction, canonically ordered.
    pub fn assemble_final_tx(&self) -> Transaction {
        let mut tx = Transaction::default();
        for entry in &self.entries {
            for out in &entry.outputs {
                tx.outputs.push(out.clone());
            }
            for input in &entry.inputs {
                tx.inputs.push(input.txin.clone());
            }
        }
        tx.sort_canonically();
        tx
    }

    /// Install the assembled joint transaction and enter Signing.
    pub fn begin_signing(&mut self, final_tx: Transaction, now_ms: i64) {
        self.final_tx = Some(final_tx);
        self.set_state(PoolState::Signing, now_ms);
    }

    /// Accept one participant witness: reject duplicated witness bytes,
    /// verify the signature against the joint transaction at the matching
    /// input, then populate both the joint transaction and the entry.
    pub fn add_script_sig(&mut self, txin: &TxIn) -> bool {
        let duplicate = self.entries.iter().any(|entry| {
            entry
                .inputs
                .iter()
                .any(|i| i.has_sig && i.txin.script_sig == txin.script_sig)
        });
        if duplicate {
            tracing::debug!("witness rejected: script sig already present");
            return false;
        }

        let Some(final_tx) = self.final_tx.as_mut() else {
            return false;
        };

        let Some(index) = final_tx
            .inputs
            .iter()
            .position(|i| i.prevout == txin.prevout && i.sequence == txin.sequence)
        else {
            tracing::debug!(prevout = %txin.prevout, "witness rejected: no matching input in pool");
            return false;
        };

        let Ok(sig_bytes) = <[u8; 64]>::try_from(txin.script_sig.as_slice()) else {
            tracing::debug!("witness rejected: malformed signature bytes");
            return false;
        };

        let digest = input_signing_digest(final_tx, index as u32);
        let prev_pubkey = &final_tx.inputs[index].prev_pubkey;
        if !tumbler_crypto::verify_signature(&digest, &Signature(sig_bytes), prev_pubkey) {
            tracing::debug!(input = index, "witness rejected: signature verification failed");
            return false;
        }

        final_tx.inputs[index].script_sig = txin.script_sig.clone();

        for entry in &mut self.entries {
            if entry.add_script_sig(txin) {
                return true;
            }
        }

        tracing::debug!(prevout = %txin.prevout, "witness verified but owned by no entry");
        false
    }

    /// Whether every input of every entry has been signed.
    pub fn is_signatures_complete(&self) -> bool {
        self.entries.iter().all(Entry::is_fully_signed)
    }

    /// Drop advertisements whose validity window has passed.
    pub fn purge_expired_queues(&mut self, now_unix: i64) {
        let before = self.seen_queues.len();
        self.seen_queues.retain(|q| !q.is_time_out_of_bounds(now_unix));
        let purged = before - self.seen_queues.len();
        if purged > 0 {
            tracing::debug!(purged, "expired queue advertisements purged");
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
