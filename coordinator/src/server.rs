//! The mixing coordinator server: session admission, fee charging, joint
//! transaction assembly, and mempool commitment.
//!
//! All methods are called from the actor's single worker task; nothing in
//! here suspends. Mempool submission is non-blocking — a busy chain lock
//! defers the transition to the next maintenance tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tumbler_crypto::hash_transaction;
use tumbler_messages::{MixMessage, PoolReason, PoolState, QueueAdvertisement, SignedFinalTx};
use tumbler_network::{broadcast_to_all, PeerTable};

use crate::config::CoordinatorConfig;
use crate::dstx::SignedTxIndex;
use crate::entry::{CollateralRef, Entry};
use crate::ledger::AdvertisementLedger;
use crate::registry::{CoordinatorIdentity, CoordinatorRegistry};
use crate::rng::MixRng;
use crate::session::{EntryRejection, Session};
use crate::submit::{SubmitOutcome, TxSubmitter};
use tumbler_types::CollateralTx;

/// Shared flag tracking whether the chain is synced. Mixing operations
/// fail silently until it is set.
#[derive(Clone)]
pub struct SyncFlag(Arc<AtomicBool>);

impl SyncFlag {
    pub fn new(synced: bool) -> Self {
        Self(Arc::new(AtomicBool::new(synced)))
    }

    pub fn is_synced(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, synced: bool) {
        self.0.store(synced, Ordering::Relaxed);
    }
}

/// The coordinator's server-side mixing machine and its collaborators.
pub struct CoordinatorServer {
    pub(crate) config: CoordinatorConfig,
    pub(crate) identity: CoordinatorIdentity,
    pub(crate) registry: Arc<CoordinatorRegistry>,
    pub(crate) session: Session,
    /// Connected peers; registered and removed by the connection layer.
    pub peers: PeerTable,
    pub(crate) ledger: AdvertisementLedger,
    pub(crate) dstx_index: Arc<SignedTxIndex>,
    pub(crate) submitter: Arc<dyn TxSubmitter>,
    pub(crate) rng: Box<dyn MixRng>,
    pub(crate) sync: SyncFlag,
}

impl CoordinatorServer {
    pub fn new(
        config: CoordinatorConfig,
        identity: CoordinatorIdentity,
        registry: Arc<CoordinatorRegistry>,
        dstx_index: Arc<SignedTxIndex>,
        submitter: Arc<dyn TxSubmitter>,
        rng: Box<dyn MixRng>,
        sync: SyncFlag,
    ) -> Self {
        Self {
            config,
            identity,
            registry,
            session: Session::new(),
            peers: PeerTable::new(),
            ledger: AdvertisementLedger::new(),
            dstx_index,
            submitter,
            rng,
            sync,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn ledger(&self) -> &AdvertisementLedger {
        &self.ledger
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Whether the mixing machine may act at all: coordinator mode is on
    /// and the chain is synced.
    pub(crate) fn is_active(&self) -> bool {
        self.config.coordinator_mode && self.sync.is_synced()
    }

    // ── Admission ───────────────────────────────────────────────────────

    /// Denomination and collateral gate shared by session creation and
    /// joining.
    fn is_acceptable_accept(
        &self,
        denom: u32,
        collateral: &CollateralTx,
    ) -> Result<(), PoolReason> {
        if !tumbler_types::is_valid_denomination(denom) {
            tracing::debug!(denom, "accept rejected: denomination not valid");
            return Err(PoolReason::Denom);
        }
        if !crate::collateral::is_collateral_valid(collateral) {
            tracing::debug!("accept rejected: collateral not valid");
            return Err(PoolReason::InvalidCollateral);
        }
        Ok(())
    }

    /// Open a new session for the first participant: draw a fresh id,
    /// admit the collateral, and advertise a not-ready queue.
    pub fn create_new_session(
        &mut self,
        denom: u32,
        collateral: CollateralTx,
        now_ms: i64,
    ) -> Result<PoolReason, PoolReason> {
        if !self.is_active() || self.session.id() != 0 {
            return Err(PoolReason::Mode);
        }
        if self.session.state() != PoolState::Idle {
            tracing::debug!(state = self.session.state().label(), "incompatible mode");
            return Err(PoolReason::Mode);
        }
        self.is_acceptable_accept(denom, &collateral)?;

        let id = self.rng.session_id();
        self.session.open(id, denom, Arc::new(collateral), now_ms);

        // Broadcast that we are accepting entries, only for the first
        // participant through.
        let mut dsq = QueueAdvertisement::new(denom, self.identity.outpoint, now_ms / 1000, false);
        dsq.sign(&self.identity.keys.private);
        tracing::info!(
            session_id = id,
            denom,
            time = dsq.timestamp_unix,
            "new session created, signing and relaying queue"
        );
        self.relay_queue(&dsq);
        self.session.seen_queues.push(dsq);
        self.ledger.observe(self.identity.outpoint);

        Ok(PoolReason::NoErr)
    }

    /// Admit a further participant into a queued session.
    pub fn add_user_to_existing_session(
        &mut self,
        denom: u32,
        collateral: CollateralTx,
        now_ms: i64,
    ) -> Result<PoolReason, PoolReason> {
        if !self.is_active() || self.session.id() == 0 || self.is_session_ready(now_ms) {
            return Err(PoolReason::Mode);
        }
        self.is_acceptable_accept(denom, &collateral)?;

        if self.session.state() != PoolState::Queue {
            tracing::debug!(state = self.session.state().label(), "incompatible mode");
            return Err(PoolReason::Mode);
        }
        if denom != self.session.denom() {
            tracing::debug!(
                denom,
                session_denom = self.session.denom(),
                "incompatible denomination"
            );
            return Err(PoolReason::Denom);
        }

        self.session.push_collateral(Arc::new(collateral));
        tracing::info!(
            session_id = self.session.id(),
            participants = self.session.collaterals_count(),
            "new user accepted"
        );
        Ok(PoolReason::NoErr)
    }

    /// True once max participants queued, or the queue timed out with at
    /// least the minimum — and always while accepting entries.
    pub fn is_session_ready(&self, now_ms: i64) -> bool {
        match self.session.state() {
            PoolState::Queue => {
                let participants = self.session.collaterals_count();
                participants >= self.config.max_pool_participants
                    || (self.has_timed_out(now_ms)
                        && participants >= self.config.min_pool_participants)
            }
            PoolState::AcceptingEntries => true,
            _ => false,
        }
    }

    /// Admit a contribution, consuming the collateral when the rejection
    /// warrants it.
    pub fn add_entry(&mut self, entry: Entry) -> Result<(), EntryRejection> {
        let collateral = entry.collateral.clone();
        match self.session.add_entry(entry) {
            Ok(()) => Ok(()),
            Err(rejection) => {
                if rejection.consume_collateral {
                    self.consume_collateral(&collateral);
                }
                Err(rejection)
            }
        }
    }

    pub fn has_timed_out(&self, now_ms: i64) -> bool {
        self.session.has_timed_out(
            now_ms,
            self.config.queue_timeout_secs,
            self.config.signing_timeout_secs,
        )
    }

    // ── Pool progression ────────────────────────────────────────────────

    /// Drive phase transitions based on counts and timeouts.
    pub fn check_pool(&mut self, now_ms: i64) {
        if !self.is_active() {
            return;
        }

        // If we have an entry for each collateral, create the final tx.
        if self.session.state() == PoolState::AcceptingEntries
            && self.session.entries_count() == self.session.collaterals_count()
        {
            tracing::debug!("pool complete, finalizing transaction");
            self.create_final_transaction(now_ms);
            return;
        }

        // Timed out while accepting entries: proceed with the minimum,
        // punishing whoever never delivered.
        if self.session.state() == PoolState::AcceptingEntries
            && self.has_timed_out(now_ms)
            && self.session.entries_count() >= self.config.min_pool_participants
        {
            tracing::debug!("pool timed out with enough entries, finalizing without laggards");
            self.charge_fees();
            self.create_final_transaction(now_ms);
            return;
        }

        // All signatures in: commit.
        if self.session.state() == PoolState::Signing && self.session.is_signatures_complete() {
            tracing::debug!("signatures complete, committing final transaction");
            self.commit_final_transaction(now_ms);
        }
    }

    /// Assemble the joint transaction, enter Signing, and hand it to every
    /// participant.
    fn create_final_transaction(&mut self, now_ms: i64) {
        let final_tx = self.session.assemble_final_tx();
        tracing::info!(
            session_id = self.session.id(),
            inputs = final_tx.inputs.len(),
            outputs = final_tx.outputs.len(),
            "final transaction assembled, requesting signatures"
        );
        self.session.begin_signing(final_tx.clone(), now_ms);
        self.relay_final_transaction(&final_tx, now_ms);
    }

    /// Submit the fully signed joint transaction. A busy chain lock leaves
    /// the session in Signing for the next tick to retry; a validation
    /// failure abandons the session.
    fn commit_final_transaction(&mut self, now_ms: i64) {
        let Some(final_tx) = self.session.final_tx().cloned() else {
            return;
        };

        match self.submitter.try_submit(&final_tx) {
            SubmitOutcome::Busy => {
                tracing::debug!("chain lock busy, deferring final tx commit to next tick");
            }
            SubmitOutcome::Rejected(reason) => {
                tracing::warn!(%reason, "mempool rejected final transaction, resetting");
                self.relay_completed_transaction(PoolReason::InvalidTx, now_ms);
                self.session.reset(now_ms);
            }
            SubmitOutcome::Accepted => {
                let hash = hash_transaction(&final_tx);
                if !self.dstx_index.contains(&hash) {
                    let mut dstx =
                        SignedFinalTx::new(final_tx, self.identity.outpoint, now_ms / 1000);
                    dstx.sign(&self.identity.keys.private);
                    self.dstx_index.add(dstx);
                }
                tracing::info!(%hash, session_id = self.session.id(), "final transaction committed, transmitting record");
                if let Some(dstx) = self.dstx_index.get(&hash) {
                    self.relay_message(&MixMessage::SignedTx(dstx));
                }

                self.relay_completed_transaction(PoolReason::Success, now_ms);
                self.charge_random_fees();
                tracing::info!("session completed, resetting");
                self.session.reset(now_ms);
            }
        }
    }

    // ── Fee charging ────────────────────────────────────────────────────

    /// Punish non-cooperating participants by consuming one offender's
    /// collateral, with the pool's traditional leniency coin flips.
    pub fn charge_fees(&mut self) {
        if !self.is_active() {
            return;
        }

        // No need to charge collateral for every offence.
        if !self.rng.roll(33) {
            return;
        }

        let mut offenders: Vec<CollateralRef> = Vec::new();

        if self.session.state() == PoolState::AcceptingEntries {
            for collateral in &self.session.collaterals {
                let delivered = self
                    .session
                    .entries
                    .iter()
                    .any(|entry| *entry.collateral == **collateral);
                if !delivered {
                    tracing::debug!("found uncooperative participant (never sent entry)");
                    offenders.push(collateral.clone());
                }
            }
        }

        if self.session.state() == PoolState::Signing {
            for entry in &self.session.entries {
                if entry.inputs.iter().any(|i| !i.has_sig) {
                    tracing::debug!(participant = %entry.participant, "found uncooperative participant (never signed)");
                    offenders.push(entry.collateral.clone());
                }
            }
        }

        if offenders.is_empty() {
            return;
        }

        // Mostly offending? Charge only sometimes.
        if offenders.len() + 1 >= self.session.collaterals_count() && !self.rng.roll(33) {
            return;
        }

        // Everyone an offender? That's not right.
        if offenders.len() >= self.session.collaterals_count() {
            return;
        }

        let victim = self.rng.pick(offenders.len());
        tracing::info!(
            offenders = offenders.len(),
            "charging one offender's collateral"
        );
        let collateral = offenders[victim].clone();
        self.consume_collateral(&collateral);
    }

    /// Mixing itself is free; after a successful round each collateral is
    /// independently consumed with 1-in-10 probability to fund miners and
    /// keep spam costly.
    pub fn charge_random_fees(&mut self) {
        if !self.is_active() {
            return;
        }
        let collaterals: Vec<CollateralRef> = self.session.collaterals.clone();
        for collateral in &collaterals {
            if self.rng.roll(10) {
                tracing::info!("charging random fee on session collateral");
                self.consume_collateral(collateral);
            }
        }
    }

    /// Submit a collateral to the mempool as a punitive spend. Rejection
    /// (e.g. the participant raced to double-spend the inputs) is logged
    /// and otherwise ignored.
    pub(crate) fn consume_collateral(&mut self, collateral: &CollateralTx) {
        match self.submitter.try_submit(&collateral.tx) {
            SubmitOutcome::Accepted => {
                tracing::info!("collateral consumed; host layer relays the spend");
            }
            SubmitOutcome::Rejected(reason) => {
                tracing::debug!(%reason, "collateral consumption failed");
            }
            SubmitOutcome::Busy => {
                tracing::debug!("chain lock busy, collateral not consumed");
            }
        }
    }

    // ── Maintenance ─────────────────────────────────────────────────────

    /// Advertise readiness once the queue is full.
    pub fn check_for_complete_queue(&mut self, now_ms: i64) {
        if !self.is_active() {
            return;
        }
        if self.session.state() == PoolState::Queue && self.is_session_ready(now_ms) {
            self.session.set_state(PoolState::AcceptingEntries, now_ms);

            let mut dsq = QueueAdvertisement::new(
                self.session.denom(),
                self.identity.outpoint,
                now_ms / 1000,
                true,
            );
            dsq.sign(&self.identity.keys.private);
            tracing::info!(
                session_id = self.session.id(),
                participants = self.session.collaterals_count(),
                "queue is ready, signing and relaying"
            );
            self.relay_queue(&dsq);
            self.session.seen_queues.push(dsq);
        }
    }

    /// Abandon a session whose phase outlived its timeout, charging
    /// offenders and notifying the cooperative participants.
    pub fn check_timeout(&mut self, now_ms: i64) {
        if !self.is_active() {
            return;
        }

        self.session.purge_expired_queues(now_ms / 1000);

        if !self.has_timed_out(now_ms) {
            return;
        }

        tracing::info!(
            state = self.session.state().label(),
            session_id = self.session.id(),
            "session timed out, resetting"
        );

        // Tell the participants who held up their end that the round died.
        let signing = self.session.state() == PoolState::Signing;
        let recipients: Vec<String> = self
            .session
            .entries
            .iter()
            .filter(|entry| !signing || entry.is_fully_signed())
            .map(|entry| entry.participant.clone())
            .collect();
        for participant in &recipients {
            self.push_complete(participant, PoolReason::Session);
        }

        self.charge_fees();
        self.session.reset(now_ms);
    }

    /// The per-tick maintenance sequence.
    pub fn do_maintenance(&mut self, now_ms: i64) {
        if !self.is_active() {
            return;
        }
        self.check_for_complete_queue(now_ms);
        self.check_pool(now_ms);
        self.check_timeout(now_ms);
    }

    // ── Outbound helpers ────────────────────────────────────────────────

    /// Broadcast a wire message to every connected peer.
    pub(crate) fn relay_message(&mut self, msg: &MixMessage) {
        match msg.encode() {
            Ok(bytes) => {
                let result = broadcast_to_all(&self.peers, &bytes);
                tracing::debug!(
                    command = msg.command(),
                    sent = result.sent,
                    failed = result.failed,
                    "message relayed"
                );
            }
            Err(e) => {
                tracing::error!(command = msg.command(), error = %e, "failed to encode relay");
            }
        }
    }

    pub(crate) fn relay_queue(&mut self, dsq: &QueueAdvertisement) {
        self.relay_message(&MixMessage::Queue(dsq.clone()));
    }

    /// Send a completion notice to one participant.
    pub(crate) fn push_complete(&self, participant: &str, reason: PoolReason) {
        let msg = MixMessage::Complete(tumbler_messages::CompleteMessage {
            session_id: self.session.id(),
            reason,
        });
        let Ok(bytes) = msg.encode() else {
            return;
        };
        if let Some(handle) = self.peers.handle(participant) {
            let _ = handle.send(bytes);
        }
    }

    /// Notify every participant that the session completed (successfully
    /// or not). A vanished participant degrades into a rejected status
    /// fanout, like any other broadcast failure.
    pub(crate) fn relay_completed_transaction(&mut self, reason: PoolReason, now_ms: i64) {
        tracing::debug!(
            session_id = self.session.id(),
            reason = ?reason,
            "relaying completion to participants"
        );
        let participants: Vec<String> = self
            .session
            .entries
            .iter()
            .map(|e| e.participant.clone())
            .collect();
        for participant in &participants {
            let gone = self.peers.handle(participant).is_none();
            if gone {
                self.relay_status(
                    tumbler_messages::PoolStatus::Rejected,
                    PoolReason::NoErr,
                    now_ms,
                );
                break;
            }
            self.push_complete(participant, reason);
        }
    }

    /// Hand the assembled joint transaction to each participant for
    /// signing. Any vanished participant aborts the fanout with a
    /// rejected status to the rest.
    pub(crate) fn relay_final_transaction(
        &mut self,
        final_tx: &tumbler_types::Transaction,
        now_ms: i64,
    ) {
        let msg = MixMessage::FinalTx(tumbler_messages::FinalTxMessage {
            session_id: self.session.id(),
            tx: final_tx.clone(),
        });
        let Ok(bytes) = msg.encode() else {
            tracing::error!("failed to encode final transaction");
            return;
        };

        let participants: Vec<String> = self
            .session
            .entries
            .iter()
            .map(|e| e.participant.clone())
            .collect();
        for participant in &participants {
            let delivered = self
                .peers
                .handle(participant)
                .map(|handle| handle.send(bytes.clone()).is_ok())
                .unwrap_or(false);
            if !delivered {
                tracing::warn!(%participant, "participant gone during final tx fanout");
                self.relay_status(
                    tumbler_messages::PoolStatus::Rejected,
                    PoolReason::NoErr,
                    now_ms,
                );
                break;
            }
        }
    }
}
