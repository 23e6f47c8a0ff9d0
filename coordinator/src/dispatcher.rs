//! Inbound message dispatch: validation, rate limiting, and routing of
//! protocol traffic into the session state machine.
//!
//! Every handler runs on the actor's worker task. Rejections addressed to
//! one participant go out as point-to-point status updates; misbehavior
//! that is visible network-wide (a forged queue signature, advertisement
//! spam) lowers the sending peer's reputation score instead.

use std::sync::Arc;

use tumbler_messages::{
    AcceptMessage, EntrySubmission, MixMessage, PoolReason, PoolStatus, QueueAdvertisement,
    SignFinalTxMessage, SignedFinalTx, StatusUpdateMessage,
};
use tumbler_network::PeerGone;

use crate::entry::Entry;
use crate::server::CoordinatorServer;
use tumbler_messages::PoolState;

impl CoordinatorServer {
    /// Route one inbound wire message. Fails silently unless coordinator
    /// mode is enabled and the chain is synced.
    pub fn process_message(&mut self, peer: &str, msg: MixMessage, now_ms: i64) {
        if !self.is_active() {
            return;
        }

        match msg {
            MixMessage::Accept(accept) => self.process_accept(peer, accept, now_ms),
            MixMessage::Queue(dsq) => self.process_queue(peer, dsq, now_ms),
            MixMessage::Entry(submission) => self.process_entry(peer, submission, now_ms),
            MixMessage::SignFinalTx(sigs) => self.process_sign_final_tx(peer, sigs, now_ms),
            MixMessage::SignedTx(dstx) => self.process_signed_tx(peer, dstx),
            // Client-bound traffic; a coordinator has no use for it.
            MixMessage::FinalTx(_) | MixMessage::Complete(_) | MixMessage::StatusUpdate(_) => {
                tracing::trace!(peer = %peer, command = "client-bound", "ignoring message");
            }
        }
    }

    /// `dsa` — a participant asks to join.
    fn process_accept(&mut self, peer: &str, accept: AcceptMessage, now_ms: i64) {
        let Some(version) = self.peers.proto_version(peer) else {
            return;
        };
        if version < self.config.min_peer_proto_version {
            tracing::debug!(peer = %peer, version, "dsa from obsolete version");
            let _ = self.push_status(peer, PoolStatus::Rejected, PoolReason::Version);
            return;
        }

        if self.is_session_ready(now_ms) {
            // Too many users in this session already, reject new ones.
            tracing::debug!(peer = %peer, "dsa rejected: queue is already full");
            let _ = self.push_status(peer, PoolStatus::Rejected, PoolReason::QueueFull);
            return;
        }

        if !self.registry.contains(&self.identity.outpoint) {
            let _ = self.push_status(peer, PoolStatus::Rejected, PoolReason::Registry);
            return;
        }

        if self.session.collaterals.is_empty() {
            // Refuse to create another queue this often.
            let ours = self.identity.outpoint;
            if self
                .session
                .seen_queues
                .iter()
                .any(|q| q.coordinator_outpoint == ours)
            {
                tracing::debug!("dsa rejected: our last queue is still open");
                let _ = self.push_status(peer, PoolStatus::Rejected, PoolReason::Recent);
                return;
            }
            if self
                .ledger
                .exceeds_threshold(&ours, self.registry.valid_count())
            {
                tracing::debug!(
                    last = self.ledger.last_for(&ours),
                    count = self.ledger.dsq_count(),
                    "dsa rejected: our last queue too recent, must wait"
                );
                let _ = self.push_status(peer, PoolStatus::Rejected, PoolReason::Recent);
                return;
            }
        }

        let result = if self.session.id() == 0 {
            self.create_new_session(accept.denom, accept.collateral, now_ms)
        } else {
            self.add_user_to_existing_session(accept.denom, accept.collateral, now_ms)
        };

        match result {
            Ok(reason) => {
                tracing::debug!(peer = %peer, "dsa is compatible, please submit");
                let _ = self.push_status(peer, PoolStatus::Accepted, reason);
            }
            Err(reason) => {
                tracing::debug!(peer = %peer, reason = ?reason, "dsa not compatible");
                let _ = self.push_status(peer, PoolStatus::Rejected, reason);
            }
        }
    }

    /// `dsq` — a peer relays a coordinator's queue advertisement.
    fn process_queue(&mut self, peer: &str, dsq: QueueAdvertisement, now_ms: i64) {
        let Some(version) = self.peers.proto_version(peer) else {
            return;
        };
        if version < self.config.min_peer_proto_version {
            tracing::debug!(peer = %peer, version, "dsq from obsolete version");
            return;
        }

        // Process every advertisement only once.
        if self.session.seen_queues.iter().any(|q| *q == dsq) {
            return;
        }

        // Stale or far-future beacons are dropped before any side effect.
        if dsq.is_time_out_of_bounds(now_ms / 1000) {
            tracing::debug!(time = dsq.timestamp_unix, "dsq time out of bounds");
            return;
        }

        // The same coordinator cannot have two open beacons with the same
        // readiness this soon.
        if self
            .session
            .seen_queues
            .iter()
            .any(|q| q.ready == dsq.ready && q.coordinator_outpoint == dsq.coordinator_outpoint)
        {
            tracing::debug!(
                peer = %peer,
                coordinator = %dsq.coordinator_outpoint,
                "peer is relaying way too many dsq messages for one coordinator"
            );
            self.peers.penalize(peer, 10);
            return;
        }

        let Some(listed) = self.registry.by_outpoint(&dsq.coordinator_outpoint) else {
            tracing::debug!(coordinator = %dsq.coordinator_outpoint, "dsq from unlisted coordinator");
            return;
        };

        if !dsq.check_signature(&listed.operator_key) {
            tracing::warn!(peer = %peer, "dsq signature invalid");
            self.peers.penalize(peer, 10);
            return;
        }

        if !dsq.ready {
            // Don't allow a few coordinators to dominate the queueing.
            if self
                .ledger
                .exceeds_threshold(&dsq.coordinator_outpoint, self.registry.valid_count())
            {
                tracing::debug!(
                    coordinator = %dsq.coordinator_outpoint,
                    last = self.ledger.last_for(&dsq.coordinator_outpoint),
                    count = self.ledger.dsq_count(),
                    "coordinator is advertising too often"
                );
                return;
            }
            self.ledger.observe(dsq.coordinator_outpoint);
        }

        tracing::debug!(
            coordinator = %dsq.coordinator_outpoint,
            denom = dsq.denom,
            ready = dsq.ready,
            "new mixing queue"
        );
        self.session.seen_queues.push(dsq.clone());
        self.relay_queue(&dsq);
    }

    /// `dsi` — a participant submits their contribution.
    fn process_entry(&mut self, peer: &str, submission: EntrySubmission, now_ms: i64) {
        let Some(version) = self.peers.proto_version(peer) else {
            return;
        };
        if version < self.config.min_peer_proto_version {
            tracing::debug!(peer = %peer, version, "dsi from obsolete version");
            let _ = self.push_status(peer, PoolStatus::Rejected, PoolReason::Version);
            return;
        }

        // Do we have enough users in the current session?
        if !self.is_session_ready(now_ms) {
            tracing::debug!(peer = %peer, "dsi rejected: session not complete");
            let _ = self.push_status(peer, PoolStatus::Rejected, PoolReason::Session);
            return;
        }

        let entry = Entry::new(
            peer.to_string(),
            Arc::new(submission.collateral),
            submission.inputs,
            submission.outputs,
        );

        match self.add_entry(entry) {
            Ok(()) => {
                let _ = self.push_status(peer, PoolStatus::Accepted, PoolReason::EntriesAdded);
                self.check_pool(now_ms);
                self.relay_status(PoolStatus::Accepted, PoolReason::NoErr, now_ms);
            }
            Err(rejection) => {
                let _ = self.push_status(peer, PoolStatus::Rejected, rejection.reason);
            }
        }
    }

    /// `dss` — a participant's signatures on the joint transaction.
    ///
    /// A single bad signature rejects the whole round: the participant-to-
    /// input mapping is recoverable only via input identity, so the failure
    /// cannot be pinned on one peer.
    fn process_sign_final_tx(&mut self, peer: &str, sigs: SignFinalTxMessage, now_ms: i64) {
        let Some(version) = self.peers.proto_version(peer) else {
            return;
        };
        if version < self.config.min_peer_proto_version {
            tracing::debug!(peer = %peer, version, "dss from obsolete version");
            return;
        }

        if self.session.state() != PoolState::Signing {
            let _ = self.push_status(peer, PoolStatus::Rejected, PoolReason::Session);
            return;
        }

        let total = sigs.inputs.len();
        for (index, txin) in sigs.inputs.iter().enumerate() {
            if !self.session.add_script_sig(txin) {
                tracing::debug!(
                    peer = %peer,
                    progress = format!("{}/{}", index + 1, total),
                    session_id = self.session.id(),
                    "add_script_sig failed, rejecting signing round"
                );
                self.relay_status(PoolStatus::Rejected, PoolReason::NoErr, now_ms);
                return;
            }
            tracing::debug!(progress = format!("{}/{}", index + 1, total), "witness accepted");
        }

        self.check_pool(now_ms);
    }

    /// `dstx` — a peer relays a coordinator-signed broadcast record.
    fn process_signed_tx(&mut self, peer: &str, dstx: SignedFinalTx) {
        let hash = dstx.tx_hash();
        if self.dstx_index.contains(&hash) {
            return;
        }

        let Some(listed) = self.registry.by_outpoint(&dstx.coordinator_outpoint) else {
            tracing::debug!(coordinator = %dstx.coordinator_outpoint, "dstx from unlisted coordinator");
            return;
        };
        if !dstx.check_signature(&listed.operator_key) {
            tracing::warn!(peer = %peer, "dstx signature invalid");
            self.peers.penalize(peer, 10);
            return;
        }

        tracing::debug!(%hash, "indexing relayed broadcast record");
        if self.dstx_index.add(dstx.clone()) {
            self.relay_message(&MixMessage::SignedTx(dstx));
        }
    }

    // ── Status fanout ───────────────────────────────────────────────────

    /// Send a status update to one peer.
    pub(crate) fn push_status(
        &self,
        peer: &str,
        status: PoolStatus,
        reason: PoolReason,
    ) -> Result<(), PeerGone> {
        let msg = MixMessage::StatusUpdate(StatusUpdateMessage {
            session_id: self.session.id(),
            state: self.session.state(),
            entries_count: self.session.entries_count() as u32,
            status,
            reason,
        });
        let Ok(bytes) = msg.encode() else {
            tracing::error!("failed to encode status update");
            return Ok(());
        };
        let handle = self
            .peers
            .handle(peer)
            .ok_or_else(|| PeerGone(peer.to_owned()))?;
        handle.send(bytes)
    }

    /// Broadcast a status update to every participant, preserving the
    /// order of the transitions that produced it. Vanished participants
    /// degrade the round: everyone else is told it is rejected, and if
    /// every participant is gone the session resets without charging fees
    /// (the fault is probably our own connectivity).
    pub(crate) fn relay_status(&mut self, status: PoolStatus, reason: PoolReason, now_ms: i64) {
        let participants: Vec<String> = self
            .session
            .entries
            .iter()
            .map(|e| e.participant.clone())
            .collect();

        let mut disconnected = 0usize;
        for participant in &participants {
            if self.push_status(participant, status, reason).is_err() {
                disconnected += 1;
            }
        }
        if disconnected == 0 {
            return;
        }

        tracing::warn!(
            disconnected,
            session_id = self.session.id(),
            "participants vanished during status fanout"
        );

        // Notify everyone else that this session should be terminated.
        for participant in &participants {
            let _ = self.push_status(participant, PoolStatus::Rejected, PoolReason::NoErr);
        }

        if disconnected == participants.len() && !participants.is_empty() {
            // All clients disconnected — likely our own connection failed.
            // Do not charge any fees, just reset.
            self.session.reset(now_ms);
        }
    }
}
