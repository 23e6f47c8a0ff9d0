//! Wire message types for the mixing protocol.
//!
//! Every message exchanged between a coordinator and its peers is wrapped in
//! [`MixMessage`]. The short wire command names (`dsa`, `dsq`, ...) are kept
//! in doc comments and in [`MixMessage::command`]; payload layouts are
//! bincode (little-endian integers, length-prefixed byte arrays).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tumbler_crypto::{blake2b_256_multi, sign_message, verify_signature};
use tumbler_types::params::QUEUE_TIMEOUT_SECS;
use tumbler_types::{
    outside_validity_window, CollateralTx, OutPoint, PrivateKey, PublicKey, Signature,
    Transaction, TxHash, TxIn, TxOut,
};

/// Errors while encoding or decoding wire messages.
///
/// Encoding goes through an explicit builder step that returns a result;
/// a failed encode discards the buffer instead of unwinding a partial write.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("failed to decode message: {0}")]
    Decode(String),
}

// ── Pool enumerations ───────────────────────────────────────────────────

/// Mixing pool states. Serialized as a u32 on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolState {
    Idle,
    Queue,
    AcceptingEntries,
    Signing,
    Error,
    Success,
}

impl PoolState {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Short label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            PoolState::Idle => "IDLE",
            PoolState::Queue => "QUEUE",
            PoolState::AcceptingEntries => "ACCEPTING_ENTRIES",
            PoolState::Signing => "SIGNING",
            PoolState::Error => "ERROR",
            PoolState::Success => "SUCCESS",
        }
    }
}

/// Verdict carried by a status update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    Rejected,
    Accepted,
}

/// Result codes carried in status updates and completion notices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolReason {
    AlreadyHave,
    Denom,
    EntriesFull,
    ExistingTx,
    Fees,
    InvalidCollateral,
    InvalidInput,
    InvalidScript,
    InvalidTx,
    Maximum,
    Registry,
    Mode,
    NonStandardPubkey,
    QueueFull,
    Recent,
    Session,
    MissingTx,
    Version,
    NoErr,
    Success,
    EntriesAdded,
}

impl PoolReason {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Human-readable message for a result code.
    pub fn message(self) -> &'static str {
        match self {
            PoolReason::AlreadyHave => "Already have that input",
            PoolReason::Denom => "No matching denominations found for mixing",
            PoolReason::EntriesFull => "Entries are full",
            PoolReason::ExistingTx => "Not compatible with existing transactions",
            PoolReason::Fees => "Transaction fees are too high",
            PoolReason::InvalidCollateral => "Collateral not valid",
            PoolReason::InvalidInput => "Input is not valid",
            PoolReason::InvalidScript => "Invalid script detected",
            PoolReason::InvalidTx => "Transaction not valid",
            PoolReason::Maximum => "Entry exceeds maximum size",
            PoolReason::Registry => "Not in the coordinator registry",
            PoolReason::Mode => "Incompatible mode",
            PoolReason::NonStandardPubkey => "Non-standard public key detected",
            PoolReason::QueueFull => "Session is full",
            PoolReason::Recent => "Last queue was created too recently",
            PoolReason::Session => "Session not complete",
            PoolReason::MissingTx => "Missing input transaction information",
            PoolReason::Version => "Incompatible version",
            PoolReason::NoErr => "No errors detected",
            PoolReason::Success => "Transaction created successfully",
            PoolReason::EntriesAdded => "Your entries were added successfully",
        }
    }
}

// ── Payloads ────────────────────────────────────────────────────────────

/// `dsa` — a participant asks to join a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcceptMessage {
    pub denom: u32,
    pub collateral: CollateralTx,
}

/// `dsq` — a coordinator's signed, timestamped session beacon.
///
/// Structural equality deliberately ignores the signature: two beacons with
/// the same denomination, coordinator, timestamp, and readiness are the same
/// advertisement for deduplication purposes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueAdvertisement {
    pub denom: u32,
    pub coordinator_outpoint: OutPoint,
    pub timestamp_unix: i64,
    pub ready: bool,
    pub signature: Signature,
}

impl PartialEq for QueueAdvertisement {
    fn eq(&self, other: &Self) -> bool {
        self.denom == other.denom
            && self.coordinator_outpoint == other.coordinator_outpoint
            && self.timestamp_unix == other.timestamp_unix
            && self.ready == other.ready
    }
}

impl Eq for QueueAdvertisement {}

impl QueueAdvertisement {
    pub fn new(denom: u32, coordinator_outpoint: OutPoint, timestamp_unix: i64, ready: bool) -> Self {
        Self {
            denom,
            coordinator_outpoint,
            timestamp_unix,
            ready,
            signature: Signature::EMPTY,
        }
    }

    /// The digest the operator key signs: everything but the signature.
    pub fn signing_digest(&self) -> [u8; 32] {
        blake2b_256_multi(&[
            self.coordinator_outpoint.txid.as_bytes(),
            &self.coordinator_outpoint.index.to_le_bytes(),
            &self.denom.to_le_bytes(),
            &self.timestamp_unix.to_le_bytes(),
            &[self.ready as u8],
        ])
    }

    /// Sign with the coordinator's operator key.
    pub fn sign(&mut self, operator_key: &PrivateKey) {
        self.signature = sign_message(&self.signing_digest(), operator_key);
    }

    /// Verify against the coordinator's operator public key.
    pub fn check_signature(&self, operator_pubkey: &PublicKey) -> bool {
        verify_signature(&self.signing_digest(), &self.signature, operator_pubkey)
    }

    /// Whether the beacon's timestamp is outside its validity window —
    /// either expired or too far in the future.
    pub fn is_time_out_of_bounds(&self, now_unix: i64) -> bool {
        outside_validity_window(self.timestamp_unix, now_unix, QUEUE_TIMEOUT_SECS)
    }
}

/// `dsi` — a participant's contribution to the session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntrySubmission {
    pub collateral: CollateralTx,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

/// `dsf` — the assembled joint transaction, sent to each participant for
/// signing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FinalTxMessage {
    pub session_id: u32,
    pub tx: Transaction,
}

/// `dss` — a participant's signatures on the joint transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignFinalTxMessage {
    pub inputs: Vec<TxIn>,
}

/// `dsc` — per-participant session completion notice.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompleteMessage {
    pub session_id: u32,
    pub reason: PoolReason,
}

/// `dssu` — point-to-point or broadcast pool status update.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusUpdateMessage {
    pub session_id: u32,
    pub state: PoolState,
    pub entries_count: u32,
    pub status: PoolStatus,
    pub reason: PoolReason,
}

/// `dstx` — the signed announcement of a finalized mixing transaction,
/// relayed network-wide.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedFinalTx {
    pub tx: Transaction,
    pub coordinator_outpoint: OutPoint,
    pub signature: Signature,
    pub sig_time_unix: i64,
}

impl SignedFinalTx {
    pub fn new(tx: Transaction, coordinator_outpoint: OutPoint, sig_time_unix: i64) -> Self {
        Self {
            tx,
            coordinator_outpoint,
            signature: Signature::EMPTY,
            sig_time_unix,
        }
    }

    /// The transaction hash this record indexes under.
    pub fn tx_hash(&self) -> TxHash {
        tumbler_crypto::hash_transaction(&self.tx)
    }

    /// The digest the operator key signs: `{tx.hash, outpoint, sig_time}`.
    pub fn signing_digest(&self) -> [u8; 32] {
        blake2b_256_multi(&[
            self.tx_hash().as_bytes(),
            self.coordinator_outpoint.txid.as_bytes(),
            &self.coordinator_outpoint.index.to_le_bytes(),
            &self.sig_time_unix.to_le_bytes(),
        ])
    }

    pub fn sign(&mut self, operator_key: &PrivateKey) {
        self.signature = sign_message(&self.signing_digest(), operator_key);
    }

    pub fn check_signature(&self, operator_pubkey: &PublicKey) -> bool {
        verify_signature(&self.signing_digest(), &self.signature, operator_pubkey)
    }
}

// ── Envelope ────────────────────────────────────────────────────────────

/// Top-level wire message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MixMessage {
    /// `dsa`
    Accept(AcceptMessage),
    /// `dsq`
    Queue(QueueAdvertisement),
    /// `dsi`
    Entry(EntrySubmission),
    /// `dsf`
    FinalTx(FinalTxMessage),
    /// `dss`
    SignFinalTx(SignFinalTxMessage),
    /// `dsc`
    Complete(CompleteMessage),
    /// `dssu`
    StatusUpdate(StatusUpdateMessage),
    /// `dstx`
    SignedTx(SignedFinalTx),
}

impl MixMessage {
    /// The short wire command name.
    pub fn command(&self) -> &'static str {
        match self {
            MixMessage::Accept(_) => "dsa",
            MixMessage::Queue(_) => "dsq",
            MixMessage::Entry(_) => "dsi",
            MixMessage::FinalTx(_) => "dsf",
            MixMessage::SignFinalTx(_) => "dss",
            MixMessage::Complete(_) => "dsc",
            MixMessage::StatusUpdate(_) => "dssu",
            MixMessage::SignedTx(_) => "dstx",
        }
    }

    /// Serialize into a fresh wire buffer.
    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        bincode::serialize(self).map_err(|e| MessageError::Encode(e.to_string()))
    }

    /// Deserialize from wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
        bincode::deserialize(bytes).map_err(|e| MessageError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumbler_crypto::keypair_from_seed;
    use tumbler_types::{Amount, ScriptPubKey};

    fn sample_outpoint(byte: u8) -> OutPoint {
        OutPoint::new(TxHash::new([byte; 32]), 0)
    }

    fn sample_tx() -> Transaction {
        Transaction::new(
            vec![TxIn::new(sample_outpoint(1), PublicKey([2u8; 32]))],
            vec![TxOut::new(
                Amount::from_coins(1),
                ScriptPubKey::new(vec![3u8; 32]),
            )],
        )
    }

    fn sample_collateral() -> CollateralTx {
        CollateralTx::new(sample_tx(), Amount::from_coins(2))
    }

    fn roundtrip(msg: MixMessage) -> MixMessage {
        let bytes = msg.encode().unwrap();
        MixMessage::decode(&bytes).unwrap()
    }

    #[test]
    fn accept_roundtrip() {
        let decoded = roundtrip(MixMessage::Accept(AcceptMessage {
            denom: 0b100,
            collateral: sample_collateral(),
        }));
        match decoded {
            MixMessage::Accept(a) => assert_eq!(a.denom, 0b100),
            other => panic!("expected Accept, got {:?}", other),
        }
    }

    #[test]
    fn queue_roundtrip() {
        let decoded = roundtrip(MixMessage::Queue(QueueAdvertisement::new(
            0b10,
            sample_outpoint(9),
            1_700_000_000,
            true,
        )));
        match decoded {
            MixMessage::Queue(q) => {
                assert_eq!(q.denom, 0b10);
                assert!(q.ready);
                assert_eq!(q.timestamp_unix, 1_700_000_000);
            }
            other => panic!("expected Queue, got {:?}", other),
        }
    }

    #[test]
    fn entry_roundtrip() {
        let decoded = roundtrip(MixMessage::Entry(EntrySubmission {
            collateral: sample_collateral(),
            inputs: sample_tx().inputs,
            outputs: sample_tx().outputs,
        }));
        match decoded {
            MixMessage::Entry(e) => {
                assert_eq!(e.inputs.len(), 1);
                assert_eq!(e.outputs.len(), 1);
            }
            other => panic!("expected Entry, got {:?}", other),
        }
    }

    #[test]
    fn final_tx_roundtrip() {
        let decoded = roundtrip(MixMessage::FinalTx(FinalTxMessage {
            session_id: 4711,
            tx: sample_tx(),
        }));
        match decoded {
            MixMessage::FinalTx(f) => assert_eq!(f.session_id, 4711),
            other => panic!("expected FinalTx, got {:?}", other),
        }
    }

    #[test]
    fn status_update_roundtrip() {
        let decoded = roundtrip(MixMessage::StatusUpdate(StatusUpdateMessage {
            session_id: 1,
            state: PoolState::AcceptingEntries,
            entries_count: 2,
            status: PoolStatus::Accepted,
            reason: PoolReason::EntriesAdded,
        }));
        match decoded {
            MixMessage::StatusUpdate(s) => {
                assert_eq!(s.state, PoolState::AcceptingEntries);
                assert_eq!(s.status, PoolStatus::Accepted);
                assert_eq!(s.reason, PoolReason::EntriesAdded);
            }
            other => panic!("expected StatusUpdate, got {:?}", other),
        }
    }

    #[test]
    fn signed_tx_roundtrip_preserves_signature() {
        let kp = keypair_from_seed(&[5u8; 32]);
        let mut dstx = SignedFinalTx::new(sample_tx(), sample_outpoint(7), 1_700_000_123);
        dstx.sign(&kp.private);
        let decoded = roundtrip(MixMessage::SignedTx(dstx.clone()));
        match decoded {
            MixMessage::SignedTx(d) => {
                assert_eq!(d.signature, dstx.signature);
                assert!(d.check_signature(&kp.public));
            }
            other => panic!("expected SignedTx, got {:?}", other),
        }
    }

    #[test]
    fn corrupt_bytes_rejected_gracefully() {
        let garbage = vec![0xFF, 0x00, 0xDE, 0xAD, 0xBE, 0xEF];
        assert!(MixMessage::decode(&garbage).is_err());
    }

    #[test]
    fn truncated_message_rejected() {
        let msg = MixMessage::Accept(AcceptMessage {
            denom: 1,
            collateral: sample_collateral(),
        });
        let bytes = msg.encode().unwrap();
        assert!(MixMessage::decode(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn empty_bytes_rejected() {
        assert!(MixMessage::decode(&[]).is_err());
    }

    #[test]
    fn queue_sign_and_verify() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let mut dsq = QueueAdvertisement::new(0b1, sample_outpoint(1), 1_700_000_000, false);
        dsq.sign(&kp.private);
        assert!(dsq.check_signature(&kp.public));
    }

    #[test]
    fn queue_signature_covers_every_field() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let mut dsq = QueueAdvertisement::new(0b1, sample_outpoint(1), 1_700_000_000, false);
        dsq.sign(&kp.private);

        let mut wrong_denom = dsq.clone();
        wrong_denom.denom = 0b10;
        assert!(!wrong_denom.check_signature(&kp.public));

        let mut wrong_time = dsq.clone();
        wrong_time.timestamp_unix += 1;
        assert!(!wrong_time.check_signature(&kp.public));

        let mut wrong_ready = dsq.clone();
        wrong_ready.ready = true;
        assert!(!wrong_ready.check_signature(&kp.public));

        let mut wrong_outpoint = dsq.clone();
        wrong_outpoint.coordinator_outpoint.index = 1;
        assert!(!wrong_outpoint.check_signature(&kp.public));
    }

    #[test]
    fn queue_time_bounds_are_symmetric() {
        let dsq = QueueAdvertisement::new(0b1, sample_outpoint(1), 1000, false);
        assert!(!dsq.is_time_out_of_bounds(1000 + QUEUE_TIMEOUT_SECS));
        assert!(dsq.is_time_out_of_bounds(1000 + QUEUE_TIMEOUT_SECS + 1));
        assert!(!dsq.is_time_out_of_bounds(1000 - QUEUE_TIMEOUT_SECS));
        assert!(dsq.is_time_out_of_bounds(1000 - QUEUE_TIMEOUT_SECS - 1));
    }

    #[test]
    fn queue_equality_ignores_signature() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let unsigned = QueueAdvertisement::new(0b1, sample_outpoint(1), 1000, false);
        let mut signed = unsigned.clone();
        signed.sign(&kp.private);
        assert_eq!(unsigned, signed);

        let mut other_ready = unsigned.clone();
        other_ready.ready = true;
        assert_ne!(unsigned, other_ready);
    }

    #[test]
    fn signed_tx_digest_commits_to_tx_hash() {
        let kp = keypair_from_seed(&[2u8; 32]);
        let mut dstx = SignedFinalTx::new(sample_tx(), sample_outpoint(7), 42);
        dstx.sign(&kp.private);
        assert!(dstx.check_signature(&kp.public));

        let mut tampered = dstx.clone();
        tampered.tx.outputs[0].amount = Amount::from_coins(10);
        assert!(!tampered.check_signature(&kp.public));
    }

    #[test]
    fn command_names_match_wire_protocol() {
        assert_eq!(
            MixMessage::Accept(AcceptMessage {
                denom: 1,
                collateral: sample_collateral()
            })
            .command(),
            "dsa"
        );
        assert_eq!(
            MixMessage::Queue(QueueAdvertisement::new(1, sample_outpoint(1), 0, false)).command(),
            "dsq"
        );
        assert_eq!(
            MixMessage::SignFinalTx(SignFinalTxMessage { inputs: vec![] }).command(),
            "dss"
        );
    }

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(PoolReason::AlreadyHave.as_u32(), 0);
        assert_eq!(PoolReason::EntriesAdded.as_u32(), 20);
        assert_eq!(PoolState::Idle.as_u32(), 0);
        assert_eq!(PoolState::Success.as_u32(), 5);
    }
}
