//! Peer registry: typed handles, protocol versions, and misbehavior scoring.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::error::PeerGone;

/// Opaque peer identity ("ip:port" at the connection layer).
pub type PeerId = String;

/// Reputation score at or below which a peer is banned.
pub const SCORE_BAN_THRESHOLD: i32 = -100;
/// Minimum reputation score.
pub const SCORE_MIN: i32 = -200;
/// Maximum reputation score.
pub const SCORE_MAX: i32 = 100;

/// A typed handle to one connected peer.
///
/// Sending never blocks: the message is queued on the peer's outbound
/// channel, or the send fails with [`PeerGone`] when the peer has
/// disconnected or its queue is full.
#[derive(Clone)]
pub struct PeerHandle {
    id: PeerId,
    outbound: mpsc::Sender<Vec<u8>>,
}

impl PeerHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue wire bytes for this peer.
    pub fn send(&self, bytes: Vec<u8>) -> Result<(), PeerGone> {
        self.outbound
            .try_send(bytes)
            .map_err(|_| PeerGone(self.id.clone()))
    }
}

/// Per-peer connection state tracked by the registry.
struct PeerInfo {
    outbound: mpsc::Sender<Vec<u8>>,
    proto_version: u32,
    /// Reputation score. Starts at 0, clamped to `SCORE_MIN..=SCORE_MAX`.
    score: i32,
    banned: bool,
}

/// Registry of connected peers.
///
/// Owned by the coordinator actor; no interior locking — all access is
/// serialized by the actor's single worker task.
pub struct PeerTable {
    peers: HashMap<PeerId, PeerInfo>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    /// Register a connected peer with its protocol version and outbound
    /// channel. Re-registering replaces the previous connection state.
    pub fn register(&mut self, id: &str, proto_version: u32, outbound: mpsc::Sender<Vec<u8>>) {
        self.peers.insert(
            id.to_owned(),
            PeerInfo {
                outbound,
                proto_version,
                score: 0,
                banned: false,
            },
        );
    }

    /// Drop a disconnected peer.
    pub fn remove(&mut self, id: &str) {
        self.peers.remove(id);
    }

    /// Handle for a connected, not-banned peer.
    pub fn handle(&self, id: &str) -> Option<PeerHandle> {
        self.peers
            .get(id)
            .filter(|p| !p.banned)
            .map(|p| PeerHandle {
                id: id.to_owned(),
                outbound: p.outbound.clone(),
            })
    }

    /// The protocol version a peer announced at handshake.
    pub fn proto_version(&self, id: &str) -> Option<u32> {
        self.peers.get(id).map(|p| p.proto_version)
    }

    /// Lower a peer's reputation score; bans it once the score falls to
    /// [`SCORE_BAN_THRESHOLD`].
    pub fn penalize(&mut self, id: &str, points: i32) {
        if let Some(peer) = self.peers.get_mut(id) {
            peer.score = (peer.score - points).clamp(SCORE_MIN, SCORE_MAX);
            if peer.score <= SCORE_BAN_THRESHOLD && !peer.banned {
                peer.banned = true;
                tracing::warn!(peer = %id, score = peer.score, "peer banned for misbehavior");
            }
        }
    }

    pub fn score(&self, id: &str) -> Option<i32> {
        self.peers.get(id).map(|p| p.score)
    }

    pub fn is_banned(&self, id: &str) -> bool {
        self.peers.get(id).map(|p| p.banned).unwrap_or(false)
    }

    /// Handles for every connected, not-banned peer.
    pub fn connected(&self) -> impl Iterator<Item = PeerHandle> + '_ {
        self.peers
            .iter()
            .filter(|(_, p)| !p.banned)
            .map(|(id, p)| PeerHandle {
                id: id.clone(),
                outbound: p.outbound.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Default for PeerTable {
    fn default() -> Self {
        Self::new()
    }
}
