//! Flood-based message broadcasting.
//!
//! Relay goes to every connected, not-banned peer via its own outbound
//! channel; a full or closed channel counts as a failure rather than
//! blocking the caller.

use crate::peer::PeerTable;

/// Outcome of a broadcast attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Number of peers the message was successfully queued for.
    pub sent: usize,
    /// Number of peers for which queueing failed (channel full / closed).
    pub failed: usize,
}

/// Broadcast wire bytes to every connected peer.
pub fn broadcast_to_all(peers: &PeerTable, bytes: &[u8]) -> BroadcastResult {
    let mut result = BroadcastResult::default();
    for handle in peers.connected() {
        match handle.send(bytes.to_vec()) {
            Ok(()) => result.sent += 1,
            Err(_) => result.failed += 1,
        }
    }
    result
}
