//! Networking boundary for the mixing coordinator.
//!
//! The coordinator core never touches sockets. It addresses peers through
//! opaque [`PeerHandle`]s backed by per-peer outbound channels; the
//! connection layer (out of scope here) drains those channels onto the wire.

pub mod broadcast;
pub mod error;
pub mod peer;

pub use broadcast::{broadcast_to_all, BroadcastResult};
pub use error::PeerGone;
pub use peer::{PeerHandle, PeerId, PeerTable};
