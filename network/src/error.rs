use thiserror::Error;

/// The peer behind a handle is no longer reachable: it was never
/// registered, it disconnected, or its outbound queue is gone.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("peer {0} is gone")]
pub struct PeerGone(pub String);
