//! The coordinator actor: one inbox, one worker task.
//!
//! All session state lives inside the worker; peers' messages and the
//! periodic maintenance tick arrive as events on the same channel, which
//! serializes every transition without a session mutex.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use tumbler_messages::MixMessage;
use tumbler_network::PeerId;
use tumbler_types::unix_now_ms;

use crate::server::CoordinatorServer;

/// An event on the coordinator's inbox.
#[derive(Clone, Debug)]
pub enum CoordinatorEvent {
    /// Raw wire bytes received from a peer.
    Message { peer: PeerId, bytes: Vec<u8> },
    /// Periodic maintenance tick.
    Tick,
}

/// Drains the inbox, feeding every event into the server one at a time.
pub struct CoordinatorActor {
    server: CoordinatorServer,
    inbox: mpsc::Receiver<CoordinatorEvent>,
    shutdown: broadcast::Receiver<()>,
}

impl CoordinatorActor {
    pub fn new(
        server: CoordinatorServer,
        inbox: mpsc::Receiver<CoordinatorEvent>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            server,
            inbox,
            shutdown,
        }
    }

    /// Run until shutdown. An in-flight event finishes before the
    /// shutdown flag is observed. Returns the server so callers can
    /// inspect final state.
    pub async fn run(mut self) -> CoordinatorServer {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.recv() => {
                    tracing::info!("coordinator actor shutting down");
                    break;
                }
                event = self.inbox.recv() => {
                    let Some(event) = event else {
                        tracing::info!("coordinator inbox closed, stopping");
                        break;
                    };
                    self.handle(event);
                }
            }
        }
        self.server
    }

    fn handle(&mut self, event: CoordinatorEvent) {
        let now_ms = unix_now_ms();
        match event {
            CoordinatorEvent::Message { peer, bytes } => match MixMessage::decode(&bytes) {
                Ok(msg) => {
                    tracing::trace!(peer = %peer, command = msg.command(), "dispatching message");
                    self.server.process_message(&peer, msg, now_ms);
                }
                Err(e) => {
                    tracing::debug!(peer = %peer, error = %e, "undecodable message");
                    self.server.peers.penalize(&peer, 1);
                }
            },
            CoordinatorEvent::Tick => {
                self.server.do_maintenance(now_ms);
            }
        }
    }
}

/// Spawn the maintenance ticker: one [`CoordinatorEvent::Tick`] roughly
/// every `interval_ms` onto the inbox until shutdown. A full inbox skips
/// the tick rather than queueing a backlog.
pub fn spawn_tick(
    inbox: mpsc::Sender<CoordinatorEvent>,
    mut shutdown: broadcast::Receiver<()>,
    interval_ms: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("maintenance ticker shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if inbox.try_send(CoordinatorEvent::Tick).is_err() {
                        tracing::trace!("inbox full, skipping tick");
                    }
                }
            }
        }
    })
}
