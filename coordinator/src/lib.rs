//! The tumbler mixing coordinator.
//!
//! This crate implements the server side of the mixing protocol: the
//! per-coordinator session state machine, the message dispatcher that
//! validates and routes inbound protocol traffic, collateral handling and
//! fee charging, the signed broadcast-tx index, and the maintenance ticker
//! that drives timeouts.
//!
//! The coordinator is a single serialized actor: one inbox, one worker
//! task, and the periodic tick delivered as a message on the same inbox.

pub mod actor;
pub mod collateral;
pub mod config;
pub mod dispatcher;
pub mod dstx;
pub mod entry;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod registry;
pub mod rng;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod submit;

pub use actor::{spawn_tick, CoordinatorActor, CoordinatorEvent};
pub use collateral::is_collateral_valid;
pub use config::CoordinatorConfig;
pub use dstx::SignedTxIndex;
pub use entry::{CollateralRef, Entry, MixInput};
pub use error::CoordinatorError;
pub use ledger::AdvertisementLedger;
pub use registry::{CoordinatorIdentity, CoordinatorRegistry, RegistryEntry};
pub use rng::{MixRng, ScriptedMixRng, StdMixRng};
pub use server::{CoordinatorServer, SyncFlag};
pub use session::{EntryRejection, Session};
pub use shutdown::ShutdownController;
pub use submit::{SubmitOutcome, TxSubmitter};
