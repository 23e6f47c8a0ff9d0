//! Fleet-wide advertisement accounting.
//!
//! Every fresh (not-ready) queue advertisement observed on the network
//! bumps a global counter and stamps the advertising coordinator with the
//! counter value. A coordinator may not advertise again until a fifth of
//! the registry has advertised since its last beacon.

use std::collections::HashMap;

use tumbler_types::OutPoint;

/// Tracks the global advertisement count and each coordinator's last
/// advertisement stamp.
#[derive(Clone, Debug, Default)]
pub struct AdvertisementLedger {
    dsq_count: u64,
    last_dsq: HashMap<OutPoint, u64>,
}

impl AdvertisementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh advertisement from `coordinator`: increment the
    /// global counter and stamp the coordinator with the new value.
    pub fn observe(&mut self, coordinator: OutPoint) {
        self.dsq_count += 1;
        self.last_dsq.insert(coordinator, self.dsq_count);
    }

    /// The global advertisement counter.
    pub fn dsq_count(&self) -> u64 {
        self.dsq_count
    }

    /// The counter value stamped at `coordinator`'s last advertisement
    /// (0 if it never advertised).
    pub fn last_for(&self, coordinator: &OutPoint) -> u64 {
        self.last_dsq.get(coordinator).copied().unwrap_or(0)
    }

    /// Whether `coordinator` advertised too recently relative to the
    /// fleet: `last + registry_size/5 > count`. Coordinators that never
    /// advertised are never throttled.
    pub fn exceeds_threshold(&self, coordinator: &OutPoint, registry_size: usize) -> bool {
        let last = self.last_for(coordinator);
        last != 0 && last + registry_size as u64 / 5 > self.dsq_count
    }
}
