//! Protocol time handling.
//!
//! Wire timestamps (queue beacons, broadcast records) are signed Unix
//! seconds; session step stamps are Unix milliseconds. Both travel as
//! plain `i64`, so this module provides clock reads and the symmetric
//! validity-window test rather than a wrapper type.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in whole seconds, as signed wire timestamps use.
pub fn unix_now_secs() -> i64 {
    unix_now_ms() / 1000
}

/// Current Unix time in milliseconds. Session step stamps use this.
pub fn unix_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as i64
}

/// Whether a wire timestamp falls outside the symmetric validity window
/// around `now` — either stale or too far in the future. Both directions
/// are rejected so replayed and pre-dated beacons fail alike.
pub fn outside_validity_window(timestamp: i64, now: i64, window_secs: i64) -> bool {
    (now - timestamp).abs() > window_secs
}
