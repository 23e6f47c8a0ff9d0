//! Protocol constants for the mixing pool.

use crate::amount::Amount;
use crate::denomination::smallest_denomination;

/// Maximum inputs a single session entry may contribute.
pub const MAX_ENTRY_INPUTS: usize = 9;

/// Queue advertisement validity window and the Queue/AcceptingEntries
/// phase timeout, in seconds.
pub const QUEUE_TIMEOUT_SECS: i64 = 30;

/// Signing phase timeout, in seconds.
pub const SIGNING_TIMEOUT_SECS: i64 = 15;

/// Minimum peer protocol version accepted by the mixing pool.
pub const MIN_PEER_PROTO_VERSION: u32 = 70206;

/// Session ids are drawn uniformly from this inclusive range; 0 means idle.
pub const SESSION_ID_MIN: u32 = 1;
pub const SESSION_ID_MAX: u32 = 999_999;

/// Upper bound on a serialized collateral transaction, in bytes.
/// Anything larger is spam and is rejected before any other check.
pub const MAX_COLLATERAL_SIZE: usize = 10_000;

/// Default participant bounds for a session.
pub const DEFAULT_MIN_POOL_PARTICIPANTS: usize = 3;
pub const DEFAULT_MAX_POOL_PARTICIPANTS: usize = 5;

/// Minimum net fee a collateral transaction must pledge:
/// 1/1000 of the smallest standard denomination.
pub fn collateral_fee() -> Amount {
    Amount::new(smallest_denomination().raw() / 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::COIN;

    #[test]
    fn collateral_fee_is_thousandth_of_smallest_denomination() {
        assert_eq!(collateral_fee(), Amount::new(COIN / 100 / 1000));
    }

    #[test]
    fn session_id_range_is_positive() {
        assert!(SESSION_ID_MIN > 0);
        assert!(SESSION_ID_MIN <= SESSION_ID_MAX);
    }
}
