//! Injectable randomness for the mixing pool.
//!
//! Session ids and the fee-policy coin flips go through [`MixRng`] so that
//! tests can force deterministic branches (who gets charged, which session
//! id is drawn) while production uses the thread RNG.

use std::collections::VecDeque;

use rand::Rng;

use tumbler_types::params::{SESSION_ID_MAX, SESSION_ID_MIN};

/// Source of the pool's randomized decisions.
pub trait MixRng: Send {
    /// Draw a fresh session id, uniform over `1..=999_999`.
    fn session_id(&mut self) -> u32;

    /// A coin flip that lands true with `percent`% probability.
    fn roll(&mut self, percent: u32) -> bool;

    /// Pick a uniform index into a collection of `len` elements.
    fn pick(&mut self, len: usize) -> usize;
}

/// Production randomness backed by the thread RNG.
#[derive(Default)]
pub struct StdMixRng;

impl MixRng for StdMixRng {
    fn session_id(&mut self) -> u32 {
        rand::thread_rng().gen_range(SESSION_ID_MIN..=SESSION_ID_MAX)
    }

    fn roll(&mut self, percent: u32) -> bool {
        rand::thread_rng().gen_range(0u32..100) < percent
    }

    fn pick(&mut self, len: usize) -> usize {
        assert!(len > 0, "pick from empty collection");
        rand::thread_rng().gen_range(0..len)
    }
}

/// Deterministic randomness for tests: outcomes are scripted up front and
/// consumed in order. Running out of a script falls back to a fixed value
/// (session id 1, roll false, pick 0).
#[derive(Default)]
pub struct ScriptedMixRng {
    pub session_ids: VecDeque<u32>,
    pub rolls: VecDeque<bool>,
    pub picks: VecDeque<usize>,
}

impl ScriptedMixRng {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_ids(mut self, ids: &[u32]) -> Self {
        self.session_ids.extend(ids);
        self
    }

    pub fn with_rolls(mut self, rolls: &[bool]) -> Self {
        self.rolls.extend(rolls);
        self
    }

    pub fn with_picks(mut self, picks: &[usize]) -> Self {
        self.picks.extend(picks);
        self
    }
}

impl MixRng for ScriptedMixRng {
    fn session_id(&mut self) -> u32 {
        self.session_ids.pop_front().unwrap_or(1)
    }

    fn roll(&mut self, _percent: u32) -> bool {
        self.rolls.pop_front().unwrap_or(false)
    }

    fn pick(&mut self, len: usize) -> usize {
        self.picks.pop_front().unwrap_or(0).min(len.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_session_id_is_in_range() {
        let mut rng = StdMixRng;
        for _ in 0..100 {
            let id = rng.session_id();
            assert!((SESSION_ID_MIN..=SESSION_ID_MAX).contains(&id));
        }
    }

    #[test]
    fn std_roll_extremes() {
        let mut rng = StdMixRng;
        assert!(!rng.roll(0));
        assert!(rng.roll(100));
    }

    #[test]
    fn std_pick_is_in_range() {
        let mut rng = StdMixRng;
        for _ in 0..100 {
            assert!(rng.pick(7) < 7);
        }
    }

    #[test]
    fn scripted_outcomes_consumed_in_order() {
        let mut rng = ScriptedMixRng::new()
            .with_session_ids(&[4711])
            .with_rolls(&[true, false])
            .with_picks(&[2]);
        assert_eq!(rng.session_id(), 4711);
        assert!(rng.roll(33));
        assert!(!rng.roll(33));
        assert_eq!(rng.pick(5), 2);
    }

    #[test]
    fn scripted_defaults_when_exhausted() {
        let mut rng = ScriptedMixRng::new();
        assert_eq!(rng.session_id(), 1);
        assert!(!rng.roll(99));
        assert_eq!(rng.pick(3), 0);
    }

    #[test]
    fn scripted_pick_clamps_to_len() {
        let mut rng = ScriptedMixRng::new().with_picks(&[10]);
        assert_eq!(rng.pick(3), 2);
    }
}
