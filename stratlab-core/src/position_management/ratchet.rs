//! One-way stop level.
//!
//! A stop may tighten, never loosen: for a long it only rises, for a short it
//! only falls. This holds even when the distance that produced the proposal
//! widens (an ATR expansion, for example).

use crate::domain::Side;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopRatchet {
    side: Side,
    level: Option<f64>,
}

impl StopRatchet {
    pub fn new(side: Side) -> Self {
        Self { side, level: None }
    }

    pub fn with_level(side: Side, level: f64) -> Self {
        Self {
            side,
            level: Some(level),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn level(&self) -> Option<f64> {
        self.level
    }

    /// Offer a new level; returns the level in force afterwards.
    ///
    /// The first proposal initializes the ratchet. Non-finite proposals are
    /// ignored.
    pub fn tighten(&mut self, proposed: f64) -> Option<f64> {
        if !proposed.is_finite() {
            return self.level;
        }
        let next = match (self.level, self.side) {
            (None, _) => proposed,
            (Some(current), Side::Long) => current.max(proposed),
            (Some(current), Side::Short) => current.min(proposed),
        };
        self.level = Some(next);
        self.level
    }

    /// True when `price` is at or beyond the stop on the losing side.
    pub fn is_breached(&self, price: f64) -> bool {
        match (self.level, self.side) {
            (Some(level), Side::Long) => price <= level,
            (Some(level), Side::Short) => price >= level,
            (None, _) => false,
        }
    }

    pub fn clear(&mut self) {
        self.level = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_stop_only_rises() {
        let mut r = StopRatchet::with_level(Side::Long, 95.0);
        assert_eq!(r.tighten(100.0), Some(100.0));
        assert_eq!(r.tighten(90.0), Some(100.0));
    }

    #[test]
    fn short_stop_only_falls() {
        let mut r = StopRatchet::with_level(Side::Short, 105.0);
        assert_eq!(r.tighten(100.0), Some(100.0));
        assert_eq!(r.tighten(110.0), Some(100.0));
    }

    #[test]
    fn first_proposal_initializes() {
        let mut r = StopRatchet::new(Side::Long);
        assert!(!r.is_breached(0.0));
        assert_eq!(r.tighten(95.0), Some(95.0));
        assert_eq!(r.tighten(f64::NAN), Some(95.0));
    }

    #[test]
    fn widening_distance_does_not_loosen() {
        // Price at 110: ATR 5 gives 100, ATR 10 later proposes 90.
        let mut r = StopRatchet::new(Side::Long);
        r.tighten(110.0 - 2.0 * 5.0);
        assert_eq!(r.tighten(110.0 - 2.0 * 10.0), Some(100.0));
    }

    #[test]
    fn breach_is_inclusive() {
        let long = StopRatchet::with_level(Side::Long, 100.0);
        assert!(long.is_breached(100.0));
        assert!(!long.is_breached(100.01));
        let short = StopRatchet::with_level(Side::Short, 100.0);
        assert!(short.is_breached(100.0));
        assert!(!short.is_breached(99.99));
    }

    #[test]
    fn clear_forgets_level() {
        let mut r = StopRatchet::with_level(Side::Short, 100.0);
        r.clear();
        assert_eq!(r.level(), None);
        assert_eq!(r.tighten(120.0), Some(120.0));
    }
}
