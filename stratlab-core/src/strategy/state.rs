//! Per-instance state: what the engine tracks for every strategy, plus the
//! building block strategies use for their own "previous value" scalars.

use crate::domain::NetPosition;
use serde::{Deserialize, Serialize};

/// Engine-side view of one strategy instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyState {
    pub position: NetPosition,
    /// Set on the first finished candle whose outputs were all formed.
    pub initialized: bool,
    /// Finished candles delivered to the decision callback.
    pub candles_processed: usize,
}

impl StrategyState {
    pub fn entry_price(&self) -> f64 {
        self.position.entry_price
    }
}

/// The value a tracked scalar had on the previous finished candle.
///
/// ```
/// use stratlab_core::strategy::Previous;
///
/// let mut prev_fast = Previous::default();
/// assert_eq!(prev_fast.shift(10.0), None);
/// assert_eq!(prev_fast.shift(11.0), Some(10.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Previous<T>(Option<T>);

impl<T> Default for Previous<T> {
    fn default() -> Self {
        Previous(None)
    }
}

impl<T: Copy> Previous<T> {
    pub fn get(&self) -> Option<T> {
        self.0
    }

    /// Store `value` and return the one it replaces.
    pub fn shift(&mut self, value: T) -> Option<T> {
        self.0.replace(value)
    }

    pub fn set(&mut self, value: T) {
        self.0 = Some(value);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

/// Tracked scalars declared next to a decision function. `on_reseted`
/// restores them with [`TrackedState::clear`].
pub trait TrackedState: Default {
    fn clear(&mut self) {
        *self = Self::default();
    }
}

impl<T: Default> TrackedState for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Crossover {
        prev_fast: Previous<f64>,
        prev_slow: Previous<f64>,
        bars_in_trade: usize,
    }

    #[test]
    fn clear_restores_default() {
        let mut s = Crossover::default();
        s.prev_fast.set(1.0);
        s.prev_slow.set(2.0);
        s.bars_in_trade = 7;
        s.clear();
        assert_eq!(s, Crossover::default());
        assert!(!s.prev_fast.is_set());
    }

    #[test]
    fn shift_returns_previous() {
        let mut p = Previous::default();
        assert_eq!(p.shift(true), None);
        assert_eq!(p.shift(false), Some(true));
        assert_eq!(p.get(), Some(false));
    }
}
