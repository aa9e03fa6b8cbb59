use super::order::OrderSide;
use serde::{Deserialize, Serialize};

/// Quantities smaller than this are treated as flat.
pub const FLAT_EPSILON: f64 = 1e-9;

/// Position side (semantic representation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Determine side from a signed quantity; `None` when flat.
    pub fn from_quantity(qty: f64) -> Option<Self> {
        if qty > FLAT_EPSILON {
            Some(Side::Long)
        } else if qty < -FLAT_EPSILON {
            Some(Side::Short)
        } else {
            None
        }
    }
}

/// Signed net position plus the entry price of whatever is open.
///
/// Entry price rules:
/// - opening from flat, or crossing through zero: entry = fill price
/// - adding in the same direction: size-weighted average
/// - reducing without crossing: entry unchanged
/// - returning to flat: entry = 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetPosition {
    pub quantity: f64,
    pub entry_price: f64,
}

/// Position before and after a fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionChange {
    pub before: NetPosition,
    pub after: NetPosition,
}

impl PositionChange {
    /// True when the side changed (open, close, or flip).
    pub fn side_changed(&self) -> bool {
        self.before.side() != self.after.side()
    }
}

impl NetPosition {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn side(&self) -> Option<Side> {
        Side::from_quantity(self.quantity)
    }

    pub fn is_flat(&self) -> bool {
        self.side().is_none()
    }

    pub fn is_long(&self) -> bool {
        self.side() == Some(Side::Long)
    }

    pub fn is_short(&self) -> bool {
        self.side() == Some(Side::Short)
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity * (current_price - self.entry_price)
    }

    /// Apply a fill and return the before/after pair.
    pub fn apply_fill(&mut self, side: OrderSide, price: f64, volume: f64) -> PositionChange {
        let before = *self;
        let delta = side.sign() * volume;
        let mut quantity = self.quantity + delta;
        if quantity.abs() <= FLAT_EPSILON {
            quantity = 0.0;
        }

        let entry_price = match (before.side(), Side::from_quantity(quantity)) {
            (_, None) => 0.0,
            (None, Some(_)) => price,
            (Some(a), Some(b)) if a != b => price,
            (Some(_), Some(_)) if delta.signum() == before.quantity.signum() => {
                let held = before.quantity.abs();
                (held * before.entry_price + volume * price) / (held + volume)
            }
            (Some(_), Some(_)) => before.entry_price,
        };

        *self = NetPosition {
            quantity,
            entry_price,
        };
        PositionChange {
            before,
            after: *self,
        }
    }
}
