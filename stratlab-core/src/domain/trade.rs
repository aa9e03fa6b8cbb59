use super::ids::OrderId;
use super::order::OrderSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fill notification for one of the strategy's own orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnTrade {
    /// The order this trade fills, when the venue reports it.
    pub order_id: Option<OrderId>,
    pub instrument: String,
    pub side: OrderSide,
    pub price: f64,
    pub volume: f64,
    pub time: DateTime<Utc>,
}

impl OwnTrade {
    /// Signed volume: positive for buys, negative for sells.
    pub fn signed_volume(&self) -> f64 {
        self.side.sign() * self.volume
    }
}
