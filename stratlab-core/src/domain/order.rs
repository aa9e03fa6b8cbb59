//! Orders and order intents.

use super::ids::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// +1 for buys, -1 for sells.
    pub fn sign(&self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

/// Order lifecycle as seen by the translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Handed to the sink, no fill yet.
    Pending,
    /// At least part of the volume has filled.
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected { reason: String },
}

impl OrderStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::PartiallyFilled)
    }
}

/// An order as handed to the order sink.
///
/// For market orders `price` carries the reference price the decision was
/// made on (the triggering candle's close); venues are free to ignore it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub instrument: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub volume: f64,
    pub price: Option<f64>,
    /// Correlation tag: strategy name plus intent source.
    pub tag: String,
    pub time: DateTime<Utc>,
    pub filled_volume: f64,
    pub status: OrderStatus,
}

impl Order {
    pub fn remaining_volume(&self) -> f64 {
        (self.volume - self.filled_volume).max(0.0)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Signed volume: positive for buys, negative for sells.
    pub fn signed_volume(&self) -> f64 {
        self.side.sign() * self.volume
    }
}

/// A requested position change, expressed in the strategy's terms.
///
/// Volumes are always positive; direction is carried by the variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderIntent {
    BuyMarket(f64),
    SellMarket(f64),
    ClosePosition,
}

impl fmt::Display for OrderIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderIntent::BuyMarket(v) => write!(f, "BuyMarket({v})"),
            OrderIntent::SellMarket(v) => write!(f, "SellMarket({v})"),
            OrderIntent::ClosePosition => write!(f, "ClosePosition"),
        }
    }
}

/// Who issued an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentSource {
    /// The strategy's decision callback.
    Strategy,
    /// The protection module (stop-loss, take-profit, trailing stop).
    Protection,
    /// The engine itself (flatten on stop).
    Engine,
}
