//! Domain types: candles, orders, intents, fills, positions, IDs.

pub mod candle;
pub mod ids;
pub mod order;
pub mod position;
pub mod price;
pub mod trade;

pub use candle::{Candle, CandleState, StreamKey, Timeframe, TimeframeError};
pub use ids::{IdGen, OrderId, ParamSetHash, RunHash, SubscriptionId};
pub use order::{IntentSource, Order, OrderIntent, OrderSide, OrderStatus, OrderType};
pub use position::{NetPosition, PositionChange, Side, FLAT_EPSILON};
pub use price::round_half_even;
pub use trade::OwnTrade;
