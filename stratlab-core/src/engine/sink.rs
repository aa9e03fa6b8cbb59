//! Order sink: the outbound side of the engine.
//!
//! The translator hands orders to an `OrderSink` and returns immediately.
//! Fills come back through `poll_trades` (synchronous venues such as the
//! simulator) or through the host calling `StrategyRunner::on_own_trade`.

use crate::domain::{NetPosition, Order, OrderId, OrderType, OwnTrade};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SinkError {
    #[error("order {order} rejected: {reason}")]
    Rejected { order: String, reason: String },

    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

pub trait OrderSink: Send {
    /// Hand an order to the venue. `Err` means the venue refused it outright.
    fn submit(&mut self, order: &Order) -> Result<(), SinkError>;

    fn cancel(&mut self, order_id: OrderId) -> Result<(), SinkError>;

    /// Fills produced since the last call. Asynchronous venues return nothing
    /// and report fills through the host instead.
    fn poll_trades(&mut self) -> Vec<OwnTrade>;

    /// Authoritative net position, if the venue can report it.
    fn net_position(&self, instrument: &str) -> Option<NetPosition>;
}

/// In-process venue: market orders fill immediately and completely at the
/// order's reference price; limit and stop orders rest until cancelled.
#[derive(Debug, Default)]
pub struct SimulatedSink {
    pending_trades: Vec<OwnTrade>,
    positions: HashMap<String, NetPosition>,
    resting: BTreeMap<OrderId, Order>,
    submitted: Vec<Order>,
    reject_next: Option<String>,
}

impl SimulatedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next submission with `reason`.
    pub fn reject_next(&mut self, reason: impl Into<String>) {
        self.reject_next = Some(reason.into());
    }

    /// Every order accepted so far, in submission order.
    pub fn submitted(&self) -> &[Order] {
        &self.submitted
    }

    pub fn resting_orders(&self) -> impl Iterator<Item = &Order> {
        self.resting.values()
    }

    /// Overwrite the venue's view of a position (tests of resync behaviour).
    pub fn set_position(&mut self, instrument: &str, position: NetPosition) {
        self.positions.insert(instrument.to_string(), position);
    }
}

impl OrderSink for SimulatedSink {
    fn submit(&mut self, order: &Order) -> Result<(), SinkError> {
        if let Some(reason) = self.reject_next.take() {
            return Err(SinkError::Rejected {
                order: order.id.to_string(),
                reason,
            });
        }
        self.submitted.push(order.clone());

        match (order.order_type, order.price) {
            (OrderType::Market, Some(price)) => {
                self.positions
                    .entry(order.instrument.clone())
                    .or_default()
                    .apply_fill(order.side, price, order.volume);
                self.pending_trades.push(OwnTrade {
                    order_id: Some(order.id),
                    instrument: order.instrument.clone(),
                    side: order.side,
                    price,
                    volume: order.volume,
                    time: order.time,
                });
            }
            (OrderType::Market, None) => {
                return Err(SinkError::Rejected {
                    order: order.id.to_string(),
                    reason: "market order without reference price".into(),
                });
            }
            _ => {
                self.resting.insert(order.id, order.clone());
            }
        }
        Ok(())
    }

    fn cancel(&mut self, order_id: OrderId) -> Result<(), SinkError> {
        self.resting
            .remove(&order_id)
            .map(|_| ())
            .ok_or(SinkError::NotFound(order_id))
    }

    fn poll_trades(&mut self) -> Vec<OwnTrade> {
        std::mem::take(&mut self.pending_trades)
    }

    fn net_position(&self, instrument: &str) -> Option<NetPosition> {
        Some(self.positions.get(instrument).copied().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderSide, OrderStatus};
    use chrono::{TimeZone, Utc};

    fn market(id: u64, side: OrderSide, volume: f64, price: f64) -> Order {
        Order {
            id: OrderId(id),
            instrument: "SIM".into(),
            side,
            order_type: OrderType::Market,
            volume,
            price: Some(price),
            tag: "test".into(),
            time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            filled_volume: 0.0,
            status: OrderStatus::Pending,
        }
    }

    #[test]
    fn market_orders_fill_at_reference_price() {
        let mut sink = SimulatedSink::new();
        sink.submit(&market(1, OrderSide::Buy, 2.0, 100.0)).unwrap();
        let trades = sink.poll_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 100.0);
        assert_eq!(trades[0].order_id, Some(OrderId(1)));
        assert!(sink.poll_trades().is_empty());
        assert_eq!(sink.net_position("SIM").unwrap().quantity, 2.0);
    }

    #[test]
    fn reject_next_refuses_once() {
        let mut sink = SimulatedSink::new();
        sink.reject_next("insufficient margin");
        assert!(matches!(
            sink.submit(&market(1, OrderSide::Buy, 1.0, 100.0)),
            Err(SinkError::Rejected { .. })
        ));
        assert!(sink.submit(&market(2, OrderSide::Buy, 1.0, 100.0)).is_ok());
        assert_eq!(sink.submitted().len(), 1);
    }

    #[test]
    fn resting_orders_can_be_cancelled() {
        let mut sink = SimulatedSink::new();
        let mut order = market(3, OrderSide::Sell, 1.0, 95.0);
        order.order_type = OrderType::Stop;
        sink.submit(&order).unwrap();
        assert_eq!(sink.resting_orders().count(), 1);
        sink.cancel(OrderId(3)).unwrap();
        assert_eq!(sink.cancel(OrderId(3)), Err(SinkError::NotFound(OrderId(3))));
    }
}
