//! Order intent translator.
//!
//! Turns `BuyMarket` / `SellMarket` / `ClosePosition` into market orders,
//! owns the net position cell and the intent journal. The requested size is
//! executed as given; reversing versus adding is the strategy's decision.

use super::sink::{OrderSink, SinkError};
use crate::domain::{
    IdGen, IntentSource, NetPosition, Order, OrderId, OrderIntent, OrderSide, OrderStatus,
    OrderType, OwnTrade, PositionChange, FLAT_EPSILON,
};
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// What happened to one intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IntentOutcome {
    Submitted {
        order_id: OrderId,
        side: OrderSide,
        volume: f64,
    },
    /// Net effect would have been zero (close while flat).
    NoOp,
    Rejected {
        reason: String,
    },
}

impl IntentOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, IntentOutcome::Submitted { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, IntentOutcome::Rejected { .. })
    }
}

impl fmt::Display for IntentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentOutcome::Submitted {
                order_id,
                side,
                volume,
            } => write!(f, "{order_id} {side} {volume}"),
            IntentOutcome::NoOp => write!(f, "no-op"),
            IntentOutcome::Rejected { reason } => write!(f, "rejected: {reason}"),
        }
    }
}

/// One entry of the intent journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRecord {
    pub time: DateTime<Utc>,
    pub source: IntentSource,
    pub intent: OrderIntent,
    pub outcome: IntentOutcome,
}

#[derive(Debug)]
pub struct OrderTranslator {
    instrument: String,
    tag: String,
    position: NetPosition,
    ids: IdGen,
    orders: BTreeMap<OrderId, Order>,
    journal: Vec<IntentRecord>,
    trades: Vec<OwnTrade>,
    needs_resync: bool,
}

impl OrderTranslator {
    pub fn new(instrument: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            tag: strategy.into(),
            position: NetPosition::flat(),
            ids: IdGen::default(),
            orders: BTreeMap::new(),
            journal: Vec::new(),
            trades: Vec::new(),
            needs_resync: false,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn position(&self) -> NetPosition {
        self.position
    }

    pub fn journal(&self) -> &[IntentRecord] {
        &self.journal
    }

    /// Fills applied so far, in arrival order.
    pub fn trades(&self) -> &[OwnTrade] {
        &self.trades
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn active_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| o.is_active())
    }

    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Signed volume of orders handed to the sink but not yet filled.
    pub fn pending_volume(&self) -> f64 {
        self.active_orders()
            .map(|o| o.side.sign() * o.remaining_volume())
            .sum()
    }

    /// Position once every pending order has filled.
    pub fn projected_quantity(&self) -> f64 {
        self.position.quantity + self.pending_volume()
    }

    /// Signed quantity the intent would move the projected position by.
    pub fn signed_delta(&self, intent: OrderIntent) -> f64 {
        match intent {
            OrderIntent::BuyMarket(v) => v,
            OrderIntent::SellMarket(v) => -v,
            OrderIntent::ClosePosition => -self.projected_quantity(),
        }
    }

    /// Record an intent refused before reaching the sink.
    pub fn reject(
        &mut self,
        intent: OrderIntent,
        source: IntentSource,
        time: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> IntentOutcome {
        let outcome = IntentOutcome::Rejected {
            reason: reason.into(),
        };
        self.record(time, source, intent, outcome.clone());
        outcome
    }

    /// Translate one intent into (at most) one market order.
    ///
    /// `reference_price` is the close of the candle the decision was made on.
    /// A sink refusal is not an error here: it is journaled as `Rejected` and
    /// the position is re-read on the next heartbeat.
    pub fn execute(
        &mut self,
        intent: OrderIntent,
        source: IntentSource,
        reference_price: f64,
        time: DateTime<Utc>,
        sink: &mut dyn OrderSink,
    ) -> Result<IntentOutcome, EngineError> {
        if let OrderIntent::BuyMarket(v) | OrderIntent::SellMarket(v) = intent {
            if !(v.is_finite() && v > 0.0) {
                return Err(EngineError::InvalidVolume { volume: v });
            }
        }

        let delta = self.signed_delta(intent);
        if delta.abs() <= FLAT_EPSILON {
            self.record(time, source, intent, IntentOutcome::NoOp);
            return Ok(IntentOutcome::NoOp);
        }
        let side = if delta > 0.0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        let volume = delta.abs();

        let mut order = Order {
            id: self.ids.next_order_id(),
            instrument: self.instrument.clone(),
            side,
            order_type: OrderType::Market,
            volume,
            price: Some(reference_price),
            tag: format!("{}/{}", self.tag, source_tag(source)),
            time,
            filled_volume: 0.0,
            status: OrderStatus::Pending,
        };

        let outcome = match sink.submit(&order) {
            Ok(()) => IntentOutcome::Submitted {
                order_id: order.id,
                side,
                volume,
            },
            Err(e) => {
                let reason = e.to_string();
                order.status = OrderStatus::Rejected {
                    reason: reason.clone(),
                };
                self.needs_resync = true;
                IntentOutcome::Rejected { reason }
            }
        };
        self.orders.insert(order.id, order);
        self.record(time, source, intent, outcome.clone());
        Ok(outcome)
    }

    /// Apply fills a synchronous sink produced.
    pub fn poll_fills(
        &mut self,
        sink: &mut dyn OrderSink,
    ) -> Result<Vec<PositionChange>, EngineError> {
        sink.poll_trades()
            .into_iter()
            .map(|t| self.on_own_trade(t))
            .collect()
    }

    /// Apply one fill of the strategy's own order.
    pub fn on_own_trade(&mut self, trade: OwnTrade) -> Result<PositionChange, EngineError> {
        if trade.instrument != self.instrument {
            return Err(EngineError::ForeignTrade {
                expected: self.instrument.clone(),
                got: trade.instrument,
            });
        }
        if !(trade.volume.is_finite() && trade.volume > 0.0 && trade.price.is_finite()) {
            return Err(EngineError::InvalidVolume {
                volume: trade.volume,
            });
        }

        if let Some(order) = trade.order_id.and_then(|id| self.orders.get_mut(&id)) {
            order.filled_volume += trade.volume;
            order.status = if order.remaining_volume() <= FLAT_EPSILON {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
        }
        let change = self
            .position
            .apply_fill(trade.side, trade.price, trade.volume);
        self.trades.push(trade);
        Ok(change)
    }

    /// The venue reported that an order failed after submission.
    pub fn on_order_failed(&mut self, order_id: OrderId, reason: &str) -> Option<&Order> {
        self.needs_resync = true;
        let order = self.orders.get_mut(&order_id)?;
        order.status = OrderStatus::Rejected {
            reason: reason.to_string(),
        };
        Some(order)
    }

    /// Re-read the authoritative position after a rejection.
    ///
    /// Returns the change when the sink disagreed with the local view.
    pub fn resync(&mut self, sink: &dyn OrderSink) -> Option<PositionChange> {
        if !self.needs_resync {
            return None;
        }
        let remote = sink.net_position(&self.instrument)?;
        self.needs_resync = false;
        if remote == self.position {
            return None;
        }
        let change = PositionChange {
            before: self.position,
            after: remote,
        };
        self.position = remote;
        Some(change)
    }

    /// Cancel every active order the venue still holds; returns how many
    /// were cancelled.
    ///
    /// An order the venue no longer knows has already been settled there.
    /// Its local status is left alone so a late fill still marks it filled.
    pub fn cancel_all(&mut self, sink: &mut dyn OrderSink) -> usize {
        let mut cancelled = 0;
        for order in self.orders.values_mut().filter(|o| o.is_active()) {
            match sink.cancel(order.id) {
                Ok(()) => {
                    order.status = OrderStatus::Cancelled;
                    cancelled += 1;
                }
                Err(SinkError::NotFound(id)) => {
                    debug!(order = %id, "order already settled at the venue");
                }
                Err(err) => {
                    warn!(order = %order.id, error = %err, "cancel failed");
                }
            }
        }
        cancelled
    }

    fn record(
        &mut self,
        time: DateTime<Utc>,
        source: IntentSource,
        intent: OrderIntent,
        outcome: IntentOutcome,
    ) {
        self.journal.push(IntentRecord {
            time,
            source,
            intent,
            outcome,
        });
    }
}

fn source_tag(source: IntentSource) -> &'static str {
    match source {
        IntentSource::Strategy => "strategy",
        IntentSource::Protection => "protection",
        IntentSource::Engine => "engine",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sink::SimulatedSink;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap()
    }

    fn translator() -> OrderTranslator {
        OrderTranslator::new("SIM", "test")
    }

    fn run(
        tr: &mut OrderTranslator,
        sink: &mut SimulatedSink,
        intent: OrderIntent,
        price: f64,
    ) -> IntentOutcome {
        let out = tr
            .execute(intent, IntentSource::Strategy, price, t(0), sink)
            .unwrap();
        tr.poll_fills(sink).unwrap();
        out
    }

    #[test]
    fn close_when_flat_is_noop() {
        let mut tr = translator();
        let mut sink = SimulatedSink::new();
        assert_eq!(
            run(&mut tr, &mut sink, OrderIntent::ClosePosition, 100.0),
            IntentOutcome::NoOp
        );
        assert!(sink.submitted().is_empty());
        assert_eq!(tr.journal().len(), 1);
    }

    #[test]
    fn reversal_with_base_plus_position_leaves_base() {
        let mut tr = translator();
        let mut sink = SimulatedSink::new();
        run(&mut tr, &mut sink, OrderIntent::SellMarket(3.0), 100.0);
        assert_eq!(tr.position().quantity, -3.0);

        let p = tr.position().quantity.abs();
        run(&mut tr, &mut sink, OrderIntent::BuyMarket(1.0 + p), 95.0);
        assert_eq!(tr.position().quantity, 1.0);
        assert_eq!(tr.position().entry_price, 95.0);
    }

    #[test]
    fn close_sells_exact_long_quantity() {
        let mut tr = translator();
        let mut sink = SimulatedSink::new();
        run(&mut tr, &mut sink, OrderIntent::BuyMarket(2.0), 100.0);
        let out = run(&mut tr, &mut sink, OrderIntent::ClosePosition, 101.0);
        assert_eq!(
            out,
            IntentOutcome::Submitted {
                order_id: OrderId(2),
                side: OrderSide::Sell,
                volume: 2.0
            }
        );
        assert!(tr.position().is_flat());
        assert_eq!(tr.position().entry_price, 0.0);
    }

    #[test]
    fn close_accounts_for_pending_orders() {
        // A sink that never fills leaves the order pending.
        let mut tr = translator();
        let mut sink = SimulatedSink::new();
        tr.execute(
            OrderIntent::BuyMarket(2.0),
            IntentSource::Strategy,
            100.0,
            t(0),
            &mut sink,
        )
        .unwrap();
        // Fill not polled yet.
        assert_eq!(tr.projected_quantity(), 2.0);
        assert_eq!(tr.signed_delta(OrderIntent::ClosePosition), -2.0);
    }

    #[test]
    fn invalid_volume_is_contract_violation() {
        let mut tr = translator();
        let mut sink = SimulatedSink::new();
        for v in [0.0, -1.0, f64::NAN] {
            let err = tr
                .execute(
                    OrderIntent::BuyMarket(v),
                    IntentSource::Strategy,
                    100.0,
                    t(0),
                    &mut sink,
                )
                .unwrap_err();
            assert!(err.is_fatal());
        }
        assert!(tr.journal().is_empty());
    }

    #[test]
    fn sink_rejection_is_journaled_and_resyncs() {
        let mut tr = translator();
        let mut sink = SimulatedSink::new();
        sink.reject_next("no margin");
        let out = run(&mut tr, &mut sink, OrderIntent::BuyMarket(1.0), 100.0);
        assert!(out.is_rejected());
        assert!(tr.needs_resync());

        sink.set_position(
            "SIM",
            NetPosition {
                quantity: 4.0,
                entry_price: 99.0,
            },
        );
        let change = tr.resync(&sink).unwrap();
        assert_eq!(change.after.quantity, 4.0);
        assert!(!tr.needs_resync());
        assert!(tr.resync(&sink).is_none());
    }

    #[test]
    fn foreign_trade_is_refused() {
        let mut tr = translator();
        let trade = OwnTrade {
            order_id: None,
            instrument: "OTHER".into(),
            side: OrderSide::Buy,
            price: 1.0,
            volume: 1.0,
            time: t(1),
        };
        assert!(matches!(
            tr.on_own_trade(trade),
            Err(EngineError::ForeignTrade { .. })
        ));
    }

    #[test]
    fn partial_fills_update_order_status() {
        let mut tr = translator();
        let mut sink = SimulatedSink::new();
        tr.execute(
            OrderIntent::SellMarket(2.0),
            IntentSource::Strategy,
            50.0,
            t(0),
            &mut sink,
        )
        .unwrap();
        // Drop the simulator's full fill and deliver two halves instead.
        sink.poll_trades();
        let half = |hour| OwnTrade {
            order_id: Some(OrderId(1)),
            instrument: "SIM".into(),
            side: OrderSide::Sell,
            price: 50.0,
            volume: 1.0,
            time: t(hour),
        };
        tr.on_own_trade(half(1)).unwrap();
        assert_eq!(
            tr.order(OrderId(1)).unwrap().status,
            OrderStatus::PartiallyFilled
        );
        tr.on_own_trade(half(2)).unwrap();
        assert_eq!(tr.order(OrderId(1)).unwrap().status, OrderStatus::Filled);
        assert_eq!(tr.position().quantity, -2.0);
        assert_eq!(tr.pending_volume(), 0.0);
    }

    #[test]
    fn cancel_all_keeps_orders_the_venue_already_filled() {
        let mut tr = translator();
        let mut sink = SimulatedSink::new();
        let out = tr
            .execute(
                OrderIntent::BuyMarket(1.0),
                IntentSource::Strategy,
                10.0,
                t(0),
                &mut sink,
            )
            .unwrap();
        let IntentOutcome::Submitted { order_id, .. } = out else {
            panic!("unexpected outcome {out:?}");
        };

        assert_eq!(tr.cancel_all(&mut sink), 0);
        assert_eq!(tr.order(order_id).unwrap().status, OrderStatus::Pending);

        tr.poll_fills(&mut sink).unwrap();
        assert_eq!(tr.order(order_id).unwrap().status, OrderStatus::Filled);
        assert_eq!(tr.position().quantity, 1.0);
    }

    /// Venue that holds every order until it is cancelled.
    #[derive(Default)]
    struct HoldingVenue {
        held: Vec<OrderId>,
        unavailable: bool,
    }

    impl OrderSink for HoldingVenue {
        fn submit(&mut self, order: &Order) -> Result<(), SinkError> {
            self.held.push(order.id);
            Ok(())
        }

        fn cancel(&mut self, order_id: OrderId) -> Result<(), SinkError> {
            if self.unavailable {
                return Err(SinkError::Unavailable("link down".into()));
            }
            let before = self.held.len();
            self.held.retain(|id| *id != order_id);
            if self.held.len() == before {
                return Err(SinkError::NotFound(order_id));
            }
            Ok(())
        }

        fn poll_trades(&mut self) -> Vec<OwnTrade> {
            Vec::new()
        }

        fn net_position(&self, _instrument: &str) -> Option<NetPosition> {
            None
        }
    }

    #[test]
    fn cancel_all_cancels_orders_the_venue_still_holds() {
        let mut tr = translator();
        let mut venue = HoldingVenue::default();
        tr.execute(
            OrderIntent::BuyMarket(1.0),
            IntentSource::Strategy,
            10.0,
            t(0),
            &mut venue,
        )
        .unwrap();

        assert_eq!(tr.cancel_all(&mut venue), 1);
        assert_eq!(tr.active_orders().count(), 0);
        assert!(venue.held.is_empty());
        assert!(tr.position().is_flat());
    }

    #[test]
    fn cancel_all_leaves_orders_active_when_the_venue_is_down() {
        let mut tr = translator();
        let mut venue = HoldingVenue {
            unavailable: true,
            ..HoldingVenue::default()
        };
        tr.execute(
            OrderIntent::BuyMarket(1.0),
            IntentSource::Strategy,
            10.0,
            t(0),
            &mut venue,
        )
        .unwrap();

        assert_eq!(tr.cancel_all(&mut venue), 0);
        assert_eq!(tr.active_orders().count(), 1);
    }

    #[test]
    fn order_tag_names_strategy_and_source() {
        let mut tr = translator();
        let mut sink = SimulatedSink::new();
        tr.execute(
            OrderIntent::BuyMarket(1.0),
            IntentSource::Protection,
            10.0,
            t(0),
            &mut sink,
        )
        .unwrap();
        assert_eq!(sink.submitted()[0].tag, "test/protection");
    }
}
