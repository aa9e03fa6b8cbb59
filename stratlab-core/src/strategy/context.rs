//! What a strategy can reach from its callbacks.
//!
//! [`StartContext`] is handed to `on_started`: subscribe, bind indicators,
//! attach protection, declare charts. [`TradeContext`] is handed to
//! `on_candle`: read the position, issue intents, log.

use crate::config::EngineConfig;
use crate::domain::{
    Candle, IdGen, IntentSource, NetPosition, OrderIntent, Side, StreamKey, SubscriptionId,
    Timeframe,
};
use crate::engine::lifecycle::LifecycleState;
use crate::engine::sink::OrderSink;
use crate::engine::subscription::{Handle, Subscription};
use crate::engine::translator::{IntentOutcome, OrderTranslator};
use crate::error::{EngineError, ErrorKind, Incident};
use crate::indicators::Indicator;
use crate::position_management::{ProtectionModule, ProtectionSpec, ProtectionUnit};
use crate::strategy::chart::{ChartArea, ChartElement};
use crate::strategy::log::StrategyLog;
use chrono::{DateTime, Utc};

pub struct StartContext<'a> {
    pub(crate) config: &'a EngineConfig,
    pub(crate) ids: &'a mut IdGen,
    pub(crate) subscriptions: &'a mut Vec<Subscription>,
    pub(crate) protection: &'a mut ProtectionModule,
    pub(crate) charts: &'a mut Vec<ChartArea>,
    pub(crate) log: &'a mut StrategyLog,
    pub(crate) time: DateTime<Utc>,
}

impl<'a> StartContext<'a> {
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn instrument(&self) -> &str {
        &self.config.instrument
    }

    /// Base order volume.
    pub fn volume(&self) -> f64 {
        self.config.volume
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Subscribe to the traded instrument's candles at `timeframe`.
    /// Subscribing twice to the same timeframe returns the same subscription.
    pub fn subscribe(&mut self, timeframe: Timeframe) -> SubscriptionId {
        let key = StreamKey::new(self.config.instrument.clone(), timeframe);
        if let Some(existing) = self.subscriptions.iter().find(|s| s.key() == &key) {
            return existing.id();
        }
        let id = self.ids.next_subscription_id();
        self.subscriptions.push(Subscription::new(id, key));
        id
    }

    fn subscription_mut(&mut self, sub: SubscriptionId) -> Result<&mut Subscription, EngineError> {
        self.subscriptions
            .iter_mut()
            .find(|s| s.id() == sub)
            .ok_or(EngineError::UnknownSubscription(sub))
    }

    /// Bind an indicator to the candles of `sub`.
    pub fn bind<I: Indicator>(
        &mut self,
        sub: SubscriptionId,
        indicator: I,
    ) -> Result<Handle<I::Output>, EngineError> {
        Ok(self.subscription_mut(sub)?.bind(indicator))
    }

    /// Bind an indicator fed with the primary value of `source`.
    pub fn bind_on<O, I: Indicator>(
        &mut self,
        source: Handle<O>,
        indicator: I,
    ) -> Result<Handle<I::Output>, EngineError> {
        self.subscription_mut(source.subscription())?
            .bind_on(source, indicator)
    }

    /// Attach stop-loss / take-profit legs. A zero leg is disabled.
    pub fn start_protection(
        &mut self,
        take_profit: ProtectionUnit,
        stop_loss: ProtectionUnit,
        is_trailing: bool,
    ) {
        let spec = ProtectionSpec {
            take_profit,
            stop_loss,
            is_trailing,
        };
        self.log.info(format!(
            "protection: take-profit {take_profit}, stop-loss {stop_loss}{}",
            if is_trailing { " (trailing)" } else { "" }
        ));
        self.protection.start(spec);
    }

    /// Get or create the chart area called `name`.
    pub fn chart_area(&mut self, name: &str) -> ChartBuilder<'_> {
        let index = match self.charts.iter().position(|a| a.name == name) {
            Some(i) => i,
            None => {
                self.charts.push(ChartArea::new(name));
                self.charts.len() - 1
            }
        };
        ChartBuilder {
            area: &mut self.charts[index],
            subscriptions: self.subscriptions.as_slice(),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log.info(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log.warn(message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log.error(message);
    }
}

pub struct ChartBuilder<'b> {
    area: &'b mut ChartArea,
    subscriptions: &'b [Subscription],
}

impl<'b> ChartBuilder<'b> {
    pub fn candles(self, sub: SubscriptionId) -> Self {
        self.area.push(ChartElement::Candles { subscription: sub });
        self
    }

    /// Draw a bound indicator. Handles that do not resolve are ignored.
    pub fn indicator<O>(self, handle: Handle<O>) -> Self {
        let name = self
            .subscriptions
            .iter()
            .find(|s| s.id() == handle.subscription())
            .and_then(|s| s.indicator_name(handle.index()));
        if let Some(name) = name {
            self.area.push(ChartElement::Indicator {
                subscription: handle.subscription(),
                name: name.to_string(),
            });
        }
        self
    }

    pub fn own_trades(self) -> Self {
        self.area.push(ChartElement::OwnTrades);
        self
    }
}

pub struct TradeContext<'a> {
    pub(crate) translator: &'a mut OrderTranslator,
    pub(crate) sink: &'a mut dyn OrderSink,
    pub(crate) protection: &'a mut ProtectionModule,
    pub(crate) log: &'a mut StrategyLog,
    pub(crate) incidents: &'a mut Vec<Incident>,
    pub(crate) config: &'a EngineConfig,
    pub(crate) lifecycle: LifecycleState,
    pub(crate) candle: &'a Candle,
}

impl<'a> TradeContext<'a> {
    /// Open time of the candle being processed.
    pub fn time(&self) -> DateTime<Utc> {
        self.candle.open_time
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    /// Intents are executed only while trading; otherwise they are journaled
    /// as rejected.
    pub fn is_trading(&self) -> bool {
        self.lifecycle == LifecycleState::Trading
    }

    /// Signed net position.
    pub fn position(&self) -> f64 {
        self.translator.position().quantity
    }

    pub fn net_position(&self) -> NetPosition {
        self.translator.position()
    }

    pub fn side(&self) -> Option<Side> {
        self.translator.position().side()
    }

    pub fn entry_price(&self) -> f64 {
        self.translator.position().entry_price
    }

    /// Base order volume.
    pub fn volume(&self) -> f64 {
        self.config.volume
    }

    pub fn buy_market(&mut self, volume: f64) -> Result<IntentOutcome, EngineError> {
        self.submit(OrderIntent::BuyMarket(volume))
    }

    pub fn sell_market(&mut self, volume: f64) -> Result<IntentOutcome, EngineError> {
        self.submit(OrderIntent::SellMarket(volume))
    }

    pub fn close_position(&mut self) -> Result<IntentOutcome, EngineError> {
        self.submit(OrderIntent::ClosePosition)
    }

    fn submit(&mut self, intent: OrderIntent) -> Result<IntentOutcome, EngineError> {
        if let OrderIntent::BuyMarket(v) | OrderIntent::SellMarket(v) = intent {
            if !(v.is_finite() && v > 0.0) {
                return Err(EngineError::InvalidVolume { volume: v });
            }
        }
        let time = self.candle.open_time;

        if !self.is_trading() {
            let reason = format!("not trading (state {})", self.lifecycle);
            self.log.warn(format!("{intent} rejected: {reason}"));
            return Ok(self
                .translator
                .reject(intent, IntentSource::Strategy, time, reason));
        }

        // An intent that closes or flips the position takes over from the
        // protection legs; they re-arm on the resulting position.
        let projected = self.translator.projected_quantity();
        let before = Side::from_quantity(projected);
        let after = Side::from_quantity(projected + self.translator.signed_delta(intent));
        if before.is_some() && before != after {
            self.protection.disarm();
        }

        let outcome = self.translator.execute(
            intent,
            IntentSource::Strategy,
            self.candle.close,
            time,
            &mut *self.sink,
        )?;
        if let IntentOutcome::Rejected { reason } = &outcome {
            let message = format!("{intent} rejected by venue: {reason}");
            self.log.warn(message.clone());
            self.incidents.push(Incident {
                time: Some(time),
                kind: ErrorKind::OrderRejection,
                message,
            });
            self.protection.retry();
        }

        self.translator.poll_fills(&mut *self.sink)?;
        self.protection.on_position(self.translator.position());
        if self.protection.would_fire(self.candle.close) {
            let message = format!(
                "protection exit due at {} while the decision callback runs; applied after it returns",
                self.candle.close
            );
            self.log.info(message.clone());
            self.incidents.push(Incident {
                time: Some(time),
                kind: ErrorKind::ProtectionDeferred,
                message,
            });
        }
        Ok(outcome)
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log.info(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log.warn(message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log.error(message);
    }
}
