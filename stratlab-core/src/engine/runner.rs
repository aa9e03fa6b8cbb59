//! Strategy runner: one strategy instance and everything it owns.
//!
//! Per finished candle, in order:
//! 1. the subscription's indicators absorb the candle
//! 2. the warm-up gate is re-evaluated (Started / Trading / Suspended)
//! 3. the decision callback runs
//! 4. the protection module re-evaluates with the candle close
//!
//! Everything happens on the caller's thread. A runner shares no mutable
//! state with any other runner.

use super::lifecycle::{LifecycleState, WarmupGate};
use super::sink::{OrderSink, SimulatedSink};
use super::subscription::Subscription;
use super::translator::{IntentOutcome, IntentRecord, OrderTranslator};
use crate::config::EngineConfig;
use crate::domain::{
    Candle, IdGen, IntentSource, NetPosition, OrderId, OrderIntent, OwnTrade, PositionChange,
    StreamKey, Timeframe,
};
use crate::error::{EngineError, ErrorKind, Incident};
use crate::fingerprint::RunFingerprint;
use crate::params::{ParamSet, ParamValue};
use crate::position_management::ProtectionModule;
use crate::strategy::{
    ChartArea, LogRecord, StartContext, Strategy, StrategyLog, StrategyState, TradeContext,
};
use chrono::{DateTime, Utc};
use tracing::debug;

pub struct StrategyRunner {
    strategy: Box<dyn Strategy>,
    config: EngineConfig,
    sink: Box<dyn OrderSink>,
    lifecycle: LifecycleState,
    gate: WarmupGate,
    ids: IdGen,
    subscriptions: Vec<Subscription>,
    translator: OrderTranslator,
    protection: ProtectionModule,
    charts: Vec<ChartArea>,
    log: StrategyLog,
    incidents: Vec<Incident>,
    state: StrategyState,
    last_price: Option<f64>,
}

impl StrategyRunner {
    pub fn new(
        strategy: Box<dyn Strategy>,
        config: EngineConfig,
        sink: Box<dyn OrderSink>,
    ) -> Self {
        let name = strategy.name().to_string();
        Self {
            translator: OrderTranslator::new(config.instrument.clone(), name.clone()),
            protection: ProtectionModule::new(config.protection_atr_length, config.price_step),
            gate: WarmupGate::new(config.online, config.allowed_to_trade),
            log: StrategyLog::new(name),
            strategy,
            config,
            sink,
            lifecycle: LifecycleState::Constructed,
            ids: IdGen::default(),
            subscriptions: Vec::new(),
            charts: Vec::new(),
            incidents: Vec::new(),
            state: StrategyState::default(),
            last_price: None,
        }
    }

    /// Runner backed by the in-process venue.
    pub fn simulated(strategy: Box<dyn Strategy>, config: EngineConfig) -> Self {
        Self::new(strategy, config, Box::new(SimulatedSink::new()))
    }

    // ── Introspection ──

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn position(&self) -> NetPosition {
        self.translator.position()
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn params(&self) -> &ParamSet {
        self.strategy.params()
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn chart_areas(&self) -> &[ChartArea] {
        &self.charts
    }

    pub fn log_records(&self) -> &[LogRecord] {
        self.log.records()
    }

    pub fn intent_journal(&self) -> &[IntentRecord] {
        self.translator.journal()
    }

    pub fn trades(&self) -> &[OwnTrade] {
        self.translator.trades()
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn protection(&self) -> &ProtectionModule {
        &self.protection
    }

    pub fn sink(&self) -> &dyn OrderSink {
        self.sink.as_ref()
    }

    pub fn sink_mut(&mut self) -> &mut dyn OrderSink {
        self.sink.as_mut()
    }

    /// BLAKE3 over strategy name, parameter values and intent journal.
    pub fn fingerprint(&self) -> RunFingerprint {
        RunFingerprint::new(
            self.strategy.name(),
            self.strategy.params(),
            self.translator.journal(),
        )
    }

    // ── Parameters ──

    pub fn set_param(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.check_params_writable()?;
        self.strategy.params_mut().set_str(name, value)?;
        Ok(())
    }

    pub fn set_param_value(&mut self, name: &str, value: ParamValue) -> Result<(), EngineError> {
        self.check_params_writable()?;
        self.strategy.params_mut().set(name, value)?;
        Ok(())
    }

    fn check_params_writable(&self) -> Result<(), EngineError> {
        if self.lifecycle.params_writable() {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                operation: "set_param",
                state: self.lifecycle,
            })
        }
    }

    // ── Lifecycle ──

    pub fn start(&mut self, time: DateTime<Utc>) -> Result<(), EngineError> {
        if !self.lifecycle.can_start() {
            return Err(EngineError::InvalidState {
                operation: "start",
                state: self.lifecycle,
            });
        }

        self.subscriptions.clear();
        self.charts.clear();
        self.ids = IdGen::default();
        self.protection =
            ProtectionModule::new(self.config.protection_atr_length, self.config.price_step);
        self.protection.on_position(self.translator.position());
        self.gate.formed = false;
        self.state.initialized = false;
        self.log.set_time(time);
        self.strategy.params_mut().lock();

        let result = {
            let mut ctx = StartContext {
                config: &self.config,
                ids: &mut self.ids,
                subscriptions: &mut self.subscriptions,
                protection: &mut self.protection,
                charts: &mut self.charts,
                log: &mut self.log,
                time,
            };
            self.strategy.on_started(&mut ctx)
        };
        if let Err(e) = result {
            return Err(self.fail(e));
        }

        self.lifecycle = LifecycleState::Started;
        let streams: Vec<String> = self
            .subscriptions
            .iter()
            .map(|s| s.key().to_string())
            .collect();
        self.log.info(format!(
            "started: {} (params {})",
            streams.join(", "),
            self.strategy.params().hash()
        ));
        Ok(())
    }

    /// Stop: cancel outstanding orders, flatten when configured, unlock
    /// parameters. Candles delivered afterwards are dropped.
    pub fn stop(&mut self, time: DateTime<Utc>) -> Result<(), EngineError> {
        if !self.lifecycle.is_running() {
            return Err(EngineError::InvalidState {
                operation: "stop",
                state: self.lifecycle,
            });
        }
        self.log.set_time(time);

        let cancelled = self.translator.cancel_all(self.sink.as_mut());
        if cancelled > 0 {
            self.log.info(format!("cancelled {cancelled} outstanding order(s)"));
        }

        if self.config.flatten_on_stop && !self.translator.position().is_flat() {
            match self.last_price {
                Some(price) => {
                    let outcome = self.translator.execute(
                        OrderIntent::ClosePosition,
                        IntentSource::Engine,
                        price,
                        time,
                        self.sink.as_mut(),
                    )?;
                    self.log.info(format!("flatten on stop: {outcome}"));
                    self.apply_fills()?;
                }
                None => self
                    .log
                    .warn("flatten on stop skipped: no price seen yet"),
            }
        }

        self.halt();
        self.log.info("stopped");
        Ok(())
    }

    /// Legal only when stopped: clears indicators, tracked state, position
    /// and journal.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        if !self.lifecycle.can_reset() {
            return Err(EngineError::InvalidState {
                operation: "reset",
                state: self.lifecycle,
            });
        }
        self.strategy.on_reseted();
        for sub in &mut self.subscriptions {
            sub.reset();
        }
        self.subscriptions.clear();
        self.ids = IdGen::default();
        self.translator =
            OrderTranslator::new(self.config.instrument.clone(), self.strategy.name());
        self.protection.reset();
        self.gate.formed = false;
        self.state = StrategyState::default();
        self.last_price = None;
        self.incidents.clear();
        self.log.info("reset");
        Ok(())
    }

    fn halt(&mut self) {
        self.strategy.on_stopped();
        self.lifecycle = LifecycleState::Stopped;
        self.strategy.params_mut().unlock();
    }

    /// Contract violation: log, stop the instance, hand the error back.
    fn fail(&mut self, error: EngineError) -> EngineError {
        self.log.error(format!("{} ({}): stopping", error, error.kind()));
        self.translator.cancel_all(self.sink.as_mut());
        self.halt();
        error
    }

    // ── Inbound market data ──

    /// Deliver one candle of `instrument` at `timeframe`.
    pub fn on_candle(
        &mut self,
        instrument: &str,
        timeframe: Timeframe,
        candle: Candle,
    ) -> Result<(), EngineError> {
        if !self.lifecycle.is_running() {
            debug!(strategy = self.strategy.name(), state = %self.lifecycle, "candle dropped");
            return Ok(());
        }
        let key = StreamKey::new(instrument, timeframe);
        let Some(index) = self.subscriptions.iter().position(|s| s.key() == &key) else {
            debug!(strategy = self.strategy.name(), stream = %key, "no subscription for stream");
            return Ok(());
        };
        self.log.set_time(candle.open_time);

        let report = match self.subscriptions[index].process(&candle) {
            Ok(report) => report,
            Err(e) => return Err(self.fail(e)),
        };
        for name in &report.degenerate {
            let error = EngineError::NonFiniteOutput { name: name.clone() };
            self.incident(Some(candle.open_time), error.kind(), error.to_string());
        }

        if !candle.is_finished() {
            return Ok(());
        }
        self.last_price = Some(candle.close);
        if index == 0 {
            self.protection.on_finished_candle(&candle);
        }
        self.update_gate();

        if self.subscriptions[index].outputs().all_formed() {
            self.state.initialized = true;
        }

        if report.degenerate.is_empty() {
            let sub_id = self.subscriptions[index].id();
            let result = {
                let mut ctx = TradeContext {
                    translator: &mut self.translator,
                    sink: self.sink.as_mut(),
                    protection: &mut self.protection,
                    log: &mut self.log,
                    incidents: &mut self.incidents,
                    config: &self.config,
                    lifecycle: self.lifecycle,
                    candle: &candle,
                };
                self.strategy.on_candle(
                    sub_id,
                    &candle,
                    self.subscriptions[index].outputs(),
                    &mut ctx,
                )
            };
            self.state.candles_processed += 1;
            if let Err(e) = result {
                if e.is_fatal() {
                    return Err(self.fail(e));
                }
                self.incident(Some(candle.open_time), e.kind(), e.to_string());
            }
        }

        if let Err(e) = self.run_protection(&candle) {
            return Err(self.fail(e));
        }
        self.state.position = self.translator.position();
        Ok(())
    }

    fn update_gate(&mut self) {
        self.gate.formed = self.subscriptions.iter().all(Subscription::is_formed);
        let next = self.lifecycle.after_gate(self.gate.is_open());
        if next != self.lifecycle {
            self.log.info(format!("state {} -> {}", self.lifecycle, next));
            self.lifecycle = next;
        }
    }

    fn run_protection(&mut self, candle: &Candle) -> Result<(), EngineError> {
        if !matches!(
            self.lifecycle,
            LifecycleState::Trading | LifecycleState::Suspended
        ) {
            return Ok(());
        }
        let Some(fire) = self.protection.evaluate(candle.close) else {
            return Ok(());
        };
        self.log.info(format!(
            "{} hit at {} (level {})",
            fire.trigger, fire.price, fire.level
        ));
        let outcome = self.translator.execute(
            OrderIntent::ClosePosition,
            IntentSource::Protection,
            candle.close,
            candle.open_time,
            self.sink.as_mut(),
        )?;
        if let IntentOutcome::Rejected { reason } = &outcome {
            let message = format!("protection exit rejected: {reason}");
            self.incident(Some(candle.open_time), ErrorKind::OrderRejection, message);
            self.protection.retry();
        }
        self.apply_fills()?;
        Ok(())
    }

    fn apply_fills(&mut self) -> Result<Vec<PositionChange>, EngineError> {
        let changes = self.translator.poll_fills(self.sink.as_mut())?;
        self.sync_position();
        Ok(changes)
    }

    fn sync_position(&mut self) {
        let position = self.translator.position();
        self.protection.on_position(position);
        self.state.position = position;
    }

    fn incident(&mut self, time: Option<DateTime<Utc>>, kind: ErrorKind, message: String) {
        self.log.warn(format!("{kind}: {message}"));
        self.incidents.push(Incident {
            time,
            kind,
            message,
        });
    }

    // ── Inbound order flow ──

    /// Fill notification from an asynchronous venue.
    pub fn on_own_trade(&mut self, trade: OwnTrade) -> Result<PositionChange, EngineError> {
        if self.lifecycle == LifecycleState::Constructed {
            return Err(EngineError::InvalidState {
                operation: "on_own_trade",
                state: self.lifecycle,
            });
        }
        let change = match self.translator.on_own_trade(trade) {
            Ok(change) => change,
            Err(e) => return Err(self.fail(e)),
        };
        self.sync_position();
        Ok(change)
    }

    /// The venue failed an order after accepting it.
    pub fn on_order_failed(&mut self, order_id: OrderId, reason: &str) {
        let known = self.translator.on_order_failed(order_id, reason).is_some();
        let message = if known {
            format!("order {order_id} failed: {reason}")
        } else {
            format!("unknown order {order_id} failed: {reason}")
        };
        self.incident(self.log.time(), ErrorKind::OrderRejection, message);
        self.protection.retry();
    }

    /// Periodic host call: pick up fills and re-read the authoritative
    /// position after a rejection.
    pub fn heartbeat(&mut self, time: DateTime<Utc>) -> Result<(), EngineError> {
        self.log.set_time(time);
        if let Err(e) = self.apply_fills() {
            return Err(self.fail(e));
        }
        if let Some(change) = self.translator.resync(self.sink.as_ref()) {
            self.log.warn(format!(
                "position resynced from {} to {}",
                change.before.quantity, change.after.quantity
            ));
            self.sync_position();
        }
        Ok(())
    }

    pub fn set_online(&mut self, online: bool) {
        self.gate.online = online;
        if self.lifecycle.is_running() {
            self.update_gate();
        }
    }

    pub fn set_allowed_to_trade(&mut self, allowed: bool) {
        self.gate.allowed_to_trade = allowed;
        if self.lifecycle.is_running() {
            self.update_gate();
        }
    }
}

impl std::fmt::Debug for StrategyRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRunner")
            .field("strategy", &self.strategy.name())
            .field("lifecycle", &self.lifecycle)
            .field("subscriptions", &self.subscriptions)
            .field("position", &self.translator.position())
            .finish()
    }
}
