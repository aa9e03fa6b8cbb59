//! Runner integration tests: lifecycle, warm-up gate, intents, protection,
//! fatal errors, replay determinism and multi-timeframe delivery.

use chrono::{DateTime, Duration, TimeZone, Utc};
use stratlab_core::config::EngineConfig;
use stratlab_core::domain::{
    Candle, IntentSource, NetPosition, Order, OrderId, OrderIntent, OrderSide, OwnTrade,
    SubscriptionId, Timeframe,
};
use stratlab_core::engine::{
    replay, Handle, IndicatorOutputs, IntentOutcome, LifecycleState, OrderSink, ReplayOptions,
    SimulatedSink, SinkError, StrategyRunner,
};
use stratlab_core::error::{EngineError, ErrorKind};
use stratlab_core::indicators::Sma;
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::position_management::ProtectionUnit;
use stratlab_core::strategy::{Previous, StartContext, Strategy, TradeContext};
use stratlab_core::synthetic::{generate, SyntheticSpec};

// ── Test strategy ────────────────────────────────────────────────────

/// Buys on a chosen candle (or every candle), closes when price drops
/// below its SMA, and records every callback.
struct Scripted {
    params: ParamSet,
    sma: Option<Handle<f64>>,
    prev_close: Previous<f64>,
    seen: usize,
    calls: Vec<(SubscriptionId, DateTime<Utc>)>,
    outcomes: Vec<IntentOutcome>,
}

impl Scripted {
    fn new() -> Self {
        Self {
            params: ParamSet::new()
                .declare(ParamDescriptor::int("Length", 2).range(1.0, 50.0, 1.0))
                .declare(ParamDescriptor::int("EnterOn", 0))
                .declare(ParamDescriptor::bool("BuyEvery", false))
                .declare(ParamDescriptor::bool("ExitBelowSma", false))
                .declare(ParamDescriptor::float("StopPercent", 0.0))
                .declare(ParamDescriptor::bool("Trailing", false))
                .declare(ParamDescriptor::bool("UseH4", false)),
            sma: None,
            prev_close: Previous::default(),
            seen: 0,
            calls: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    fn with(mut self, name: &str, value: &str) -> Self {
        self.params.set_str(name, value).unwrap();
        self
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(Timeframe::H1);
        self.sma = Some(ctx.bind(sub, Sma::new(self.params.get_usize("Length")?))?);
        if self.params.get_bool("UseH4")? {
            ctx.subscribe(Timeframe::H4);
        }
        let stop = self.params.get_float("StopPercent")?;
        if stop > 0.0 {
            ctx.start_protection(
                ProtectionUnit::disabled(),
                ProtectionUnit::Percent(stop),
                self.params.get_bool("Trailing")?,
            );
        }
        Ok(())
    }

    fn on_candle(
        &mut self,
        sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        self.calls.push((sub, candle.open_time));
        if candle.timeframe != Timeframe::H1 {
            return Ok(());
        }
        self.seen += 1;
        self.prev_close.shift(candle.close);

        let enter_on = self.params.get_usize("EnterOn")?;
        if self.params.get_bool("BuyEvery")? || (enter_on > 0 && self.seen == enter_on) {
            let outcome = ctx.buy_market(ctx.volume())?;
            self.outcomes.push(outcome);
        }

        let Some(sma) = self.sma.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        if self.params.get_bool("ExitBelowSma")? && ctx.position() > 0.0 && candle.close < sma {
            let outcome = ctx.close_position()?;
            self.outcomes.push(outcome);
        }
        Ok(())
    }

    fn on_reseted(&mut self) {
        self.prev_close.clear();
        self.seen = 0;
        self.calls.clear();
        self.outcomes.clear();
    }

    fn create_clone(&self) -> Box<dyn Strategy> {
        let mut clone = Scripted::new();
        clone.params.copy_values_from(&self.params);
        Box::new(clone)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
}

fn hourly(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle::finished(
                t0() + Duration::hours(i as i64),
                Timeframe::H1,
                open,
                open.max(close) + 0.5,
                open.min(close) - 0.5,
                close,
                1_000.0,
            )
        })
        .collect()
}

fn runner(scripted: Scripted) -> StrategyRunner {
    StrategyRunner::simulated(Box::new(scripted), EngineConfig::new("SIM"))
}

fn feed(runner: &mut StrategyRunner, candles: &[Candle]) {
    for c in candles {
        runner.on_candle("SIM", Timeframe::H1, *c).unwrap();
    }
}

// ── Lifecycle ────────────────────────────────────────────────────────

#[test]
fn warmup_gate_moves_started_to_trading() {
    let mut r = runner(Scripted::new().with("Length", "3"));
    assert_eq!(r.lifecycle(), LifecycleState::Constructed);
    r.start(t0()).unwrap();
    assert_eq!(r.lifecycle(), LifecycleState::Started);

    let candles = hourly(&[10.0, 11.0, 12.0, 13.0]);
    feed(&mut r, &candles[..2]);
    assert_eq!(r.lifecycle(), LifecycleState::Started);
    assert!(!r.state().initialized);
    assert_eq!(r.state().candles_processed, 2);

    feed(&mut r, &candles[2..3]);
    assert_eq!(r.lifecycle(), LifecycleState::Trading);
    assert!(r.state().initialized);
}

#[test]
fn gate_flags_suspend_and_resume_trading() {
    let mut r = runner(Scripted::new().with("Length", "1"));
    r.start(t0()).unwrap();
    feed(&mut r, &hourly(&[10.0]));
    assert_eq!(r.lifecycle(), LifecycleState::Trading);

    r.set_online(false);
    assert_eq!(r.lifecycle(), LifecycleState::Suspended);
    r.set_online(true);
    assert_eq!(r.lifecycle(), LifecycleState::Trading);
    r.set_allowed_to_trade(false);
    assert_eq!(r.lifecycle(), LifecycleState::Suspended);
}

#[test]
fn intents_during_warmup_are_journaled_as_rejected() {
    let mut r = runner(Scripted::new().with("Length", "3").with("BuyEvery", "true"));
    r.start(t0()).unwrap();
    feed(&mut r, &hourly(&[10.0, 11.0, 12.0]));

    let journal = r.intent_journal();
    assert_eq!(journal.len(), 3);
    assert!(journal[0].outcome.is_rejected());
    assert!(journal[1].outcome.is_rejected());
    assert!(journal[2].outcome.is_submitted());
    // Rejections are not fatal.
    assert!(r.lifecycle().is_running());
    assert_eq!(r.position().quantity, 1.0);
}

#[test]
fn params_are_locked_while_running() {
    let mut r = runner(Scripted::new());
    r.set_param("Length", "5").unwrap();
    r.start(t0()).unwrap();
    let err = r.set_param("Length", "7").unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));

    r.stop(t0() + Duration::hours(1)).unwrap();
    assert_eq!(r.lifecycle(), LifecycleState::Stopped);
    r.set_param("Length", "7").unwrap();
    assert_eq!(r.params().get_int("Length").unwrap(), 7);
}

#[test]
fn reset_is_only_legal_when_stopped() {
    let mut r = runner(Scripted::new().with("Length", "1").with("EnterOn", "2"));
    assert!(r.reset().is_err());
    r.start(t0()).unwrap();
    assert!(r.reset().is_err());
    feed(&mut r, &hourly(&[10.0, 11.0, 12.0]));
    assert_eq!(r.position().quantity, 1.0);

    r.stop(t0() + Duration::hours(3)).unwrap();
    // Position persists across stop unless flattening was requested.
    assert_eq!(r.position().quantity, 1.0);
    r.reset().unwrap();
    assert_eq!(r.lifecycle(), LifecycleState::Stopped);
    assert!(r.position().is_flat());
    assert!(r.intent_journal().is_empty());
    assert!(r.subscriptions().is_empty());
}

#[test]
fn restart_after_reset_replays_identically() {
    let candles = hourly(&[10.0, 11.0, 12.0, 11.0, 10.0, 12.0]);
    let mut r = runner(
        Scripted::new()
            .with("Length", "2")
            .with("EnterOn", "3")
            .with("ExitBelowSma", "true"),
    );
    r.start(t0()).unwrap();
    feed(&mut r, &candles);
    r.stop(t0() + Duration::hours(6)).unwrap();
    let first = r.fingerprint();

    r.reset().unwrap();
    r.start(t0()).unwrap();
    feed(&mut r, &candles);
    r.stop(t0() + Duration::hours(6)).unwrap();
    assert_eq!(r.fingerprint(), first);
}

#[test]
fn candles_after_stop_are_dropped() {
    let mut r = runner(Scripted::new().with("Length", "1"));
    r.start(t0()).unwrap();
    feed(&mut r, &hourly(&[10.0]));
    r.stop(t0() + Duration::hours(1)).unwrap();
    let candles = hourly(&[10.0, 11.0]);
    r.on_candle("SIM", Timeframe::H1, candles[1]).unwrap();
    assert_eq!(r.state().candles_processed, 1);
}

// ── Contract violations ──────────────────────────────────────────────

#[test]
fn out_of_order_candle_stops_the_instance() {
    let mut r = runner(Scripted::new().with("Length", "1").with("EnterOn", "2"));
    r.start(t0()).unwrap();
    let candles = hourly(&[10.0, 11.0, 12.0]);
    feed(&mut r, &candles[1..]);
    assert_eq!(r.position().quantity, 1.0);

    let err = r.on_candle("SIM", Timeframe::H1, candles[0]).unwrap_err();
    assert!(matches!(err, EngineError::CandleOutOfOrder { .. }));
    assert_eq!(err.kind(), ErrorKind::ContractViolation);
    assert_eq!(r.lifecycle(), LifecycleState::Stopped);
    assert!(r
        .log_records()
        .iter()
        .any(|rec| rec.message.contains("stopping")));
}

#[test]
fn unknown_stream_is_ignored() {
    let mut r = runner(Scripted::new());
    r.start(t0()).unwrap();
    let candle = hourly(&[10.0])[0];
    r.on_candle("OTHER", Timeframe::H1, candle).unwrap();
    assert_eq!(r.state().candles_processed, 0);
}

// ── Order flow ───────────────────────────────────────────────────────

#[test]
fn venue_rejection_is_an_incident_not_a_stop() {
    let mut sink = SimulatedSink::new();
    sink.reject_next("market closed");
    let scripted = Scripted::new().with("Length", "1").with("BuyEvery", "true");
    let mut r = StrategyRunner::new(Box::new(scripted), EngineConfig::new("SIM"), Box::new(sink));
    r.start(t0()).unwrap();
    feed(&mut r, &hourly(&[10.0, 11.0]));

    assert!(r.intent_journal()[0].outcome.is_rejected());
    assert!(r.intent_journal()[1].outcome.is_submitted());
    assert!(r
        .incidents()
        .iter()
        .any(|i| i.kind == ErrorKind::OrderRejection));
    assert_eq!(r.lifecycle(), LifecycleState::Trading);
    assert_eq!(r.position().quantity, 1.0);

    r.heartbeat(t0() + Duration::hours(2)).unwrap();
    assert_eq!(r.position().quantity, 1.0);
}

/// Venue that accepts orders and reports fills only through the host.
#[derive(Default)]
struct AsyncVenue {
    orders: Vec<Order>,
}

impl OrderSink for AsyncVenue {
    fn submit(&mut self, order: &Order) -> Result<(), SinkError> {
        self.orders.push(order.clone());
        Ok(())
    }

    fn cancel(&mut self, order_id: OrderId) -> Result<(), SinkError> {
        Err(SinkError::NotFound(order_id))
    }

    fn poll_trades(&mut self) -> Vec<OwnTrade> {
        Vec::new()
    }

    fn net_position(&self, _instrument: &str) -> Option<NetPosition> {
        None
    }
}

#[test]
fn asynchronous_fills_update_the_position() {
    let scripted = Scripted::new().with("Length", "1").with("EnterOn", "1");
    let mut r = StrategyRunner::new(
        Box::new(scripted),
        EngineConfig::new("SIM").with_volume(3.0),
        Box::new(AsyncVenue::default()),
    );
    r.start(t0()).unwrap();
    feed(&mut r, &hourly(&[10.0]));
    assert!(r.position().is_flat());

    let order_id = match &r.intent_journal()[0].outcome {
        IntentOutcome::Submitted { order_id, .. } => *order_id,
        other => panic!("unexpected outcome {other:?}"),
    };
    for (volume, price) in [(1.0, 10.0), (2.0, 10.3)] {
        r.on_own_trade(OwnTrade {
            order_id: Some(order_id),
            instrument: "SIM".into(),
            side: OrderSide::Buy,
            price,
            volume,
            time: t0() + Duration::minutes(70),
        })
        .unwrap();
    }
    let pos = r.position();
    assert_eq!(pos.quantity, 3.0);
    assert!((pos.entry_price - 10.2).abs() < 1e-9);

    let err = r
        .on_own_trade(OwnTrade {
            order_id: None,
            instrument: "OTHER".into(),
            side: OrderSide::Buy,
            price: 1.0,
            volume: 1.0,
            time: t0() + Duration::minutes(80),
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::ForeignTrade { .. }));
    assert_eq!(r.lifecycle(), LifecycleState::Stopped);
}

#[test]
fn flatten_on_stop_closes_through_the_engine() {
    let scripted = Scripted::new().with("Length", "1").with("EnterOn", "1");
    let config = EngineConfig::new("SIM").with_flatten_on_stop(true);
    let mut r = StrategyRunner::simulated(Box::new(scripted), config);
    r.start(t0()).unwrap();
    feed(&mut r, &hourly(&[10.0, 11.0]));
    assert_eq!(r.position().quantity, 1.0);

    r.stop(t0() + Duration::hours(2)).unwrap();
    assert!(r.position().is_flat());
    let last = r.intent_journal().last().unwrap();
    assert_eq!(last.source, IntentSource::Engine);
    assert_eq!(last.intent, OrderIntent::ClosePosition);
}

// ── Protection ───────────────────────────────────────────────────────

#[test]
fn trailing_stop_ratchets_and_fires() {
    let scripted = Scripted::new()
        .with("Length", "2")
        .with("EnterOn", "2")
        .with("StopPercent", "2")
        .with("Trailing", "true");
    let mut r = runner(scripted);
    r.start(t0()).unwrap();
    feed(&mut r, &hourly(&[100.0, 100.0, 105.0, 103.0]));
    assert_eq!(r.position().quantity, 1.0);
    assert_eq!(r.position().entry_price, 100.0);
    let stop = r.protection().stop_level().unwrap();
    assert!((stop - 102.9).abs() < 1e-9, "stop {stop}");

    let candles = hourly(&[100.0, 100.0, 105.0, 103.0, 101.0]);
    feed(&mut r, &candles[4..]);
    assert!(r.position().is_flat());
    let last = r.intent_journal().last().unwrap();
    assert_eq!(last.source, IntentSource::Protection);
    assert_eq!(last.intent, OrderIntent::ClosePosition);
    assert!(matches!(
        last.outcome,
        IntentOutcome::Submitted {
            side: OrderSide::Sell,
            ..
        }
    ));
}

#[test]
fn strategy_close_disarms_protection() {
    let scripted = Scripted::new()
        .with("Length", "2")
        .with("EnterOn", "2")
        .with("ExitBelowSma", "true")
        .with("StopPercent", "50");
    let mut r = runner(scripted);
    r.start(t0()).unwrap();
    feed(&mut r, &hourly(&[100.0, 100.0, 90.0]));
    assert!(r.position().is_flat());
    assert!(!r.protection().is_armed());
    let sources: Vec<_> = r.intent_journal().iter().map(|i| i.source).collect();
    assert_eq!(sources, vec![IntentSource::Strategy, IntentSource::Strategy]);
}

// ── Replay ───────────────────────────────────────────────────────────

fn synthetic(bars: usize) -> Vec<Candle> {
    let spec = SyntheticSpec {
        bars,
        ..SyntheticSpec::default()
    };
    generate(&spec, "SIM", Timeframe::H1, t0())
}

#[test]
fn replay_is_deterministic() {
    let candles = synthetic(300);
    let make = || {
        runner(
            Scripted::new()
                .with("Length", "10")
                .with("EnterOn", "20")
                .with("ExitBelowSma", "true"),
        )
    };
    let a = replay(&mut make(), &candles, &ReplayOptions::default()).unwrap();
    let b = replay(&mut make(), &candles, &ReplayOptions::default()).unwrap();
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.intents, b.intents);
    assert_eq!(a.candles, 300);
    assert_eq!(a.final_state, LifecycleState::Stopped);
}

#[test]
fn replay_builds_higher_timeframe_candles() {
    let candles = synthetic(9);
    let mut r = runner(Scripted::new().with("UseH4", "true"));
    let options = ReplayOptions {
        emit_partials: true,
    };
    let report = replay(&mut r, &candles, &options).unwrap();
    assert_eq!(report.candles, 9);

    let h4: Vec<_> = r.subscriptions().iter().map(|s| s.key().timeframe).collect();
    assert_eq!(h4, vec![Timeframe::H1, Timeframe::H4]);
    // 9 hourly candles from midnight complete two 4h buckets.
    assert_eq!(r.subscriptions()[1].finished_count(), 2);
    assert_eq!(r.state().candles_processed, 11);
}

#[test]
fn create_clone_copies_parameter_values() {
    let scripted = Scripted::new().with("Length", "9");
    let clone = scripted.create_clone();
    assert_eq!(clone.params().get_int("Length").unwrap(), 9);
    assert_eq!(clone.params().hash(), scripted.params().hash());
}
