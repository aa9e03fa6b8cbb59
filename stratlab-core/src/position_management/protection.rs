//! Declarative stop-loss / take-profit / trailing stop.
//!
//! Configured once per run with `start_protection`. Whenever a position is
//! open the module holds exit levels derived from the entry price and, on
//! every finished candle after the decision callback, compares the close
//! against them. A hit yields a [`ProtectionFire`]; the runner turns it into a
//! `ClosePosition` intent. Levels are recomputed whenever the net position
//! changes.

use super::ratchet::StopRatchet;
use crate::domain::{round_half_even, Candle, NetPosition, Side};
use crate::indicators::{Atr, Indicator, IndicatorInput};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance of one protection leg from the reference price. Zero disables
/// the leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProtectionUnit {
    /// Price offset.
    Absolute(f64),
    /// Percent of the reference price.
    Percent(f64),
    /// Multiple of the protection ATR.
    AtrMultiple(f64),
}

impl ProtectionUnit {
    pub fn disabled() -> Self {
        ProtectionUnit::Absolute(0.0)
    }

    pub fn is_enabled(&self) -> bool {
        let v = match self {
            ProtectionUnit::Absolute(v)
            | ProtectionUnit::Percent(v)
            | ProtectionUnit::AtrMultiple(v) => *v,
        };
        v.is_finite() && v > 0.0
    }

    pub fn needs_atr(&self) -> bool {
        matches!(self, ProtectionUnit::AtrMultiple(_)) && self.is_enabled()
    }

    /// Distance from `reference`; `None` for an ATR leg while the ATR is not
    /// formed, or for a disabled leg.
    pub fn distance(&self, reference: f64, atr: Option<f64>) -> Option<f64> {
        if !self.is_enabled() {
            return None;
        }
        match *self {
            ProtectionUnit::Absolute(d) => Some(d),
            ProtectionUnit::Percent(p) => Some(reference.abs() * p / 100.0),
            ProtectionUnit::AtrMultiple(m) => atr.map(|a| a * m),
        }
    }
}

impl fmt::Display for ProtectionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectionUnit::Absolute(v) => write!(f, "{v}"),
            ProtectionUnit::Percent(v) => write!(f, "{v}%"),
            ProtectionUnit::AtrMultiple(v) => write!(f, "{v}xATR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtectionSpec {
    pub take_profit: ProtectionUnit,
    pub stop_loss: ProtectionUnit,
    pub is_trailing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtectionTrigger {
    StopLoss,
    TakeProfit,
    TrailingStop,
}

impl fmt::Display for ProtectionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProtectionTrigger::StopLoss => "stop-loss",
            ProtectionTrigger::TakeProfit => "take-profit",
            ProtectionTrigger::TrailingStop => "trailing stop",
        };
        write!(f, "{s}")
    }
}

/// A protection exit that became due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectionFire {
    pub trigger: ProtectionTrigger,
    pub level: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arm {
    /// No spec, or flat.
    Idle,
    Armed,
    /// Exit requested; waiting for the position to change.
    Fired,
    /// Exit handed to the translator by a strategy intent.
    Disarmed,
}

#[derive(Debug, Clone)]
pub struct ProtectionModule {
    spec: Option<ProtectionSpec>,
    price_step: f64,
    atr: Atr,
    atr_value: Option<f64>,
    position: NetPosition,
    arm: Arm,
    best: f64,
    stop: Option<StopRatchet>,
    take_profit: Option<f64>,
}

impl ProtectionModule {
    pub fn new(atr_length: usize, price_step: f64) -> Self {
        Self {
            spec: None,
            price_step,
            atr: Atr::new(atr_length.max(1)),
            atr_value: None,
            position: NetPosition::flat(),
            arm: Arm::Idle,
            best: 0.0,
            stop: None,
            take_profit: None,
        }
    }

    pub fn start(&mut self, spec: ProtectionSpec) {
        self.spec = Some(spec);
        self.rearm();
    }

    pub fn spec(&self) -> Option<&ProtectionSpec> {
        self.spec.as_ref()
    }

    pub fn is_armed(&self) -> bool {
        self.arm == Arm::Armed
    }

    pub fn stop_level(&self) -> Option<f64> {
        self.stop.and_then(|s| s.level())
    }

    pub fn take_profit_level(&self) -> Option<f64> {
        self.take_profit
    }

    pub fn atr(&self) -> Option<f64> {
        self.atr_value
    }

    /// Feed the protection ATR. Only finished candles advance it.
    pub fn on_finished_candle(&mut self, candle: &Candle) {
        if !candle.is_finished() {
            return;
        }
        if let Some(v) = self.atr.next(&IndicatorInput::Candle(*candle)) {
            self.atr_value = Some(v);
        }
        // ATR legs that were waiting for a formed ATR.
        if self.arm == Arm::Armed {
            self.arm_pending_legs();
        }
    }

    /// Track the translator's position; re-arms when it changed.
    pub fn on_position(&mut self, position: NetPosition) {
        if position == self.position {
            return;
        }
        self.position = position;
        self.rearm();
    }

    /// Stand down until the next position change. Used when a strategy
    /// intent closes or flips the position itself.
    pub fn disarm(&mut self) {
        if self.arm == Arm::Armed {
            self.arm = Arm::Disarmed;
        }
    }

    /// The exit (ours or the strategy's) was refused; evaluate again on the
    /// next candle.
    pub fn retry(&mut self) {
        if matches!(self.arm, Arm::Fired | Arm::Disarmed) {
            self.arm = Arm::Armed;
        }
    }

    fn rearm(&mut self) {
        self.stop = None;
        self.take_profit = None;
        let (Some(_), Some(side)) = (self.spec, self.position.side()) else {
            self.arm = Arm::Idle;
            return;
        };
        self.best = self.position.entry_price;
        self.stop = Some(StopRatchet::new(side));
        self.arm = Arm::Armed;
        self.arm_pending_legs();
    }

    fn arm_pending_legs(&mut self) {
        let (Some(spec), Some(side)) = (self.spec, self.position.side()) else {
            return;
        };
        let entry = self.position.entry_price;
        let sign = match side {
            Side::Long => 1.0,
            Side::Short => -1.0,
        };

        if self.take_profit.is_none() {
            if let Some(d) = spec.take_profit.distance(entry, self.atr_value) {
                self.take_profit = Some(self.snap(entry + sign * d));
            }
        }

        if let Some(stop) = self.stop.as_mut() {
            if stop.level().is_none() {
                let reference = if spec.is_trailing { self.best } else { entry };
                if let Some(d) = spec.stop_loss.distance(reference, self.atr_value) {
                    let level = round_half_even(reference - sign * d, self.price_step);
                    stop.tighten(level);
                }
            }
        }
    }

    fn snap(&self, level: f64) -> f64 {
        round_half_even(level, self.price_step)
    }

    /// Compare `price` with the armed levels.
    ///
    /// For trailing stops the most favourable price is updated first, so a
    /// new extreme tightens the stop before the breach check.
    pub fn evaluate(&mut self, price: f64) -> Option<ProtectionFire> {
        if self.arm != Arm::Armed || !price.is_finite() {
            return None;
        }
        let spec = self.spec?;
        let side = self.position.side()?;

        self.best = match side {
            Side::Long => self.best.max(price),
            Side::Short => self.best.min(price),
        };
        if spec.is_trailing {
            if let Some(d) = spec.stop_loss.distance(self.best, self.atr_value) {
                let proposed = match side {
                    Side::Long => self.best - d,
                    Side::Short => self.best + d,
                };
                let proposed = self.snap(proposed);
                if let Some(stop) = self.stop.as_mut() {
                    stop.tighten(proposed);
                }
            }
        }

        let fire = self.check(price, side, spec.is_trailing);
        if fire.is_some() {
            self.arm = Arm::Fired;
        }
        fire
    }

    /// Whether `price` breaches the current levels, without changing state.
    pub fn would_fire(&self, price: f64) -> bool {
        match (self.arm, self.spec, self.position.side()) {
            (Arm::Armed, Some(spec), Some(side)) => {
                self.check(price, side, spec.is_trailing).is_some()
            }
            _ => false,
        }
    }

    fn check(&self, price: f64, side: Side, trailing: bool) -> Option<ProtectionFire> {
        if let Some(stop) = self.stop {
            if stop.is_breached(price) {
                let trigger = if trailing {
                    ProtectionTrigger::TrailingStop
                } else {
                    ProtectionTrigger::StopLoss
                };
                return Some(ProtectionFire {
                    trigger,
                    level: stop.level().unwrap_or(price),
                    price,
                });
            }
        }
        let tp = self.take_profit?;
        let hit = match side {
            Side::Long => price >= tp,
            Side::Short => price <= tp,
        };
        hit.then_some(ProtectionFire {
            trigger: ProtectionTrigger::TakeProfit,
            level: tp,
            price,
        })
    }

    pub fn reset(&mut self) {
        self.spec = None;
        self.atr.reset();
        self.atr_value = None;
        self.position = NetPosition::flat();
        self.arm = Arm::Idle;
        self.best = 0.0;
        self.stop = None;
        self.take_profit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use crate::indicators::make_candles;

    fn long_at(price: f64) -> NetPosition {
        let mut p = NetPosition::flat();
        p.apply_fill(OrderSide::Buy, price, 1.0);
        p
    }

    fn short_at(price: f64) -> NetPosition {
        let mut p = NetPosition::flat();
        p.apply_fill(OrderSide::Sell, price, 1.0);
        p
    }

    fn module(spec: ProtectionSpec) -> ProtectionModule {
        let mut m = ProtectionModule::new(14, 0.0);
        m.start(spec);
        m
    }

    fn stop_only(unit: ProtectionUnit, trailing: bool) -> ProtectionSpec {
        ProtectionSpec {
            take_profit: ProtectionUnit::disabled(),
            stop_loss: unit,
            is_trailing: trailing,
        }
    }

    #[test]
    fn percent_trailing_ratchets_from_best_price() {
        let mut m = module(stop_only(ProtectionUnit::Percent(2.0), true));
        m.on_position(long_at(100.0));
        assert_eq!(m.evaluate(100.0), None);
        assert!((m.stop_level().unwrap() - 98.0).abs() < 1e-9);
        assert_eq!(m.evaluate(105.0), None);
        assert!((m.stop_level().unwrap() - 102.9).abs() < 1e-9);
        assert_eq!(m.evaluate(103.0), None);
        let fire = m.evaluate(101.0).unwrap();
        assert_eq!(fire.trigger, ProtectionTrigger::TrailingStop);
        assert!((fire.level - 102.9).abs() < 1e-9);
        // Fired once; stays quiet until the position changes.
        assert_eq!(m.evaluate(90.0), None);
    }

    #[test]
    fn fixed_stop_and_take_profit_for_short() {
        let spec = ProtectionSpec {
            take_profit: ProtectionUnit::Absolute(5.0),
            stop_loss: ProtectionUnit::Absolute(2.0),
            is_trailing: false,
        };
        let mut m = module(spec);
        m.on_position(short_at(100.0));
        assert_eq!(m.stop_level(), Some(102.0));
        assert_eq!(m.take_profit_level(), Some(95.0));
        assert_eq!(m.evaluate(97.0), None);
        // Fixed stop does not follow the price.
        assert_eq!(m.stop_level(), Some(102.0));
        let fire = m.evaluate(95.0).unwrap();
        assert_eq!(fire.trigger, ProtectionTrigger::TakeProfit);
    }

    #[test]
    fn stop_checked_before_take_profit() {
        let spec = ProtectionSpec {
            take_profit: ProtectionUnit::Percent(1.0),
            stop_loss: ProtectionUnit::Percent(1.0),
            is_trailing: false,
        };
        let mut m = module(spec);
        m.on_position(long_at(100.0));
        let fire = m.evaluate(98.5).unwrap();
        assert_eq!(fire.trigger, ProtectionTrigger::StopLoss);
    }

    #[test]
    fn atr_leg_waits_for_formed_atr() {
        let mut m = ProtectionModule::new(3, 0.0);
        m.start(stop_only(ProtectionUnit::AtrMultiple(2.0), false));
        m.on_position(long_at(100.0));
        assert!(m.is_armed());
        assert_eq!(m.stop_level(), None);
        assert_eq!(m.evaluate(50.0), None);

        // Each candle has a true range of 2.
        let candles = make_candles(&[100.0, 100.0, 100.0]);
        for c in &candles {
            m.on_finished_candle(c);
        }
        assert!((m.atr().unwrap() - 2.0).abs() < 1e-9);
        assert!((m.stop_level().unwrap() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn position_change_rearms() {
        let mut m = module(stop_only(ProtectionUnit::Absolute(1.0), false));
        m.on_position(long_at(100.0));
        assert!(m.evaluate(99.0).is_some());
        m.on_position(long_at(110.0));
        assert!(m.is_armed());
        assert_eq!(m.stop_level(), Some(109.0));
        m.on_position(NetPosition::flat());
        assert!(!m.is_armed());
        assert_eq!(m.stop_level(), None);
    }

    #[test]
    fn disarm_holds_until_position_changes() {
        let mut m = module(stop_only(ProtectionUnit::Absolute(1.0), false));
        m.on_position(long_at(100.0));
        m.disarm();
        assert_eq!(m.evaluate(90.0), None);
        m.on_position(short_at(90.0));
        assert!(m.is_armed());
        assert_eq!(m.stop_level(), Some(91.0));
    }

    #[test]
    fn retry_after_failed_exit() {
        let mut m = module(stop_only(ProtectionUnit::Absolute(1.0), false));
        m.on_position(long_at(100.0));
        assert!(m.evaluate(98.0).is_some());
        m.retry();
        assert!(m.would_fire(98.0));
        assert!(m.evaluate(98.0).is_some());
    }

    #[test]
    fn levels_snap_to_price_step() {
        let mut m = ProtectionModule::new(14, 0.25);
        m.start(stop_only(ProtectionUnit::Percent(1.0), false));
        // 100.25 * 0.99 = 99.2475 -> 99.25
        m.on_position(long_at(100.25));
        assert!((m.stop_level().unwrap() - 99.25).abs() < 1e-9);
    }

    #[test]
    fn no_spec_never_fires() {
        let mut m = ProtectionModule::new(14, 0.0);
        m.on_position(long_at(100.0));
        assert!(!m.is_armed());
        assert_eq!(m.evaluate(1.0), None);
    }
}
