//! Stochastic hook reversal.
//!
//! An upward hook is %K turning up from inside the oversold zone: the
//! previous %K fell below `OversoldLevel` and the current %K is higher.
//! Upward hooks go long, downward hooks (mirror in the overbought zone) go
//! short. Nothing happens when the position already points the same way.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Stochastic, StochasticValue};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "stochastic_hook";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Up,
    Down,
}

/// Classify the last three %K values.
pub fn detect_hook(
    before: f64,
    previous: f64,
    current: f64,
    oversold: f64,
    overbought: f64,
) -> Option<Hook> {
    if previous < oversold && previous < before && current > previous {
        Some(Hook::Up)
    } else if previous > overbought && previous > before && current < previous {
        Some(Hook::Down)
    } else {
        None
    }
}

#[derive(Debug, Default)]
struct Tracked {
    k1: Previous<f64>,
    k2: Previous<f64>,
}

pub struct StochasticHook {
    params: ParamSet,
    stochastic: Option<Handle<StochasticValue>>,
    state: Tracked,
}

impl StochasticHook {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("StochLength", 14)
                    .range(1.0, 100.0, 1.0)
                    .optimize()
                    .display("Stochastic length", "High/low lookback", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("KSmoothing", 3)
                    .range(1.0, 20.0, 1.0)
                    .display("%K smoothing", "SMA applied to raw %K", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("DSmoothing", 3)
                    .range(1.0, 20.0, 1.0)
                    .display("%D smoothing", "SMA applied to %K", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("OversoldLevel", 20.0)
                    .range(0.0, 50.0, 1.0)
                    .optimize()
                    .display("Oversold", "Hooks up from below this level", "Signals"),
            )
            .declare(
                ParamDescriptor::float("OverboughtLevel", 80.0)
                    .range(50.0, 100.0, 1.0)
                    .optimize()
                    .display("Overbought", "Hooks down from above this level", "Signals"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 2.0, 4.0),
            stochastic: None,
            state: Tracked::default(),
        }
    }
}

impl Default for StochasticHook {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for StochasticHook {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Trade %K hooking back out of the oversold or overbought zone"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let stochastic = ctx.bind(
            sub,
            Stochastic::new(
                self.params.get_usize("StochLength")?,
                self.params.get_usize("KSmoothing")?,
                self.params.get_usize("DSmoothing")?,
            ),
        )?;
        self.stochastic = Some(stochastic);
        ctx.chart_area("main").candles(sub).own_trades();
        ctx.chart_area("stochastic").indicator(stochastic);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        _candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(stoch) = self.stochastic.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        let k = stoch.k;
        let previous = self.state.k1.shift(k);
        let before = match previous {
            Some(p) => self.state.k2.shift(p),
            None => None,
        };
        let (Some(before), Some(previous)) = (before, previous) else {
            return Ok(());
        };

        let oversold = self.params.get_float("OversoldLevel")?;
        let overbought = self.params.get_float("OverboughtLevel")?;
        match detect_hook(before, previous, k, oversold, overbought) {
            Some(Hook::Up) => {
                ctx.info(format!("upward hook {before:.1} -> {previous:.1} -> {k:.1}"));
                go_long(ctx)?;
            }
            Some(Hook::Down) => {
                ctx.info(format!("downward hook {before:.1} -> {previous:.1} -> {k:.1}"));
                go_short(ctx)?;
            }
            None => {}
        }
        Ok(())
    }

    fn on_reseted(&mut self) {
        self.state.clear();
    }

    fn create_clone(&self) -> Box<dyn Strategy> {
        let mut clone = Self::new();
        clone.params.copy_values_from(&self.params);
        Box::new(clone)
    }
}
