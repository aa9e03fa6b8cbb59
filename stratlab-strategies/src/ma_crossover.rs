//! Moving average crossover: golden cross goes long, death cross goes short.
//!
//! Entries reverse an opposite position (`volume + |position|`). An optional
//! percent stop-loss / take-profit is attached through the protection module.

use crate::common::{
    candle_type, crossed_above, crossed_below, go_long, go_short, start_protection,
    with_protection, CANDLE_TYPE,
};
use stratlab_core::domain::{Candle, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Ema, Sma};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "ma_crossover";

#[derive(Debug, Default)]
struct Tracked {
    prev_fast: Previous<f64>,
    prev_slow: Previous<f64>,
}

pub struct MaCrossover {
    params: ParamSet,
    fast: Option<Handle<f64>>,
    slow: Option<Handle<f64>>,
    state: Tracked,
}

impl MaCrossover {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("FastLength", 10)
                    .range(1.0, 200.0, 1.0)
                    .optimize()
                    .display("Fast MA", "Period of the fast moving average", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("SlowLength", 50)
                    .range(2.0, 400.0, 1.0)
                    .optimize()
                    .display("Slow MA", "Period of the slow moving average", "Indicators"),
            )
            .declare(
                ParamDescriptor::choice("MaType", &["sma", "ema"], "sma").display(
                    "MA type",
                    "Simple or exponential averages",
                    "Indicators",
                ),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 0.0, 0.0),
            fast: None,
            slow: None,
            state: Tracked::default(),
        }
    }
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Fast/slow moving average crossover with optional percent stop"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let fast_len = self.params.get_usize("FastLength")?;
        let slow_len = self.params.get_usize("SlowLength")?;
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);

        let (fast, slow) = if self.params.get_enum("MaType")? == "ema" {
            (ctx.bind(sub, Ema::new(fast_len))?, ctx.bind(sub, Ema::new(slow_len))?)
        } else {
            (ctx.bind(sub, Sma::new(fast_len))?, ctx.bind(sub, Sma::new(slow_len))?)
        };
        self.fast = Some(fast);
        self.slow = Some(slow);

        ctx.chart_area("main")
            .candles(sub)
            .indicator(fast)
            .indicator(slow)
            .own_trades();
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        _candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let (Some(fast), Some(slow)) = (
            self.fast.and_then(|h| outputs.get(h)),
            self.slow.and_then(|h| outputs.get(h)),
        ) else {
            return Ok(());
        };
        let prev_fast = self.state.prev_fast.shift(fast);
        let prev_slow = self.state.prev_slow.shift(slow);
        let (Some(prev_fast), Some(prev_slow)) = (prev_fast, prev_slow) else {
            return Ok(());
        };

        if crossed_above(prev_fast, prev_slow, fast, slow) {
            ctx.info(format!("golden cross: fast {fast:.4} > slow {slow:.4}"));
            go_long(ctx)?;
        } else if crossed_below(prev_fast, prev_slow, fast, slow) {
            ctx.info(format!("death cross: fast {fast:.4} < slow {slow:.4}"));
            go_short(ctx)?;
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
