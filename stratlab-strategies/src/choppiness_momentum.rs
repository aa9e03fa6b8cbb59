//! Momentum zero-line crosses taken only in trending (low-chop) markets.
//!
//! Momentum crossing above zero goes long and crossing below goes short,
//! both only while the Choppiness Index is under `ChopThreshold`. Any
//! position is closed once choppiness rises above `ChopExitLevel`.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Choppiness, Momentum};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "choppiness_momentum";

#[derive(Debug, Default)]
struct Tracked {
    prev_momentum: Previous<f64>,
}

pub struct ChoppinessMomentum {
    params: ParamSet,
    chop: Option<Handle<f64>>,
    momentum: Option<Handle<f64>>,
    state: Tracked,
}

impl ChoppinessMomentum {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("ChopPeriod", 14)
                    .range(2.0, 100.0, 1.0)
                    .optimize()
                    .display("Choppiness period", "Choppiness Index lookback", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("ChopThreshold", 38.2)
                    .range(10.0, 60.0, 0.1)
                    .optimize()
                    .display("Trend threshold", "Entries need choppiness below this", "Filters"),
            )
            .declare(
                ParamDescriptor::float("ChopExitLevel", 61.8)
                    .range(40.0, 100.0, 0.1)
                    .display("Exit level", "Close positions above this choppiness", "Filters"),
            )
            .declare(
                ParamDescriptor::int("MomentumPeriod", 10)
                    .range(1.0, 100.0, 1.0)
                    .optimize()
                    .display("Momentum period", "Momentum lookback", "Indicators"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 2.0, 0.0),
            chop: None,
            momentum: None,
            state: Tracked::default(),
        }
    }
}

impl Default for ChoppinessMomentum {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ChoppinessMomentum {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Momentum zero crosses while the Choppiness Index shows a trend"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let chop = ctx.bind(sub, Choppiness::new(self.params.get_usize("ChopPeriod")?))?;
        let momentum = ctx.bind(sub, Momentum::new(self.params.get_usize("MomentumPeriod")?))?;
        self.chop = Some(chop);
        self.momentum = Some(momentum);
        ctx.chart_area("main").candles(sub).own_trades();
        ctx.chart_area("choppiness").indicator(chop);
        ctx.chart_area("momentum").indicator(momentum);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        _candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let (Some(chop), Some(momentum)) = (
            self.chop.and_then(|h| outputs.get(h)),
            self.momentum.and_then(|h| outputs.get(h)),
        ) else {
            return Ok(());
        };
        let Some(prev) = self.state.prev_momentum.shift(momentum) else {
            return Ok(());
        };

        if !ctx.net_position().is_flat() && chop > self.params.get_float("ChopExitLevel")? {
            ctx.info(format!("choppiness {chop:.1}: market went sideways"));
            ctx.close_position()?;
            return Ok(());
        }
        if chop >= self.params.get_float("ChopThreshold")? {
            return Ok(());
        }
        if prev <= 0.0 && momentum > 0.0 {
            ctx.info(format!("momentum turned positive, chop {chop:.1}"));
            go_long(ctx)?;
        } else if prev >= 0.0 && momentum < 0.0 {
            ctx.info(format!("momentum turned negative, chop {chop:.1}"));
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
