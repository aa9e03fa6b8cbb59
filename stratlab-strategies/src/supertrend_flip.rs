//! Supertrend direction flips, always in the market once the first flip
//! has happened.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Supertrend, SupertrendValue};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "supertrend_flip";

#[derive(Debug, Default)]
struct Tracked {
    was_up: Previous<bool>,
}

pub struct SupertrendFlip {
    params: ParamSet,
    supertrend: Option<Handle<SupertrendValue>>,
    state: Tracked,
}

impl SupertrendFlip {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("SupertrendPeriod", 10)
                    .range(1.0, 100.0, 1.0)
                    .optimize()
                    .display("ATR period", "Supertrend ATR period", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("SupertrendMultiplier", 3.0)
                    .range(0.5, 10.0, 0.5)
                    .optimize()
                    .display("Multiplier", "ATR multiples for the bands", "Indicators"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 0.0, 0.0),
            supertrend: None,
            state: Tracked::default(),
        }
    }
}

impl Default for SupertrendFlip {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for SupertrendFlip {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Stop-and-reverse on every Supertrend direction change"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let supertrend = ctx.bind(
            sub,
            Supertrend::new(
                self.params.get_usize("SupertrendPeriod")?,
                self.params.get_float("SupertrendMultiplier")?,
            ),
        )?;
        self.supertrend = Some(supertrend);
        ctx.chart_area("main").candles(sub).indicator(supertrend).own_trades();
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        _candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(st) = self.supertrend.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        let Some(was_up) = self.state.was_up.shift(st.is_up_trend) else {
            return Ok(());
        };
        if st.is_up_trend == was_up {
            return Ok(());
        }
        if st.is_up_trend {
            ctx.info(format!("supertrend flipped up at {:.4}", st.value));
            go_long(ctx)?;
        } else {
            ctx.info(format!("supertrend flipped down at {:.4}", st.value));
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
