//! Williams %R reversal.
//!
//! %R crossing up through `OversoldLevel` goes long; crossing down through
//! `OverboughtLevel` goes short. The opposite extreme closes the position.

use crate::common::{
    candle_type, crossed_above, crossed_below, go_long, go_short, start_protection,
    with_protection, CANDLE_TYPE,
};
use stratlab_core::domain::{Candle, Side, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::WilliamsR;
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "williams_r";

#[derive(Debug, Default)]
struct Tracked {
    prev_r: Previous<f64>,
}

pub struct WilliamsRReversal {
    params: ParamSet,
    williams: Option<Handle<f64>>,
    state: Tracked,
}

impl WilliamsRReversal {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("WilliamsRPeriod", 14)
                    .range(1.0, 100.0, 1.0)
                    .optimize()
                    .display("%R period", "High/low lookback", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("OversoldLevel", -80.0)
                    .range(-100.0, -50.0, 1.0)
                    .display("Oversold", "Long when %R rises through this", "Signals"),
            )
            .declare(
                ParamDescriptor::float("OverboughtLevel", -20.0)
                    .range(-50.0, 0.0, 1.0)
                    .display("Overbought", "Short when %R falls through this", "Signals"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 2.0, 0.0),
            williams: None,
            state: Tracked::default(),
        }
    }
}

impl Default for WilliamsRReversal {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for WilliamsRReversal {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Williams %R leaving an extreme zone"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let williams = ctx.bind(sub, WilliamsR::new(self.params.get_usize("WilliamsRPeriod")?))?;
        self.williams = Some(williams);
        ctx.chart_area("main").candles(sub).own_trades();
        ctx.chart_area("williams_r").indicator(williams);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        _candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(r) = self.williams.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        let Some(prev) = self.state.prev_r.shift(r) else {
            return Ok(());
        };
        let oversold = self.params.get_float("OversoldLevel")?;
        let overbought = self.params.get_float("OverboughtLevel")?;

        if crossed_above(prev, oversold, r, oversold) {
            ctx.info(format!("%R {r:.1} left oversold"));
            go_long(ctx)?;
        } else if crossed_below(prev, overbought, r, overbought) {
            ctx.info(format!("%R {r:.1} left overbought"));
            go_short(ctx)?;
        } else {
            match ctx.side() {
                Some(Side::Long) if r > overbought => {
                    ctx.info(format!("%R {r:.1} overbought, exit long"));
                    ctx.close_position()?;
                }
                Some(Side::Short) if r < oversold => {
                    ctx.info(format!("%R {r:.1} oversold, exit short"));
                    ctx.close_position()?;
                }
                _ => {}
            }
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
