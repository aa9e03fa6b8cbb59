//! CCI mean reversion.
//!
//! CCI crossing back up through `OversoldLevel` goes long, crossing back
//! down through `OverboughtLevel` goes short. A position is closed when CCI
//! crosses the zero line against it.

use crate::common::{
    candle_type, crossed_above, crossed_below, go_long, go_short, start_protection,
    with_protection, CANDLE_TYPE,
};
use stratlab_core::domain::{Candle, Side, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::Cci;
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "cci_reversion";

#[derive(Debug, Default)]
struct Tracked {
    prev_cci: Previous<f64>,
}

pub struct CciReversion {
    params: ParamSet,
    cci: Option<Handle<f64>>,
    state: Tracked,
}

impl CciReversion {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("CciPeriod", 20)
                    .range(2.0, 200.0, 1.0)
                    .optimize()
                    .display("CCI period", "Commodity Channel Index lookback", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("OversoldLevel", -100.0)
                    .range(-300.0, 0.0, 10.0)
                    .optimize()
                    .display("Oversold", "Long when CCI recovers above this", "Signals"),
            )
            .declare(
                ParamDescriptor::float("OverboughtLevel", 100.0)
                    .range(0.0, 300.0, 10.0)
                    .optimize()
                    .display("Overbought", "Short when CCI falls back below this", "Signals"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 2.0, 0.0),
            cci: None,
            state: Tracked::default(),
        }
    }
}

impl Default for CciReversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for CciReversion {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "CCI returning from an extreme, closed at the zero line"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let cci = ctx.bind(sub, Cci::new(self.params.get_usize("CciPeriod")?))?;
        self.cci = Some(cci);
        ctx.chart_area("main").candles(sub).own_trades();
        ctx.chart_area("cci").indicator(cci);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        _candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(cci) = self.cci.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        let Some(prev) = self.state.prev_cci.shift(cci) else {
            return Ok(());
        };
        let oversold = self.params.get_float("OversoldLevel")?;
        let overbought = self.params.get_float("OverboughtLevel")?;

        match ctx.side() {
            Some(Side::Long) if crossed_below(prev, 0.0, cci, 0.0) => {
                ctx.info(format!("cci {cci:.1} below zero, exit long"));
                ctx.close_position()?;
                return Ok(());
            }
            Some(Side::Short) if crossed_above(prev, 0.0, cci, 0.0) => {
                ctx.info(format!("cci {cci:.1} above zero, exit short"));
                ctx.close_position()?;
                return Ok(());
            }
            _ => {}
        }

        if crossed_above(prev, oversold, cci, oversold) {
            ctx.info(format!("cci {cci:.1} recovered from oversold"));
            go_long(ctx)?;
        } else if crossed_below(prev, overbought, cci, overbought) {
            ctx.info(format!("cci {cci:.1} dropped from overbought"));
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
