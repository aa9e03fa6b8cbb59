//! RSI entries on the trading timeframe, biased by RSI on a higher one.
//!
//! The higher-timeframe RSI above 50 allows only longs, below 50 only
//! shorts. On the trading timeframe RSI crossing up through
//! `OversoldLevel` enters long and crossing down through `OverboughtLevel`
//! enters short. A long is closed at the overbought level, a short at the
//! oversold level.

use crate::common::{
    candle_type, crossed_above, crossed_below, go_long, go_short, start_protection,
    with_protection, CANDLE_TYPE,
};
use stratlab_core::domain::{Candle, Side, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::Rsi;
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "multi_timeframe_rsi";

const HIGHER_CANDLE_TYPE: &str = "HigherCandleType";

#[derive(Debug, Default)]
struct Tracked {
    prev_rsi: Previous<f64>,
    higher_rsi: Previous<f64>,
}

pub struct MultiTimeframeRsi {
    params: ParamSet,
    lower: Option<(SubscriptionId, Handle<f64>)>,
    higher: Option<(SubscriptionId, Handle<f64>)>,
    state: Tracked,
}

impl MultiTimeframeRsi {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("RsiPeriod", 14)
                    .range(2.0, 100.0, 1.0)
                    .optimize()
                    .display("RSI period", "RSI lookback on both timeframes", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("OversoldLevel", 30.0)
                    .range(5.0, 50.0, 1.0)
                    .display("Oversold", "Long entries cross up through this", "Signals"),
            )
            .declare(
                ParamDescriptor::float("OverboughtLevel", 70.0)
                    .range(50.0, 95.0, 1.0)
                    .display("Overbought", "Short entries cross down through this", "Signals"),
            )
            .declare(candle_type(Timeframe::H1))
            .declare(ParamDescriptor::timeframe(HIGHER_CANDLE_TYPE, Timeframe::H4).display(
                "Higher candle type",
                "Timeframe that sets the directional bias",
                "General",
            ));
        Self {
            params: with_protection(params, 2.0, 0.0),
            lower: None,
            higher: None,
            state: Tracked::default(),
        }
    }

    fn update_bias(&mut self, sub: SubscriptionId, outputs: &IndicatorOutputs) {
        if let Some((higher_sub, handle)) = self.higher {
            if higher_sub == sub {
                if let Some(rsi) = outputs.get(handle) {
                    self.state.higher_rsi.set(rsi);
                }
            }
        }
    }
}

impl Default for MultiTimeframeRsi {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MultiTimeframeRsi {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "RSI reversals in the direction of the higher-timeframe RSI"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let period = self.params.get_usize("RsiPeriod")?;
        let lower_sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let higher_sub = ctx.subscribe(self.params.get_timeframe(HIGHER_CANDLE_TYPE)?);
        let lower_rsi = ctx.bind(lower_sub, Rsi::new(period))?;
        let higher_rsi = ctx.bind(higher_sub, Rsi::new(period))?;
        self.lower = Some((lower_sub, lower_rsi));
        self.higher = Some((higher_sub, higher_rsi));
        ctx.chart_area("main").candles(lower_sub).own_trades();
        ctx.chart_area("rsi").indicator(lower_rsi);
        ctx.chart_area("higher").candles(higher_sub).indicator(higher_rsi);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        sub: SubscriptionId,
        _candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        self.update_bias(sub, outputs);

        let Some((lower_sub, handle)) = self.lower else {
            return Ok(());
        };
        if sub != lower_sub {
            return Ok(());
        }
        let Some(rsi) = outputs.get(handle) else {
            return Ok(());
        };
        let Some(prev) = self.state.prev_rsi.shift(rsi) else {
            return Ok(());
        };
        let oversold = self.params.get_float("OversoldLevel")?;
        let overbought = self.params.get_float("OverboughtLevel")?;

        match ctx.side() {
            Some(Side::Long) if rsi >= overbought => {
                ctx.info(format!("rsi {rsi:.1} overbought, exit long"));
                ctx.close_position()?;
                return Ok(());
            }
            Some(Side::Short) if rsi <= oversold => {
                ctx.info(format!("rsi {rsi:.1} oversold, exit short"));
                ctx.close_position()?;
                return Ok(());
            }
            _ => {}
        }

        let Some(bias) = self.state.higher_rsi.get() else {
            return Ok(());
        };
        if bias > 50.0 && crossed_above(prev, oversold, rsi, oversold) {
            ctx.info(format!("rsi {rsi:.1} up from oversold, higher rsi {bias:.1}"));
            go_long(ctx)?;
        } else if bias < 50.0 && crossed_below(prev, overbought, rsi, overbought) {
            ctx.info(format!("rsi {rsi:.1} down from overbought, higher rsi {bias:.1}"));
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
