//! MACD signal-line crossover filtered by ADX direction.
//!
//! A bullish MACD cross goes long when ADX exceeds the threshold and +DI
//! leads -DI; bearish mirror. An opposite MACD cross without the filter
//! closes the open position.

use crate::common::{
    candle_type, crossed_above, crossed_below, go_long, go_short, start_protection,
    with_protection, CANDLE_TYPE,
};
use stratlab_core::domain::{Candle, Side, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Adx, AdxValue, Macd, MacdValue};
use stratlab_core::params::{ParamDescriptor, ParamError, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "adx_macd";

#[derive(Debug, Default)]
struct Tracked {
    prev_macd: Previous<MacdValue>,
}

pub struct AdxMacd {
    params: ParamSet,
    macd: Option<Handle<MacdValue>>,
    adx: Option<Handle<AdxValue>>,
    state: Tracked,
}

impl AdxMacd {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("MacdFast", 12)
                    .range(2.0, 50.0, 1.0)
                    .optimize()
                    .display("MACD fast", "Fast EMA period", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("MacdSlow", 26)
                    .range(3.0, 200.0, 1.0)
                    .optimize()
                    .display("MACD slow", "Slow EMA period", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("MacdSignal", 9)
                    .range(1.0, 50.0, 1.0)
                    .display("MACD signal", "Signal EMA period", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("AdxPeriod", 14)
                    .range(1.0, 100.0, 1.0)
                    .display("ADX period", "Trend strength lookback", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("AdxThreshold", 25.0)
                    .range(0.0, 60.0, 1.0)
                    .optimize()
                    .display("ADX threshold", "Minimum ADX for an entry", "Filters"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 2.0, 4.0),
            macd: None,
            adx: None,
            state: Tracked::default(),
        }
    }
}

impl Default for AdxMacd {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for AdxMacd {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "MACD crossover in the direction ADX says is trending"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let fast = self.params.get_usize("MacdFast")?;
        let slow = self.params.get_usize("MacdSlow")?;
        if slow <= fast {
            return Err(ParamError::OutOfRange {
                name: "MacdSlow".to_string(),
                value: slow as f64,
                min: (fast + 1) as f64,
                max: 200.0,
            }
            .into());
        }
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let macd = ctx.bind(sub, Macd::new(fast, slow, self.params.get_usize("MacdSignal")?))?;
        let adx = ctx.bind(sub, Adx::new(self.params.get_usize("AdxPeriod")?))?;
        self.macd = Some(macd);
        self.adx = Some(adx);
        ctx.chart_area("main").candles(sub).own_trades();
        ctx.chart_area("macd").indicator(macd);
        ctx.chart_area("adx").indicator(adx);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        _candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let (Some(macd), Some(adx)) = (
            self.macd.and_then(|h| outputs.get(h)),
            self.adx.and_then(|h| outputs.get(h)),
        ) else {
            return Ok(());
        };
        let Some(prev) = self.state.prev_macd.shift(macd) else {
            return Ok(());
        };

        let bullish = crossed_above(prev.macd, prev.signal, macd.macd, macd.signal);
        let bearish = crossed_below(prev.macd, prev.signal, macd.macd, macd.signal);
        let trending = adx.adx > self.params.get_float("AdxThreshold")?;

        if bullish {
            if trending && adx.plus_di > adx.minus_di {
                ctx.info(format!("bullish MACD cross, adx {:.1}", adx.adx));
                go_long(ctx)?;
            } else if ctx.side() == Some(Side::Short) {
                ctx.info("bullish MACD cross closes the short");
                ctx.close_position()?;
            }
        } else if bearish {
            if trending && adx.minus_di > adx.plus_di {
                ctx.info(format!("bearish MACD cross, adx {:.1}", adx.adx));
                go_short(ctx)?;
            } else if ctx.side() == Some(Side::Long) {
                ctx.info("bearish MACD cross closes the long");
                ctx.close_position()?;
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
