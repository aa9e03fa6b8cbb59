//! Donchian breakout filtered by RSI.
//!
//! A close above the previous candle's upper channel goes long unless RSI is
//! already overbought; a close below the previous lower channel goes short
//! unless RSI is oversold. The channel includes the current candle, so the
//! breakout is measured against the channel as it stood one candle earlier.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{BandsValue, Donchian, Rsi};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "donchian_rsi";

#[derive(Debug, Default)]
struct Tracked {
    prev_channel: Previous<BandsValue>,
}

pub struct DonchianRsi {
    params: ParamSet,
    channel: Option<Handle<BandsValue>>,
    rsi: Option<Handle<f64>>,
    state: Tracked,
}

impl DonchianRsi {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("DonchianPeriod", 20)
                    .range(2.0, 200.0, 1.0)
                    .optimize()
                    .display("Donchian period", "Channel lookback", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("RsiPeriod", 14)
                    .range(2.0, 100.0, 1.0)
                    .optimize()
                    .display("RSI period", "RSI lookback", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("RsiOverboughtLevel", 70.0)
                    .range(50.0, 100.0, 1.0)
                    .display("RSI overbought", "No long breakouts above this RSI", "Filters"),
            )
            .declare(
                ParamDescriptor::float("RsiOversoldLevel", 30.0)
                    .range(0.0, 50.0, 1.0)
                    .display("RSI oversold", "No short breakouts below this RSI", "Filters"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 2.0, 0.0),
            channel: None,
            rsi: None,
            state: Tracked::default(),
        }
    }
}

impl Default for DonchianRsi {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for DonchianRsi {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Donchian channel breakout, skipped when RSI is already stretched"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let channel = ctx.bind(sub, Donchian::new(self.params.get_usize("DonchianPeriod")?))?;
        let rsi = ctx.bind(sub, Rsi::new(self.params.get_usize("RsiPeriod")?))?;
        self.channel = Some(channel);
        self.rsi = Some(rsi);
        ctx.chart_area("main").candles(sub).indicator(channel).own_trades();
        ctx.chart_area("rsi").indicator(rsi);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let (Some(channel), Some(rsi)) = (
            self.channel.and_then(|h| outputs.get(h)),
            self.rsi.and_then(|h| outputs.get(h)),
        ) else {
            return Ok(());
        };
        let Some(prev) = self.state.prev_channel.shift(channel) else {
            return Ok(());
        };

        let overbought = self.params.get_float("RsiOverboughtLevel")?;
        let oversold = self.params.get_float("RsiOversoldLevel")?;

        if candle.close > prev.upper {
            if rsi < overbought {
                ctx.info(format!("breakout above {:.4}, rsi {rsi:.1}", prev.upper));
                go_long(ctx)?;
            } else {
                ctx.info(format!("breakout above {:.4} ignored, rsi {rsi:.1}", prev.upper));
            }
        } else if candle.close < prev.lower {
            if rsi > oversold {
                ctx.info(format!("breakdown below {:.4}, rsi {rsi:.1}", prev.lower));
                go_short(ctx)?;
            } else {
                ctx.info(format!("breakdown below {:.4} ignored, rsi {rsi:.1}", prev.lower));
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
