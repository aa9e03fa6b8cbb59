//! Keltner channel breakout gated by trend strength.
//!
//! Breakouts through the channel are taken only while ADX is above
//! `AdxThreshold`. Positions close when price crosses the channel middle.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, Side, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Adx, AdxValue, BandsValue, Keltner};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{StartContext, Strategy, TradeContext};

pub const NAME: &str = "keltner_adx";

pub struct KeltnerAdx {
    params: ParamSet,
    channel: Option<Handle<BandsValue>>,
    adx: Option<Handle<AdxValue>>,
}

impl KeltnerAdx {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("KeltnerPeriod", 20)
                    .range(1.0, 200.0, 1.0)
                    .optimize()
                    .display("Keltner period", "EMA and ATR period", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("KeltnerMultiplier", 2.0)
                    .range(0.5, 5.0, 0.1)
                    .optimize()
                    .display("Keltner multiplier", "ATR multiples per band", "Indicators"),
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
                    .display("ADX threshold", "Minimum ADX to take a breakout", "Filters"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 2.0, 0.0),
            channel: None,
            adx: None,
        }
    }
}

impl Default for KeltnerAdx {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for KeltnerAdx {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Keltner channel breakout while ADX confirms a trend"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let channel = ctx.bind(
            sub,
            Keltner::new(
                self.params.get_usize("KeltnerPeriod")?,
                self.params.get_float("KeltnerMultiplier")?,
            ),
        )?;
        let adx = ctx.bind(sub, Adx::new(self.params.get_usize("AdxPeriod")?))?;
        self.channel = Some(channel);
        self.adx = Some(adx);
        ctx.chart_area("main").candles(sub).indicator(channel).own_trades();
        ctx.chart_area("adx").indicator(adx);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let (Some(channel), Some(adx)) = (
            self.channel.and_then(|h| outputs.get(h)),
            self.adx.and_then(|h| outputs.get(h)),
        ) else {
            return Ok(());
        };

        match ctx.side() {
            Some(Side::Long) if candle.close < channel.middle => {
                ctx.info("long exit at the channel middle");
                ctx.close_position()?;
                return Ok(());
            }
            Some(Side::Short) if candle.close > channel.middle => {
                ctx.info("short exit at the channel middle");
                ctx.close_position()?;
                return Ok(());
            }
            _ => {}
        }

        if adx.adx <= self.params.get_float("AdxThreshold")? {
            return Ok(());
        }
        if candle.close > channel.upper {
            ctx.info(format!("upper channel break, adx {:.1}", adx.adx));
            go_long(ctx)?;
        } else if candle.close < channel.lower {
            ctx.info(format!("lower channel break, adx {:.1}", adx.adx));
            go_short(ctx)?;
        }
        Ok(())
    }

    fn on_reseted(&mut self) {}

    fn create_clone(&self) -> Box<dyn Strategy> {
        let mut clone = Self::new();
        clone.params.copy_values_from(&self.params);
        Box::new(clone)
    }
}
