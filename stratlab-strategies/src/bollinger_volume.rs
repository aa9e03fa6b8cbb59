//! Bollinger band breakout confirmed by volume.
//!
//! A close outside the bands counts only when the candle's volume exceeds
//! `VolumeMultiplier` times the average volume of the preceding
//! `VolumePeriod` candles. Positions are closed when price crosses back over
//! the middle band.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, Side, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{BandsValue, Bollinger, RollingStatistics};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "bollinger_volume";

#[derive(Debug, Default)]
struct Tracked {
    prev_close: Previous<f64>,
    prev_middle: Previous<f64>,
}

pub struct BollingerVolume {
    params: ParamSet,
    bands: Option<Handle<BandsValue>>,
    volume: Option<RollingStatistics>,
    state: Tracked,
}

impl BollingerVolume {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("BollingerPeriod", 20)
                    .range(2.0, 200.0, 1.0)
                    .optimize()
                    .display("Bollinger period", "Band lookback", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("BollingerWidth", 2.0)
                    .range(0.5, 5.0, 0.1)
                    .optimize()
                    .display("Bollinger width", "Standard deviations per band", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("VolumePeriod", 20)
                    .range(1.0, 200.0, 1.0)
                    .display("Volume period", "Candles in the average volume", "Filters"),
            )
            .declare(
                ParamDescriptor::float("VolumeMultiplier", 1.5)
                    .range(1.0, 5.0, 0.1)
                    .optimize()
                    .display("Volume multiplier", "Required volume over the average", "Filters"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 2.0, 0.0),
            bands: None,
            volume: None,
            state: Tracked::default(),
        }
    }

    /// Volume confirmation against the window before `volume` is added.
    fn is_volume_spike(&mut self, volume: f64) -> Result<bool, EngineError> {
        let multiplier = self.params.get_float("VolumeMultiplier")?;
        let Some(stats) = self.volume.as_mut() else {
            return Ok(false);
        };
        let spike = match stats.mean() {
            Some(mean) if stats.is_full() => volume > mean * multiplier,
            _ => false,
        };
        stats.push(volume);
        Ok(spike)
    }
}

impl Default for BollingerVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for BollingerVolume {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Bollinger breakout that needs above-average volume"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let bands = ctx.bind(
            sub,
            Bollinger::new(
                self.params.get_usize("BollingerPeriod")?,
                self.params.get_float("BollingerWidth")?,
            ),
        )?;
        self.bands = Some(bands);
        self.volume = Some(RollingStatistics::new(self.params.get_usize("VolumePeriod")?));
        ctx.chart_area("main").candles(sub).indicator(bands).own_trades();
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let spike = self.is_volume_spike(candle.volume)?;
        let Some(bands) = self.bands.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        let prev_close = self.state.prev_close.shift(candle.close);
        let prev_middle = self.state.prev_middle.shift(bands.middle);

        // Exit on the way back through the middle band.
        if let (Some(pc), Some(pm)) = (prev_close, prev_middle) {
            match ctx.side() {
                Some(Side::Long) if pc >= pm && candle.close < bands.middle => {
                    ctx.info(format!("close {:.4} back under the middle band", candle.close));
                    ctx.close_position()?;
                    return Ok(());
                }
                Some(Side::Short) if pc <= pm && candle.close > bands.middle => {
                    ctx.info(format!("close {:.4} back over the middle band", candle.close));
                    ctx.close_position()?;
                    return Ok(());
                }
                _ => {}
            }
        }

        if !spike {
            return Ok(());
        }
        if candle.close > bands.upper {
            ctx.info(format!("upper band break on volume {:.0}", candle.volume));
            go_long(ctx)?;
        } else if candle.close < bands.lower {
            ctx.info(format!("lower band break on volume {:.0}", candle.volume));
            go_short(ctx)?;
        }
        Ok(())
    }

    fn on_reseted(&mut self) {
        self.state.clear();
        self.volume = None;
    }

    fn create_clone(&self) -> Box<dyn Strategy> {
        let mut clone = Self::new();
        clone.params.copy_values_from(&self.params);
        Box::new(clone)
    }
}
