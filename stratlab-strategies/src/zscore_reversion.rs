//! Z-score mean reversion.
//!
//! z = (close - SMA) / StdDev. Enter long when z drops below
//! `-ZScoreEntryThreshold`, short when it rises above the threshold. A long
//! is exited with a sell of exactly the held size once z crosses back above
//! `ZScoreExitThreshold` (mirror for shorts).

use crate::common::{candle_type, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Sma, StdDev};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "zscore_reversion";

#[derive(Debug, Default)]
struct Tracked {
    prev_z: Previous<f64>,
}

pub struct ZScoreReversion {
    params: ParamSet,
    sma: Option<Handle<f64>>,
    std_dev: Option<Handle<f64>>,
    state: Tracked,
}

impl ZScoreReversion {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("MAPeriod", 20)
                    .range(2.0, 200.0, 1.0)
                    .optimize()
                    .display("MA period", "Mean of the z-score", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("StdDevPeriod", 20)
                    .range(2.0, 200.0, 1.0)
                    .optimize()
                    .display("StdDev period", "Dispersion of the z-score", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("ZScoreEntryThreshold", 2.0)
                    .range(0.5, 5.0, 0.25)
                    .optimize()
                    .display("Entry z", "Absolute z-score that opens a trade", "Signals"),
            )
            .declare(
                ParamDescriptor::float("ZScoreExitThreshold", 0.0)
                    .range(-2.0, 2.0, 0.25)
                    .display("Exit z", "Z-score crossed on the way back to close", "Signals"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 0.0, 0.0),
            sma: None,
            std_dev: None,
            state: Tracked::default(),
        }
    }
}

impl Default for ZScoreReversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ZScoreReversion {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Fade extreme z-scores of price around its moving average"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let sma = ctx.bind(sub, Sma::new(self.params.get_usize("MAPeriod")?))?;
        let std_dev = ctx.bind(sub, StdDev::new(self.params.get_usize("StdDevPeriod")?))?;
        self.sma = Some(sma);
        self.std_dev = Some(std_dev);
        ctx.chart_area("main").candles(sub).indicator(sma).own_trades();
        ctx.chart_area("dispersion").indicator(std_dev);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let (Some(mean), Some(sd)) = (
            self.sma.and_then(|h| outputs.get(h)),
            self.std_dev.and_then(|h| outputs.get(h)),
        ) else {
            return Ok(());
        };
        // Zero dispersion: no z-score, and the tracked value stays as it was.
        if sd <= f64::EPSILON * mean.abs().max(1.0) {
            return Ok(());
        }
        let z = (candle.close - mean) / sd;
        let Some(prev_z) = self.state.prev_z.shift(z) else {
            return Ok(());
        };

        let entry = self.params.get_float("ZScoreEntryThreshold")?;
        let exit = self.params.get_float("ZScoreExitThreshold")?;
        let position = ctx.position();

        if position > 0.0 && prev_z < exit && z >= exit {
            ctx.info(format!("z {z:.2} back above {exit}: exit long"));
            ctx.sell_market(position)?;
        } else if position < 0.0 && prev_z > -exit && z <= -exit {
            ctx.info(format!("z {z:.2} back below {}: exit short", -exit));
            ctx.buy_market(position.abs())?;
        } else if ctx.net_position().is_flat() {
            if z < -entry {
                ctx.info(format!("z {z:.2} below -{entry}: long"));
                ctx.buy_market(ctx.volume())?;
            } else if z > entry {
                ctx.info(format!("z {z:.2} above {entry}: short"));
                ctx.sell_market(ctx.volume())?;
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
