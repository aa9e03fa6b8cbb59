//! Hull MA slope extremes, faded.
//!
//! The slope is a short linear regression over the HMA (a chained binding).
//! A slope more than `DeviationMultiplier` deviations above its rolling
//! mean is treated as overextended and sold; far below, bought. The slope
//! returning through its rolling mean closes the position.

use crate::common::{candle_type, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, Side, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Hma, LinearRegSlope, RollingStatistics};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{StartContext, Strategy, TradeContext};

pub const NAME: &str = "hma_slope";

pub struct HmaSlope {
    params: ParamSet,
    slope: Option<Handle<f64>>,
    slopes: Option<RollingStatistics>,
}

impl HmaSlope {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("HmaLength", 20)
                    .range(2.0, 200.0, 1.0)
                    .optimize()
                    .display("HMA length", "Hull moving average period", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("SlopePeriod", 3)
                    .range(2.0, 20.0, 1.0)
                    .display("Slope period", "Regression window over the HMA", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("SlopeLookback", 30)
                    .range(2.0, 200.0, 1.0)
                    .display("Slope lookback", "Slopes in the reference window", "Signals"),
            )
            .declare(
                ParamDescriptor::float("DeviationMultiplier", 2.0)
                    .range(0.5, 5.0, 0.1)
                    .optimize()
                    .display("Deviations", "Standard deviations for an extreme", "Signals"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 2.0, 0.0),
            slope: None,
            slopes: None,
        }
    }
}

impl Default for HmaSlope {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for HmaSlope {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Fade extreme Hull MA slopes, exit when the slope normalises"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let hma = ctx.bind(sub, Hma::new(self.params.get_usize("HmaLength")?))?;
        let slope_period = self.params.get_usize("SlopePeriod")?;
        let slope = ctx.bind_on(hma, LinearRegSlope::new(slope_period))?;
        self.slope = Some(slope);
        self.slopes = Some(RollingStatistics::new(self.params.get_usize("SlopeLookback")?));
        ctx.chart_area("main").candles(sub).indicator(hma).own_trades();
        ctx.chart_area("slope").indicator(slope);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        _candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(slope) = self.slope.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        let multiplier = self.params.get_float("DeviationMultiplier")?;
        let Some(slopes) = self.slopes.as_mut() else {
            return Ok(());
        };
        let reference = match (slopes.is_full(), slopes.mean(), slopes.std_dev()) {
            (true, Some(mean), Some(sd)) if sd > f64::EPSILON => Some((mean, sd)),
            _ => None,
        };
        slopes.push(slope);
        let Some((mean, sd)) = reference else {
            return Ok(());
        };

        match ctx.side() {
            Some(Side::Long) if slope >= mean => {
                ctx.info(format!("slope {slope:.5} back over its mean, exit long"));
                ctx.close_position()?;
                return Ok(());
            }
            Some(Side::Short) if slope <= mean => {
                ctx.info(format!("slope {slope:.5} back under its mean, exit short"));
                ctx.close_position()?;
                return Ok(());
            }
            Some(_) => return Ok(()),
            None => {}
        }

        let deviations = (slope - mean) / sd;
        if deviations < -multiplier {
            ctx.info(format!("slope {deviations:.2} sd below normal, buying"));
            ctx.buy_market(ctx.volume())?;
        } else if deviations > multiplier {
            ctx.info(format!("slope {deviations:.2} sd above normal, selling"));
            ctx.sell_market(ctx.volume())?;
        }
        Ok(())
    }

    fn on_reseted(&mut self) {
        self.slopes = None;
    }

    fn create_clone(&self) -> Box<dyn Strategy> {
        let mut clone = Self::new();
        clone.params.copy_values_from(&self.params);
        Box::new(clone)
    }
}
