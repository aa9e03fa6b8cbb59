//! Calendar-month seasonality.
//!
//! Each month carries a historical average return (percent). When the
//! current month's bias exceeds `BiasThreshold` the strategy holds a long
//! (above the trend SMA) or a short (below it). When the bias falls back
//! under the threshold the position is closed.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use chrono::Datelike;
use stratlab_core::domain::{Candle, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::Sma;
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{StartContext, Strategy, TradeContext};

pub const NAME: &str = "seasonal_bias";

/// Average monthly return in percent, January first.
pub const MONTHLY_BIAS: [f64; 12] = [
    1.0, -0.2, 1.1, 1.5, 0.2, -0.1, 1.2, -0.3, -1.0, 0.8, 1.6, 1.4,
];

/// Bias for a 1-based calendar month.
pub fn bias_for_month(month: u32) -> f64 {
    MONTHLY_BIAS
        .get((month as usize).wrapping_sub(1))
        .copied()
        .unwrap_or(0.0)
}

pub struct SeasonalBias {
    params: ParamSet,
    trend: Option<Handle<f64>>,
}

impl SeasonalBias {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::float("BiasThreshold", 0.5)
                    .range(0.0, 2.0, 0.1)
                    .optimize()
                    .display("Bias threshold", "Minimum monthly bias to hold", "Signals"),
            )
            .declare(
                ParamDescriptor::int("TrendLength", 50)
                    .range(1.0, 400.0, 1.0)
                    .display("Trend SMA", "Trend filter period", "Filters"),
            )
            .declare(candle_type(Timeframe::D1));
        Self {
            params: with_protection(params, 3.0, 0.0),
            trend: None,
        }
    }
}

impl Default for SeasonalBias {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for SeasonalBias {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Hold the side favoured by the calendar month, filtered by trend"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let trend = ctx.bind(sub, Sma::new(self.params.get_usize("TrendLength")?))?;
        self.trend = Some(trend);
        ctx.chart_area("main").candles(sub).indicator(trend).own_trades();
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(trend) = self.trend.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        let month = candle.open_time.month();
        let bias = bias_for_month(month);
        let threshold = self.params.get_float("BiasThreshold")?;

        if bias.abs() < threshold {
            if !ctx.net_position().is_flat() {
                ctx.info(format!("month {month} bias {bias:+.1}% too weak, flat"));
                ctx.close_position()?;
            }
            return Ok(());
        }
        if bias > 0.0 && candle.close > trend {
            if go_long(ctx)?.is_some() {
                ctx.info(format!("month {month} bias {bias:+.1}%, long"));
            }
        } else if bias < 0.0 && candle.close < trend && go_short(ctx)?.is_some() {
            ctx.info(format!("month {month} bias {bias:+.1}%, short"));
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn months_map_into_the_table() {
        assert_eq!(bias_for_month(1), 1.0);
        assert_eq!(bias_for_month(9), -1.0);
        assert_eq!(bias_for_month(12), 1.4);
        assert_eq!(bias_for_month(0), 0.0);
        assert_eq!(bias_for_month(13), 0.0);
    }
}
