//! Pin bar rejection in the direction of the trend.
//!
//! A bullish pin bar has a lower shadow at least `ShadowRatio` times its
//! body, a body no larger than `BodyMaxPercent` of the range, and a small
//! upper shadow. Taken long only above the trend SMA; bearish pins short
//! below it. Exits are left to the percent protection legs.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::Sma;
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{StartContext, Strategy, TradeContext};

pub const NAME: &str = "pin_bar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinBarPattern {
    Bullish,
    Bearish,
}

/// Classify a candle as a pin bar.
pub fn classify(
    candle: &Candle,
    shadow_ratio: f64,
    body_max_percent: f64,
) -> Option<PinBarPattern> {
    let range = candle.range();
    if range <= 0.0 {
        return None;
    }
    let body = candle.body();
    if body > range * body_max_percent / 100.0 {
        return None;
    }
    // A doji still needs a nose; measure shadows against a minimum body.
    let reference = body.max(range * 0.05);
    let lower = candle.lower_shadow();
    let upper = candle.upper_shadow();
    if lower >= reference * shadow_ratio && upper < lower / shadow_ratio {
        Some(PinBarPattern::Bullish)
    } else if upper >= reference * shadow_ratio && lower < upper / shadow_ratio {
        Some(PinBarPattern::Bearish)
    } else {
        None
    }
}

pub struct PinBar {
    params: ParamSet,
    trend: Option<Handle<f64>>,
}

impl PinBar {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("TrendLength", 50)
                    .range(1.0, 400.0, 1.0)
                    .optimize()
                    .display("Trend SMA", "Trend filter period", "Filters"),
            )
            .declare(
                ParamDescriptor::float("ShadowRatio", 2.0)
                    .range(1.0, 5.0, 0.1)
                    .optimize()
                    .display("Shadow ratio", "Nose length over body", "Pattern"),
            )
            .declare(
                ParamDescriptor::float("BodyMaxPercent", 33.0)
                    .range(5.0, 50.0, 1.0)
                    .display("Max body %", "Largest body as a share of range", "Pattern"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 1.0, 2.0),
            trend: None,
        }
    }
}

impl Default for PinBar {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for PinBar {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Pin bar rejections with the trend, exits by stop and target"
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
        let ratio = self.params.get_float("ShadowRatio")?;
        let body_max = self.params.get_float("BodyMaxPercent")?;

        match classify(candle, ratio, body_max) {
            Some(PinBarPattern::Bullish) if candle.close > trend => {
                ctx.info(format!("bullish pin bar above trend {trend:.4}"));
                go_long(ctx)?;
            }
            Some(PinBarPattern::Bearish) if candle.close < trend => {
                ctx.info(format!("bearish pin bar below trend {trend:.4}"));
                go_short(ctx)?;
            }
            _ => {}
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
    use chrono::{TimeZone, Utc};

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Candle::finished(t, Timeframe::H1, open, high, low, close, 500.0)
    }

    #[test]
    fn hammer_is_bullish() {
        // body 1, lower shadow 7, upper shadow 0.5
        let c = candle(100.0, 101.5, 93.0, 101.0);
        assert_eq!(classify(&c, 2.0, 33.0), Some(PinBarPattern::Bullish));
    }

    #[test]
    fn shooting_star_is_bearish() {
        let c = candle(100.0, 108.0, 99.0, 99.2);
        assert_eq!(classify(&c, 2.0, 33.0), Some(PinBarPattern::Bearish));
    }

    #[test]
    fn large_body_is_rejected() {
        let c = candle(95.0, 101.0, 90.0, 100.0);
        assert_eq!(classify(&c, 2.0, 33.0), None);
    }

    #[test]
    fn flat_candle_is_not_a_pin() {
        let c = candle(100.0, 100.0, 100.0, 100.0);
        assert_eq!(classify(&c, 2.0, 33.0), None);
    }
}
