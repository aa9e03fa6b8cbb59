//! Session VWAP side confirmed by On-Balance Volume.
//!
//! The regime is bullish when the close is above VWAP and OBV is above its
//! moving average, bearish when both are below. The strategy acts only when
//! the regime changes; a neutral regime closes the position.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Obv, Sma, Vwap};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "vwap_obv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Bullish,
    Bearish,
    Neutral,
}

pub fn regime(close: f64, vwap: f64, obv: f64, obv_average: f64) -> Regime {
    if close > vwap && obv > obv_average {
        Regime::Bullish
    } else if close < vwap && obv < obv_average {
        Regime::Bearish
    } else {
        Regime::Neutral
    }
}

#[derive(Debug, Default)]
struct Tracked {
    regime: Previous<Regime>,
}

pub struct VwapObv {
    params: ParamSet,
    vwap: Option<Handle<f64>>,
    obv: Option<Handle<f64>>,
    obv_average: Option<Handle<f64>>,
    state: Tracked,
}

impl VwapObv {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("ObvMaLength", 20)
                    .range(1.0, 200.0, 1.0)
                    .optimize()
                    .display("OBV average", "SMA period applied to OBV", "Indicators"),
            )
            .declare(candle_type(Timeframe::M15));
        Self {
            params: with_protection(params, 1.5, 0.0),
            vwap: None,
            obv: None,
            obv_average: None,
            state: Tracked::default(),
        }
    }
}

impl Default for VwapObv {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for VwapObv {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Trade the VWAP side when On-Balance Volume agrees"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let vwap = ctx.bind(sub, Vwap::new())?;
        let obv = ctx.bind(sub, Obv::new())?;
        let obv_average = ctx.bind_on(obv, Sma::new(self.params.get_usize("ObvMaLength")?))?;
        self.vwap = Some(vwap);
        self.obv = Some(obv);
        self.obv_average = Some(obv_average);
        ctx.chart_area("main").candles(sub).indicator(vwap).own_trades();
        ctx.chart_area("obv").indicator(obv).indicator(obv_average);
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let (Some(vwap), Some(obv), Some(obv_average)) = (
            self.vwap.and_then(|h| outputs.get(h)),
            self.obv.and_then(|h| outputs.get(h)),
            self.obv_average.and_then(|h| outputs.get(h)),
        ) else {
            return Ok(());
        };
        let current = regime(candle.close, vwap, obv, obv_average);
        let Some(previous) = self.state.regime.shift(current) else {
            return Ok(());
        };
        if current == previous {
            return Ok(());
        }
        match current {
            Regime::Bullish => {
                ctx.info(format!("above VWAP {vwap:.4} with rising OBV"));
                go_long(ctx)?;
            }
            Regime::Bearish => {
                ctx.info(format!("below VWAP {vwap:.4} with falling OBV"));
                go_short(ctx)?;
            }
            Regime::Neutral => {
                if !ctx.net_position().is_flat() {
                    ctx.info("VWAP and OBV disagree, flat");
                    ctx.close_position()?;
                }
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
