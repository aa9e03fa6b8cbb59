//! Ichimoku cloud with a Tenkan/Kijun cross trigger.
//!
//! Long: Tenkan crosses above Kijun while the close is above the cloud.
//! Short: Tenkan crosses below Kijun while the close is below the cloud.
//! A close back inside the cloud against the position closes it.

use crate::common::{
    candle_type, crossed_above, crossed_below, go_long, go_short, start_protection,
    with_protection, CANDLE_TYPE,
};
use stratlab_core::domain::{Candle, Side, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Ichimoku, IchimokuValue};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "ichimoku_cloud";

#[derive(Debug, Default)]
struct Tracked {
    prev: Previous<IchimokuValue>,
}

pub struct IchimokuCloud {
    params: ParamSet,
    ichimoku: Option<Handle<IchimokuValue>>,
    state: Tracked,
}

impl IchimokuCloud {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("TenkanPeriod", 9)
                    .range(1.0, 50.0, 1.0)
                    .optimize()
                    .display("Tenkan", "Conversion line period", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("KijunPeriod", 26)
                    .range(1.0, 100.0, 1.0)
                    .optimize()
                    .display("Kijun", "Base line period", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("SenkouSpanPeriod", 52)
                    .range(1.0, 200.0, 1.0)
                    .display("Senkou B", "Leading span B period", "Indicators"),
            )
            .declare(candle_type(Timeframe::H4));
        Self {
            params: with_protection(params, 3.0, 0.0),
            ichimoku: None,
            state: Tracked::default(),
        }
    }
}

impl Default for IchimokuCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for IchimokuCloud {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Tenkan/Kijun cross on the far side of the Ichimoku cloud"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let ichimoku = ctx.bind(
            sub,
            Ichimoku::new(
                self.params.get_usize("TenkanPeriod")?,
                self.params.get_usize("KijunPeriod")?,
                self.params.get_usize("SenkouSpanPeriod")?,
            ),
        )?;
        self.ichimoku = Some(ichimoku);
        ctx.chart_area("main").candles(sub).indicator(ichimoku).own_trades();
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(ich) = self.ichimoku.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        let Some(prev) = self.state.prev.shift(ich) else {
            return Ok(());
        };
        let above_cloud = candle.close > ich.cloud_top();
        let below_cloud = candle.close < ich.cloud_bottom();

        match ctx.side() {
            Some(Side::Long) if !above_cloud => {
                ctx.info("close fell into the cloud, exit long");
                ctx.close_position()?;
                return Ok(());
            }
            Some(Side::Short) if !below_cloud => {
                ctx.info("close rose into the cloud, exit short");
                ctx.close_position()?;
                return Ok(());
            }
            _ => {}
        }

        if above_cloud && crossed_above(prev.tenkan, prev.kijun, ich.tenkan, ich.kijun) {
            ctx.info(format!("tenkan over kijun above cloud {:.4}", ich.cloud_top()));
            go_long(ctx)?;
        } else if below_cloud && crossed_below(prev.tenkan, prev.kijun, ich.tenkan, ich.kijun) {
            ctx.info(format!("tenkan under kijun below cloud {:.4}", ich.cloud_bottom()));
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
