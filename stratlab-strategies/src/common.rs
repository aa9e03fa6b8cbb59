//! Building blocks shared by the catalog strategies.

use stratlab_core::domain::Timeframe;
use stratlab_core::engine::IntentOutcome;
use stratlab_core::error::EngineError;
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::position_management::ProtectionUnit;
use stratlab_core::strategy::{StartContext, TradeContext};

pub(crate) const CANDLE_TYPE: &str = "CandleType";
pub(crate) const STOP_LOSS: &str = "StopLossPercent";
pub(crate) const TAKE_PROFIT: &str = "TakeProfitPercent";

/// Candle timeframe the strategy subscribes to.
pub(crate) fn candle_type(default: Timeframe) -> ParamDescriptor {
    ParamDescriptor::timeframe(CANDLE_TYPE, default).display(
        "Candle type",
        "Timeframe of the candles the strategy trades on",
        "General",
    )
}

/// Declare percent stop-loss / take-profit legs (0 disables a leg).
pub(crate) fn with_protection(params: ParamSet, stop_loss: f64, take_profit: f64) -> ParamSet {
    params
        .declare(
            ParamDescriptor::float(STOP_LOSS, stop_loss)
                .range(0.0, 50.0, 0.5)
                .optimize()
                .display("Stop loss %", "Stop-loss distance from entry", "Protection"),
        )
        .declare(
            ParamDescriptor::float(TAKE_PROFIT, take_profit)
                .range(0.0, 100.0, 0.5)
                .display("Take profit %", "Take-profit distance from entry", "Protection"),
        )
}

/// Attach the declared protection legs, if any is enabled.
pub(crate) fn start_protection(
    ctx: &mut StartContext<'_>,
    params: &ParamSet,
    is_trailing: bool,
) -> Result<(), EngineError> {
    let stop_loss = ProtectionUnit::Percent(params.get_float(STOP_LOSS)?);
    let take_profit = ProtectionUnit::Percent(params.get_float(TAKE_PROFIT)?);
    if stop_loss.is_enabled() || take_profit.is_enabled() {
        ctx.start_protection(take_profit, stop_loss, is_trailing);
    }
    Ok(())
}

/// Go long by the base volume, reversing any short. No-op when already long.
pub(crate) fn go_long(ctx: &mut TradeContext<'_>) -> Result<Option<IntentOutcome>, EngineError> {
    let position = ctx.position();
    if position > 0.0 {
        return Ok(None);
    }
    ctx.buy_market(ctx.volume() + position.abs()).map(Some)
}

/// Go short by the base volume, reversing any long. No-op when already short.
pub(crate) fn go_short(ctx: &mut TradeContext<'_>) -> Result<Option<IntentOutcome>, EngineError> {
    let position = ctx.position();
    if position < 0.0 {
        return Ok(None);
    }
    ctx.sell_market(ctx.volume() + position.abs()).map(Some)
}

/// `a` crossed from at-or-below `b` to above it.
pub(crate) fn crossed_above(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a <= prev_b && a > b
}

/// `a` crossed from at-or-above `b` to below it.
pub(crate) fn crossed_below(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a >= prev_b && a < b
}
