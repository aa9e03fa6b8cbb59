//! Strategy authoring contract.
//!
//! A strategy declares its parameters at construction, creates and binds its
//! indicators in `on_started`, receives one `on_candle` call per finished
//! candle per subscription, and clears its tracked scalars in `on_reseted`.
//!
//! ```ignore
//! fn on_candle(&mut self, _sub, candle, outputs, ctx) -> Result<(), EngineError> {
//!     let (Some(fast), Some(slow)) = (outputs.get(self.fast), outputs.get(self.slow)) else {
//!         return Ok(());
//!     };
//!     ...
//! }
//! ```

pub mod chart;
pub mod context;
pub mod log;
pub mod state;

pub use chart::{ChartArea, ChartElement};
pub use context::{ChartBuilder, StartContext, TradeContext};
pub use log::{LogLevel, LogRecord, StrategyLog};
pub use state::{Previous, StrategyState, TrackedState};

use crate::domain::{Candle, SubscriptionId};
use crate::engine::subscription::IndicatorOutputs;
use crate::error::EngineError;
use crate::params::ParamSet;

pub trait Strategy: Send {
    /// Registry name (snake_case).
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn params(&self) -> &ParamSet;

    fn params_mut(&mut self) -> &mut ParamSet;

    /// Read parameters, subscribe, bind indicators, attach protection.
    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError>;

    /// Decision callback, once per finished candle of `sub`.
    ///
    /// Called during warm-up as well, so tracked scalars can initialize;
    /// intents issued before the instance is trading are rejected.
    fn on_candle(
        &mut self,
        sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError>;

    /// Clear every tracked scalar.
    fn on_reseted(&mut self);

    fn on_stopped(&mut self) {}

    /// Fresh instance with the same declared parameters and current values.
    fn create_clone(&self) -> Box<dyn Strategy>;
}
