//! StratLab Strategies: the strategy catalog and its registry.
//!
//! One strategy per authoring idiom:
//! - moving-average crossover (`ma_crossover`, `hma_slope`)
//! - channel breakout with a filter (`donchian_rsi`, `bollinger_volume`, `keltner_adx`)
//! - oscillator extremes and hooks (`stochastic_hook`, `williams_r`, `cci_reversion`)
//! - regime filter plus momentum trigger (`adx_macd`, `choppiness_momentum`)
//! - candlestick patterns (`pin_bar`, `three_bar_reversal`)
//! - rolling-statistics triggers (`slope_breakout`, `zscore_reversion`)
//! - trend followers (`supertrend_flip`, `parabolic_sar`, `ichimoku_cloud`, `vwap_obv`)
//! - calendar and multi-timeframe gates (`seasonal_bias`, `multi_timeframe_rsi`)

mod common;

pub mod adx_macd;
pub mod bollinger_volume;
pub mod cci_reversion;
pub mod choppiness_momentum;
pub mod donchian_rsi;
pub mod hma_slope;
pub mod ichimoku_cloud;
pub mod keltner_adx;
pub mod ma_crossover;
pub mod multi_timeframe_rsi;
pub mod parabolic_sar;
pub mod pin_bar;
pub mod seasonal_bias;
pub mod slope_breakout;
pub mod stochastic_hook;
pub mod supertrend_flip;
pub mod three_bar_reversal;
pub mod vwap_obv;
pub mod williams_r;
pub mod zscore_reversion;

pub use adx_macd::AdxMacd;
pub use bollinger_volume::BollingerVolume;
pub use cci_reversion::CciReversion;
pub use choppiness_momentum::ChoppinessMomentum;
pub use donchian_rsi::DonchianRsi;
pub use hma_slope::HmaSlope;
pub use ichimoku_cloud::IchimokuCloud;
pub use keltner_adx::KeltnerAdx;
pub use ma_crossover::MaCrossover;
pub use multi_timeframe_rsi::MultiTimeframeRsi;
pub use parabolic_sar::ParabolicSarTrend;
pub use pin_bar::PinBar;
pub use seasonal_bias::SeasonalBias;
pub use slope_breakout::SlopeBreakout;
pub use stochastic_hook::StochasticHook;
pub use supertrend_flip::SupertrendFlip;
pub use three_bar_reversal::ThreeBarReversal;
pub use vwap_obv::VwapObv;
pub use williams_r::WilliamsRReversal;
pub use zscore_reversion::ZScoreReversion;

use serde::Serialize;
use stratlab_core::strategy::Strategy;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown strategy: {0}")]
    Unknown(String),
}

/// Constructor for a strategy with default parameters.
pub type StrategyFactory = fn() -> Box<dyn Strategy>;

/// Listing row for hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
    pub param_count: usize,
}

/// Name-keyed catalog of strategy constructors.
pub struct StrategyRegistry {
    entries: Vec<(&'static str, StrategyFactory)>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Every strategy shipped in this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(ma_crossover::NAME, || Box::new(MaCrossover::new()));
        registry.register(zscore_reversion::NAME, || Box::new(ZScoreReversion::new()));
        registry.register(donchian_rsi::NAME, || Box::new(DonchianRsi::new()));
        registry.register(stochastic_hook::NAME, || Box::new(StochasticHook::new()));
        registry.register(three_bar_reversal::NAME, || Box::new(ThreeBarReversal::new()));
        registry.register(bollinger_volume::NAME, || Box::new(BollingerVolume::new()));
        registry.register(keltner_adx::NAME, || Box::new(KeltnerAdx::new()));
        registry.register(adx_macd::NAME, || Box::new(AdxMacd::new()));
        registry.register(choppiness_momentum::NAME, || {
            Box::new(ChoppinessMomentum::new())
        });
        registry.register(pin_bar::NAME, || Box::new(PinBar::new()));
        registry.register(slope_breakout::NAME, || Box::new(SlopeBreakout::new()));
        registry.register(cci_reversion::NAME, || Box::new(CciReversion::new()));
        registry.register(seasonal_bias::NAME, || Box::new(SeasonalBias::new()));
        registry.register(williams_r::NAME, || Box::new(WilliamsRReversal::new()));
        registry.register(supertrend_flip::NAME, || Box::new(SupertrendFlip::new()));
        registry.register(parabolic_sar::NAME, || Box::new(ParabolicSarTrend::new()));
        registry.register(ichimoku_cloud::NAME, || Box::new(IchimokuCloud::new()));
        registry.register(vwap_obv::NAME, || Box::new(VwapObv::new()));
        registry.register(hma_slope::NAME, || Box::new(HmaSlope::new()));
        registry.register(multi_timeframe_rsi::NAME, || {
            Box::new(MultiTimeframeRsi::new())
        });
        registry
    }

    /// Add or replace a constructor.
    pub fn register(&mut self, name: &'static str, factory: StrategyFactory) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((name, factory)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| *n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fresh instance with default parameters.
    pub fn create(&self, name: &str) -> Result<Box<dyn Strategy>, RegistryError> {
        let (_, factory) = self
            .entries
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))?;
        debug!(strategy = name, "creating strategy");
        Ok(factory())
    }

    pub fn list(&self) -> Vec<StrategyInfo> {
        self.entries
            .iter()
            .map(|(name, factory)| {
                let strategy = factory();
                StrategyInfo {
                    name: name.to_string(),
                    description: strategy.description().to_string(),
                    param_count: strategy.params().len(),
                }
            })
            .collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_every_strategy() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(registry.len(), 20);
        for name in registry.names() {
            let strategy = registry.create(name).unwrap();
            assert_eq!(strategy.name(), name);
            assert!(!strategy.description().is_empty(), "{name}");
            assert!(!strategy.params().is_empty(), "{name}");
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        let registry = StrategyRegistry::builtin();
        assert!(matches!(
            registry.create("nope"),
            Err(RegistryError::Unknown(n)) if n == "nope"
        ));
    }

    #[test]
    fn register_replaces_existing_entry() {
        let mut registry = StrategyRegistry::empty();
        registry.register("x", || Box::new(MaCrossover::new()));
        registry.register("x", || Box::new(PinBar::new()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.create("x").unwrap().name(), pin_bar::NAME);
    }

    #[test]
    fn clones_keep_parameter_values() {
        let registry = StrategyRegistry::builtin();
        for name in registry.names() {
            let mut strategy = registry.create(name).unwrap();
            strategy
                .params_mut()
                .set_str(common::STOP_LOSS, "3.5")
                .ok();
            let clone = strategy.create_clone();
            assert_eq!(clone.name(), name);
            assert_eq!(clone.params().hash(), strategy.params().hash(), "{name}");
        }
    }

    /// Compile-time check: strategies move into worker threads.
    #[allow(dead_code)]
    fn assert_send() {
        fn require_send<T: Send>() {}
        require_send::<MaCrossover>();
        require_send::<MultiTimeframeRsi>();
        require_send::<Box<dyn Strategy>>();
    }
}
