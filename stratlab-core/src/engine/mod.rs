//! Strategy runtime: lifecycle, candle subscriptions, the intent translator,
//! the order sink seam, the runner and the replay driver.
//!
//! A runner is single-threaded. Run several instruments by giving each its
//! own runner (see `Strategy::create_clone`).

pub mod lifecycle;
pub mod replay;
pub mod runner;
pub mod sink;
pub mod subscription;
pub mod translator;

pub use lifecycle::{LifecycleState, WarmupGate};
pub use replay::{replay, CandleAggregator, ReplayOptions, ReplayReport};
pub use runner::StrategyRunner;
pub use sink::{OrderSink, SimulatedSink, SinkError};
pub use subscription::{Handle, IndicatorOutputs, PipelineReport, Subscription};
pub use translator::{IntentOutcome, IntentRecord, OrderTranslator};
