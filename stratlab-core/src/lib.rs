//! StratLab Core: streaming signal engine for candle-driven strategies.
//!
//! - Domain types (candles, timeframes, orders, intents, fills, positions)
//! - Incremental indicators with warm-up tracking and non-final previews
//! - Subscriptions binding typed indicator handles to candle streams
//! - Intent translation against a net position and an order sink
//! - Protective exits (stop-loss, take-profit, trailing stop)
//! - Strategy lifecycle, parameters, run fingerprints and replay

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod indicators;
pub mod params;
pub mod position_management;
pub mod strategy;
pub mod synthetic;
