//! Engine error type and its classification.

use crate::config::ConfigError;
use crate::domain::{StreamKey, SubscriptionId};
use crate::engine::lifecycle::LifecycleState;
use crate::engine::sink::SinkError;
use crate::indicators::IndicatorError;
use crate::params::ParamError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How the engine routes a failure.
///
/// - `ContractViolation`: programming error; logged, the instance stops and
///   the error goes back to the host.
/// - `NumericDegeneracy`: the candle is skipped for the affected values;
///   reported to the strategy log.
/// - `OrderRejection`: the venue refused an order; reported to the strategy
///   log, position re-read on the next heartbeat.
/// - `ProtectionDeferred`: a protection exit became due while the decision
///   callback was running; applied after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ContractViolation,
    NumericDegeneracy,
    OrderRejection,
    ProtectionDeferred,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ContractViolation => "contract violation",
            ErrorKind::NumericDegeneracy => "numeric degeneracy",
            ErrorKind::OrderRejection => "order rejection",
            ErrorKind::ProtectionDeferred => "protection deferred",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{operation} is not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("candle for {key} at {time} is not after the last finished candle at {last}")]
    CandleOutOfOrder {
        key: StreamKey,
        time: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    #[error("unknown subscription {0}")]
    UnknownSubscription(SubscriptionId),

    #[error("binding refers to indicator #{index} which is not bound yet on {sub}")]
    UnknownBinding { sub: SubscriptionId, index: usize },

    #[error("intent volume must be positive and finite, got {volume}")]
    InvalidVolume { volume: f64 },

    #[error("trade for {got} delivered to a strategy trading {expected}")]
    ForeignTrade { expected: String, got: String },

    #[error("indicator {name} produced a non-finite value")]
    NonFiniteOutput { name: String },

    #[error("order {order} rejected: {reason}")]
    OrderRejected { order: String, reason: String },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NonFiniteOutput { .. } => ErrorKind::NumericDegeneracy,
            EngineError::Sink(_) | EngineError::OrderRejected { .. } => ErrorKind::OrderRejection,
            EngineError::Indicator(_)
            | EngineError::Param(_)
            | EngineError::Config(_)
            | EngineError::InvalidState { .. }
            | EngineError::CandleOutOfOrder { .. }
            | EngineError::UnknownSubscription(_)
            | EngineError::UnknownBinding { .. }
            | EngineError::InvalidVolume { .. }
            | EngineError::ForeignTrade { .. } => ErrorKind::ContractViolation,
        }
    }

    /// True when the instance must stop.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::ContractViolation
    }
}

/// A non-fatal event surfaced to the host alongside the strategy log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub time: Option<DateTime<Utc>>,
    pub kind: ErrorKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(
            EngineError::InvalidVolume { volume: -1.0 }.kind(),
            ErrorKind::ContractViolation
        );
        assert_eq!(
            EngineError::NonFiniteOutput { name: "sma_3".into() }.kind(),
            ErrorKind::NumericDegeneracy
        );
        assert_eq!(
            EngineError::Sink(SinkError::Rejected {
                order: "ord-1".into(),
                reason: "margin".into()
            })
            .kind(),
            ErrorKind::OrderRejection
        );
        assert!(EngineError::Param(ParamError::Locked).is_fatal());
    }
}
