//! Subscription pipeline: candle stream -> bound indicators -> outputs.
//!
//! A subscription owns the indicators bound to one candle stream. Bindings
//! are evaluated in bind order. A binding may consume the primary value of
//! an earlier binding (`bind_on`), so bind order is always a valid
//! topological order and no sorting is needed per candle.

use crate::domain::{Candle, StreamKey, SubscriptionId};
use crate::error::EngineError;
use crate::indicators::{
    ErasedIndicator, Indicator, IndicatorCell, IndicatorInput, IndicatorOutput, IndicatorValue,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::marker::PhantomData;

/// Typed reference to a bound indicator's output.
pub struct Handle<O> {
    sub: SubscriptionId,
    index: usize,
    _output: PhantomData<fn() -> O>,
}

impl<O> Handle<O> {
    fn new(sub: SubscriptionId, index: usize) -> Self {
        Self {
            sub,
            index,
            _output: PhantomData,
        }
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.sub
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<O> Clone for Handle<O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for Handle<O> {}

impl<O> PartialEq for Handle<O> {
    fn eq(&self, other: &Self) -> bool {
        self.sub == other.sub && self.index == other.index
    }
}

impl<O> fmt::Debug for Handle<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}#{})", self.sub, self.index)
    }
}

/// Outputs of every binding of one subscription for the current candle.
/// `None` means not formed (or degenerate) for this candle.
#[derive(Debug, Clone, Default)]
pub struct IndicatorOutputs {
    sub: Option<SubscriptionId>,
    names: Vec<String>,
    values: Vec<Option<IndicatorValue>>,
}

impl IndicatorOutputs {
    pub fn get<O: IndicatorOutput>(&self, handle: Handle<O>) -> Option<O> {
        if self.sub != Some(handle.sub) {
            return None;
        }
        self.values
            .get(handle.index)
            .copied()
            .flatten()
            .and_then(|v| O::from_value(&v))
    }

    /// Value by indicator name (first match).
    pub fn by_name(&self, name: &str) -> Option<IndicatorValue> {
        let index = self.names.iter().position(|n| n == name)?;
        self.values.get(index).copied().flatten()
    }

    pub fn all_formed(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<IndicatorValue>)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

enum Source {
    Candle,
    Binding(usize),
}

struct Binding {
    cell: Box<dyn ErasedIndicator>,
    source: Source,
}

/// Result of pushing one candle through a subscription.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Bindings whose output was non-finite and was dropped for this candle.
    pub degenerate: Vec<String>,
}

pub struct Subscription {
    id: SubscriptionId,
    key: StreamKey,
    bindings: Vec<Binding>,
    outputs: IndicatorOutputs,
    last_final_time: Option<DateTime<Utc>>,
    finished_count: usize,
}

impl Subscription {
    pub fn new(id: SubscriptionId, key: StreamKey) -> Self {
        Self {
            id,
            key,
            bindings: Vec::new(),
            outputs: IndicatorOutputs {
                sub: Some(id),
                ..IndicatorOutputs::default()
            },
            last_final_time: None,
            finished_count: 0,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    pub fn finished_count(&self) -> usize {
        self.finished_count
    }

    /// Bind an indicator fed directly from the candle stream.
    pub fn bind<I: Indicator>(&mut self, indicator: I) -> Handle<I::Output> {
        self.push_binding(Box::new(IndicatorCell::new(indicator)), Source::Candle)
    }

    /// Bind an indicator fed with the primary value of an earlier binding.
    pub fn bind_on<O, I: Indicator>(
        &mut self,
        source: Handle<O>,
        indicator: I,
    ) -> Result<Handle<I::Output>, EngineError> {
        if source.sub != self.id || source.index >= self.bindings.len() {
            return Err(EngineError::UnknownBinding {
                sub: self.id,
                index: source.index,
            });
        }
        Ok(self.push_binding(
            Box::new(IndicatorCell::new(indicator)),
            Source::Binding(source.index),
        ))
    }

    fn push_binding<O>(&mut self, cell: Box<dyn ErasedIndicator>, source: Source) -> Handle<O> {
        let index = self.bindings.len();
        self.outputs.names.push(cell.name().to_string());
        self.outputs.values.push(None);
        self.bindings.push(Binding { cell, source });
        Handle::new(self.id, index)
    }

    pub fn indicator_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn indicator_name(&self, index: usize) -> Option<&str> {
        self.bindings.get(index).map(|b| b.cell.name())
    }

    /// Largest warm-up period among the bound indicators.
    pub fn max_warmup(&self) -> usize {
        self.bindings
            .iter()
            .map(|b| b.cell.warmup_period())
            .max()
            .unwrap_or(0)
    }

    pub fn is_formed(&self) -> bool {
        self.bindings.iter().all(|b| b.cell.is_formed())
    }

    pub fn outputs(&self) -> &IndicatorOutputs {
        &self.outputs
    }

    /// Feed one candle through every binding in order.
    ///
    /// Active candles preview the next candle; finished candles commit. A
    /// candle at or before the last finished candle is refused and leaves the
    /// subscription untouched.
    pub fn process(&mut self, candle: &Candle) -> Result<PipelineReport, EngineError> {
        if let Some(last) = self.last_final_time {
            if candle.open_time <= last {
                return Err(EngineError::CandleOutOfOrder {
                    key: self.key.clone(),
                    time: candle.open_time,
                    last,
                });
            }
        }

        let is_final = candle.is_finished();
        let mut report = PipelineReport::default();

        for i in 0..self.bindings.len() {
            let input = match self.bindings[i].source {
                Source::Candle => Some(IndicatorInput::Candle(*candle)),
                Source::Binding(j) => {
                    self.outputs.values[j].map(|v| IndicatorInput::Scalar(v.primary()))
                }
            };
            let value = match input {
                Some(input) => self.bindings[i]
                    .cell
                    .update(&input, candle.open_time, is_final)?,
                None => None,
            };
            let value = match value {
                Some(v) if !v.is_finite() => {
                    report
                        .degenerate
                        .push(self.bindings[i].cell.name().to_string());
                    None
                }
                other => other,
            };
            self.outputs.values[i] = value;
        }

        if is_final {
            self.last_final_time = Some(candle.open_time);
            self.finished_count += 1;
        }
        Ok(report)
    }

    pub fn reset(&mut self) {
        for binding in &mut self.bindings {
            binding.cell.reset();
        }
        for v in &mut self.outputs.values {
            *v = None;
        }
        self.last_final_time = None;
        self.finished_count = 0;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("indicators", &self.outputs.names)
            .field("last_final_time", &self.last_final_time)
            .finish()
    }
}
