//! Time-ordered wrapper around an [`Indicator`].
//!
//! `IndicatorCell` owns one indicator and enforces the update contract the
//! pipeline relies on: strictly increasing final times, sticky `formed`, and
//! non-final updates that never touch committed state.

use super::{Indicator, IndicatorInput, IndicatorOutput, IndicatorValue, InputShape};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("{name}: update at {time} is not after last final update at {last}")]
    OutOfOrder {
        name: String,
        time: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    #[error("{name}: invalid parameter: {reason}")]
    InvalidParameter { name: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct IndicatorCell<I: Indicator> {
    indicator: I,
    last_final_time: Option<DateTime<Utc>>,
    formed: bool,
    final_count: usize,
    last_output: Option<I::Output>,
}

impl<I: Indicator> IndicatorCell<I> {
    pub fn new(indicator: I) -> Self {
        Self {
            indicator,
            last_final_time: None,
            formed: false,
            final_count: 0,
            last_output: None,
        }
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn is_formed(&self) -> bool {
        self.formed
    }

    /// Number of final updates absorbed since construction or `reset`.
    pub fn final_count(&self) -> usize {
        self.final_count
    }

    pub fn last_final_time(&self) -> Option<DateTime<Utc>> {
        self.last_final_time
    }

    /// Output of the most recent update, final or preview.
    pub fn last_output(&self) -> Option<I::Output> {
        self.last_output
    }

    /// Apply one input stamped with `time`.
    ///
    /// Final updates commit. Non-final updates preview the next candle on a
    /// clone of the committed state; any number of them for the same `time`
    /// leave the indicator exactly as the last final update left it.
    pub fn update(
        &mut self,
        input: &IndicatorInput,
        time: DateTime<Utc>,
        is_final: bool,
    ) -> Result<Option<I::Output>, IndicatorError> {
        if let Some(last) = self.last_final_time {
            if time <= last {
                return Err(IndicatorError::OutOfOrder {
                    name: self.indicator.name().to_string(),
                    time,
                    last,
                });
            }
        }

        let output = if is_final {
            let out = self.indicator.next(input);
            self.last_final_time = Some(time);
            self.final_count += 1;
            if out.is_some() {
                self.formed = true;
            }
            out
        } else {
            let mut preview = self.indicator.clone();
            preview.next(input)
        };

        self.last_output = output;
        Ok(output)
    }

    pub fn reset(&mut self) {
        self.indicator.reset();
        self.last_final_time = None;
        self.formed = false;
        self.final_count = 0;
        self.last_output = None;
    }
}

/// Object-safe view of an indicator cell, used by the subscription pipeline.
pub trait ErasedIndicator: Send + Sync {
    fn name(&self) -> &str;
    fn input_shape(&self) -> InputShape;
    fn length(&self) -> usize;
    fn warmup_period(&self) -> usize;
    fn is_formed(&self) -> bool;
    fn update(
        &mut self,
        input: &IndicatorInput,
        time: DateTime<Utc>,
        is_final: bool,
    ) -> Result<Option<IndicatorValue>, IndicatorError>;
    fn reset(&mut self);
}

impl<I: Indicator> ErasedIndicator for IndicatorCell<I> {
    fn name(&self) -> &str {
        self.indicator.name()
    }

    fn input_shape(&self) -> InputShape {
        self.indicator.input_shape()
    }

    fn length(&self) -> usize {
        self.indicator.length()
    }

    fn warmup_period(&self) -> usize {
        self.indicator.warmup_period()
    }

    fn is_formed(&self) -> bool {
        self.formed
    }

    fn update(
        &mut self,
        input: &IndicatorInput,
        time: DateTime<Utc>,
        is_final: bool,
    ) -> Result<Option<IndicatorValue>, IndicatorError> {
        Ok(IndicatorCell::update(self, input, time, is_final)?.map(IndicatorOutput::into_value))
    }

    fn reset(&mut self) {
        IndicatorCell::reset(self);
    }
}
