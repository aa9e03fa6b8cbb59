//! Replay driver: push a recorded candle series through a runner.
//!
//! The series is delivered at its own timeframe. Subscriptions at a higher
//! timeframe that is a whole multiple of it are fed from a
//! [`CandleAggregator`], which emits the higher candle as finished once the
//! base candle closing its interval arrives.

use super::lifecycle::LifecycleState;
use super::runner::StrategyRunner;
use super::translator::IntentRecord;
use crate::domain::{Candle, CandleState, NetPosition, OwnTrade, Timeframe};
use crate::error::{EngineError, Incident};
use crate::fingerprint::RunFingerprint;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// 1970-01-05 was a Monday; weekly buckets start there.
const WEEK_ANCHOR_SECS: i64 = 4 * 86_400;

/// Builds higher-timeframe candles from finished lower-timeframe ones.
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    timeframe: Timeframe,
    current: Option<Candle>,
}

impl CandleAggregator {
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            current: None,
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Open time of the bucket containing `time`.
    pub fn bucket_start(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let size = self.timeframe.seconds();
        let anchor = if self.timeframe == Timeframe::W1 {
            WEEK_ANCHOR_SECS
        } else {
            0
        };
        let secs = (time.timestamp() - anchor).div_euclid(size) * size + anchor;
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(time)
    }

    /// Absorb one finished candle; returns the buckets it completed.
    ///
    /// A bucket is also completed when the next candle belongs to a later
    /// bucket (a gap in the series).
    pub fn push(&mut self, candle: &Candle) -> Vec<Candle> {
        let mut done = Vec::new();
        if !candle.is_finished() {
            return done;
        }
        let start = self.bucket_start(candle.open_time);

        if let Some(current) = self.current {
            if current.open_time != start {
                done.push(finish(current));
                self.current = None;
            }
        }

        match self.current.as_mut() {
            Some(bucket) => {
                bucket.high = bucket.high.max(candle.high);
                bucket.low = bucket.low.min(candle.low);
                bucket.close = candle.close;
                bucket.volume += candle.volume;
            }
            None => {
                self.current = Some(Candle {
                    open_time: start,
                    timeframe: self.timeframe,
                    state: CandleState::Active,
                    ..*candle
                });
            }
        }

        if candle.close_time() >= start + self.timeframe.duration() {
            if let Some(bucket) = self.current.take() {
                done.push(finish(bucket));
            }
        }
        done
    }

    /// The bucket in progress, as an active candle.
    pub fn partial(&self) -> Option<Candle> {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

fn finish(mut candle: Candle) -> Candle {
    candle.state = CandleState::Finished;
    candle
}

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Also deliver the in-progress higher-timeframe candle after every base
    /// candle (exercises non-final indicator updates).
    pub emit_partials: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub strategy: String,
    pub instrument: String,
    pub candles: usize,
    pub final_state: LifecycleState,
    pub final_position: NetPosition,
    pub intents: Vec<IntentRecord>,
    pub trades: Vec<OwnTrade>,
    pub incidents: Vec<Incident>,
    pub fingerprint: RunFingerprint,
}

/// Start the runner, feed every candle, stop it, and collect the outcome.
pub fn replay(
    runner: &mut StrategyRunner,
    candles: &[Candle],
    options: &ReplayOptions,
) -> Result<ReplayReport, EngineError> {
    let instrument = runner.config().instrument.clone();
    let start = candles
        .first()
        .map(|c| c.open_time)
        .unwrap_or_default();
    runner.start(start)?;

    let mut aggregators: Vec<CandleAggregator> = Vec::new();
    if let Some(base) = candles.first().map(|c| c.timeframe) {
        for sub in runner.subscriptions() {
            let tf = sub.key().timeframe;
            if tf == base || aggregators.iter().any(|a| a.timeframe() == tf) {
                continue;
            }
            if tf.seconds() > base.seconds() && tf.seconds() % base.seconds() == 0 {
                aggregators.push(CandleAggregator::new(tf));
            } else {
                warn!(stream = %sub.key(), base = %base, "cannot derive stream from replayed candles");
            }
        }
    }

    for candle in candles {
        runner.on_candle(&instrument, candle.timeframe, *candle)?;
        for agg in &mut aggregators {
            for done in agg.push(candle) {
                runner.on_candle(&instrument, agg.timeframe(), done)?;
            }
            if options.emit_partials {
                if let Some(partial) = agg.partial() {
                    runner.on_candle(&instrument, agg.timeframe(), partial)?;
                }
            }
        }
    }

    if runner.lifecycle().is_running() {
        let end = candles.last().map(|c| c.close_time()).unwrap_or(start);
        runner.stop(end)?;
    }

    Ok(ReplayReport {
        strategy: runner.strategy().name().to_string(),
        instrument,
        candles: candles.len(),
        final_state: runner.lifecycle(),
        final_position: runner.position(),
        intents: runner.intent_journal().to_vec(),
        trades: runner.trades().to_vec(),
        incidents: runner.incidents().to_vec(),
        fingerprint: runner.fingerprint(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_candles;
    use chrono::TimeZone;

    #[test]
    fn four_hourly_candles_make_one_h4() {
        // make_ohlc_candles starts at 2024-01-02 00:00, hourly.
        let base = make_ohlc_candles(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.5, 8.0, 9.0),
            (9.0, 10.0, 8.5, 9.5),
            (9.5, 11.0, 9.0, 10.0),
        ]);
        let mut agg = CandleAggregator::new(Timeframe::H4);
        let mut out = Vec::new();
        for c in &base[..3] {
            out.extend(agg.push(c));
        }
        assert!(out.is_empty());
        let partial = agg.partial().unwrap();
        assert!(!partial.is_finished());
        assert_eq!(partial.close, 9.0);

        out.extend(agg.push(&base[3]));
        assert_eq!(out.len(), 1);
        let h4 = out[0];
        assert!(h4.is_finished());
        assert_eq!(h4.timeframe, Timeframe::H4);
        assert_eq!(h4.open_time, base[0].open_time);
        assert_eq!((h4.open, h4.high, h4.low, h4.close), (10.0, 15.0, 8.0, 9.5));
        assert_eq!(h4.volume, 4_000.0);

        assert!(agg.push(&base[4]).is_empty());
        assert_eq!(agg.partial().unwrap().open_time, base[4].open_time);
    }

    #[test]
    fn gap_completes_the_open_bucket() {
        let base = make_ohlc_candles(&[(1.0, 2.0, 0.5, 1.5); 6]);
        let mut agg = CandleAggregator::new(Timeframe::H4);
        agg.push(&base[0]);
        // Skip to 05:00, which is in the next 4h bucket.
        let done = agg.push(&base[5]);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].open_time, base[0].open_time);
        assert_eq!(done[0].volume, 1_000.0);
    }

    #[test]
    fn weekly_buckets_start_on_monday() {
        let agg = CandleAggregator::new(Timeframe::W1);
        // Thursday 2024-01-04
        let t = Utc.with_ymd_and_hms(2024, 1, 4, 15, 0, 0).unwrap();
        assert_eq!(
            agg.bucket_start(t),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        let daily = CandleAggregator::new(Timeframe::D1);
        assert_eq!(
            daily.bucket_start(t),
            Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap()
        );
    }
}
