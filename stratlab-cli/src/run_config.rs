//! Run configuration (TOML) and candle sources.
//!
//! ```toml
//! strategy = "ma_crossover"
//! timeframe = "1h"
//! instruments = ["BTCUSD", "ETHUSD"]
//!
//! [params]
//! FastLength = 10
//! StopLossPercent = 1.5
//!
//! [source.synthetic]
//! seed = 7
//! bars = 2000
//!
//! [engine]
//! volume = 2.0
//! ```
//!
//! A CSV source is `[source.csv] path = "data/{instrument}.csv"`; the
//! `{instrument}` placeholder is replaced per instrument.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use stratlab_core::config::EngineConfig;
use stratlab_core::domain::{Candle, Timeframe};
use stratlab_core::synthetic::{generate, SyntheticSpec};

/// 2024-01-01T00:00:00Z, first open time of synthetic streams.
const SYNTHETIC_EPOCH: i64 = 1_704_067_200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleSource {
    Csv { path: PathBuf },
    Synthetic(SyntheticSpec),
}

impl Default for CandleSource {
    fn default() -> Self {
        CandleSource::Synthetic(SyntheticSpec::default())
    }
}

impl CandleSource {
    /// Finished candles for one instrument.
    pub fn load(&self, instrument: &str, timeframe: Timeframe) -> Result<Vec<Candle>> {
        match self {
            CandleSource::Csv { path } => {
                let path = instrument_path(path, instrument);
                read_csv(&path, timeframe)
            }
            CandleSource::Synthetic(spec) => {
                let start = DateTime::from_timestamp(SYNTHETIC_EPOCH, 0).unwrap_or_default();
                Ok(generate(spec, instrument, timeframe, start))
            }
        }
    }
}

fn instrument_path(path: &Path, instrument: &str) -> PathBuf {
    PathBuf::from(path.to_string_lossy().replace("{instrument}", instrument))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub strategy: String,

    /// Timeframe of the source candles.
    #[serde(default = "default_timeframe")]
    pub timeframe: Timeframe,

    /// Empty means the engine's configured instrument only.
    #[serde(default)]
    pub instruments: Vec<String>,

    /// Parameter overrides by name.
    #[serde(default)]
    pub params: BTreeMap<String, toml::Value>,

    #[serde(default)]
    pub source: CandleSource,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_timeframe() -> Timeframe {
    Timeframe::H1
}

impl RunConfig {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            timeframe: default_timeframe(),
            instruments: Vec::new(),
            params: BTreeMap::new(),
            source: CandleSource::default(),
            engine: EngineConfig::default(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading run config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Instruments to replay, in order.
    pub fn instruments(&self) -> Vec<String> {
        if self.instruments.is_empty() {
            vec![self.engine.instrument.clone()]
        } else {
            self.instruments.clone()
        }
    }

    /// Overrides as `(name, text)` pairs for the parameter surface.
    pub fn param_overrides(&self) -> Result<Vec<(String, String)>> {
        self.params
            .iter()
            .map(|(name, value)| Ok((name.clone(), toml_value_text(name, value)?)))
            .collect()
    }
}

fn toml_value_text(name: &str, value: &toml::Value) -> Result<String> {
    Ok(match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        other => bail!("parameter {name}: unsupported value {other}"),
    })
}

/// Parse a `Name=Value` command-line override.
pub fn parse_override(arg: &str) -> Result<(String, String)> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => bail!("expected Name=Value, got '{arg}'"),
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    open_time: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub fn read_csv(path: &Path, timeframe: Timeframe) -> Result<Vec<Candle>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening candle file {}", path.display()))?;
    read_candles(file, timeframe).with_context(|| format!("reading {}", path.display()))
}

/// Candles from CSV with an `open_time,open,high,low,close,volume` header.
///
/// Every row becomes a finished candle. Rows must be strictly ordered by
/// open time and have consistent OHLC.
pub fn read_candles<R: io::Read>(reader: R, timeframe: Timeframe) -> Result<Vec<Candle>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles: Vec<Candle> = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let line = i + 2;
        let row = row.with_context(|| format!("line {line}"))?;
        let candle = Candle::finished(
            row.open_time,
            timeframe,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
        );
        if !candle.is_sane() {
            bail!("line {line}: inconsistent OHLCV");
        }
        if let Some(prev) = candles.last() {
            if candle.open_time <= prev.open_time {
                bail!(
                    "line {line}: open_time {} is not after {}",
                    candle.open_time,
                    prev.open_time
                );
            }
        }
        candles.push(candle);
    }
    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "\
open_time,open,high,low,close,volume
2024-03-01T00:00:00Z,100,101,99,100.5,1200
2024-03-01T01:00:00Z,100.5,102,100,101.5,900
2024-03-01T02:00:00Z,101.5,101.8,100.2,100.4,1500
";

    #[test]
    fn csv_rows_become_finished_candles() {
        let candles = read_candles(CSV.as_bytes(), Timeframe::H1).unwrap();
        assert_eq!(candles.len(), 3);
        assert!(candles.iter().all(|c| c.is_finished()));
        assert_eq!(candles[1].close, 101.5);
        assert_eq!(candles[2].timeframe, Timeframe::H1);
    }

    #[test]
    fn csv_rejects_out_of_order_rows() {
        let data = "\
open_time,open,high,low,close,volume
2024-03-01T01:00:00Z,100,101,99,100.5,1200
2024-03-01T01:00:00Z,100.5,102,100,101.5,900
";
        let err = read_candles(data.as_bytes(), Timeframe::H1).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn csv_rejects_inconsistent_ohlc() {
        let data = "\
open_time,open,high,low,close,volume
2024-03-01T00:00:00Z,100,99,98,100.5,1200
";
        assert!(read_candles(data.as_bytes(), Timeframe::H1).is_err());
    }

    #[test]
    fn csv_source_substitutes_instrument() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("ABC.csv")).unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let source = CandleSource::Csv {
            path: dir.path().join("{instrument}.csv"),
        };
        assert_eq!(source.load("ABC", Timeframe::H1).unwrap().len(), 3);
        assert!(source.load("XYZ", Timeframe::H1).is_err());
    }

    #[test]
    fn run_config_from_toml() {
        let config = RunConfig::from_toml(
            r#"
strategy = "ma_crossover"
timeframe = "4h"
instruments = ["A", "B"]

[params]
FastLength = 5
StopLossPercent = 1.5
CandleType = "4h"

[source.synthetic]
seed = 9
bars = 300

[engine]
volume = 2.0
"#,
        )
        .unwrap();

        assert_eq!(config.timeframe, Timeframe::H4);
        assert_eq!(config.instruments(), vec!["A", "B"]);
        assert_eq!(config.engine.volume, 2.0);
        match &config.source {
            CandleSource::Synthetic(spec) => {
                assert_eq!(spec.seed, 9);
                assert_eq!(spec.bars, 300);
                assert_eq!(spec.start_price, 100.0);
            }
            other => panic!("unexpected source {other:?}"),
        }
        let overrides = config.param_overrides().unwrap();
        assert!(overrides.contains(&("FastLength".to_string(), "5".to_string())));
        assert!(overrides.contains(&("StopLossPercent".to_string(), "1.5".to_string())));
        assert!(overrides.contains(&("CandleType".to_string(), "4h".to_string())));
    }

    #[test]
    fn minimal_run_config_uses_defaults() {
        let config = RunConfig::from_toml(r#"strategy = "pin_bar""#).unwrap();
        assert_eq!(config.timeframe, Timeframe::H1);
        assert_eq!(config.instruments(), vec![config.engine.instrument.clone()]);
        assert_eq!(config.source, CandleSource::default());
    }

    #[test]
    fn run_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, "strategy = \"williams_r\"\n[source.csv]\npath = \"x.csv\"\n").unwrap();
        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.strategy, "williams_r");
        assert_eq!(
            config.source,
            CandleSource::Csv {
                path: PathBuf::from("x.csv")
            }
        );
    }

    #[test]
    fn overrides_parse_name_value() {
        assert_eq!(
            parse_override("FastLength = 12").unwrap(),
            ("FastLength".to_string(), "12".to_string())
        );
        assert!(parse_override("FastLength").is_err());
        assert!(parse_override("=3").is_err());
    }
}
