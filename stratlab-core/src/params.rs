//! Strategy parameter surface.
//!
//! A `ParamSet` is an ordered list of typed, named parameter cells declared
//! when a strategy is constructed. Values are read in `on_started` and may
//! only change while the strategy is not running; the runner locks the set
//! for the duration of a run.
//!
//! Optimization metadata (`can_optimize`, min/max/step) is exposed for the
//! host but the engine never searches over it.

use crate::domain::{ParamSetHash, Timeframe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("unknown parameter: {0}")]
    Unknown(String),

    #[error("parameter {name} expects {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("parameter {name} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("parameter {name}: {value:?} is not one of {allowed:?}")]
    InvalidChoice {
        name: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("parameter {name}: cannot parse {input:?} as {expected}")]
    Parse {
        name: String,
        input: String,
        expected: &'static str,
    },

    #[error("parameters are locked while the strategy is running")]
    Locked,

    #[error("parameter {0} is declared twice")]
    Duplicate(String),
}

/// Runtime type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    Duration,
    Enum { choices: Vec<String> },
    Timeframe,
}

impl ParamKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Bool => "bool",
            ParamKind::Duration => "duration",
            ParamKind::Enum { .. } => "enum",
            ParamKind::Timeframe => "timeframe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
    Enum(String),
    Timeframe(Timeframe),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Bool(_) => "bool",
            ParamValue::Duration(_) => "duration",
            ParamValue::Enum(_) => "enum",
            ParamValue::Timeframe(_) => "timeframe",
        }
    }

    /// Numeric view used for range checks.
    fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Duration(d) => Some(d.as_secs_f64()),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Duration(d) => write!(f, "{}s", d.as_secs()),
            ParamValue::Enum(v) => write!(f, "{v}"),
            ParamValue::Timeframe(tf) => write!(f, "{tf}"),
        }
    }
}

/// Optimization range. Durations are expressed in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamDisplay {
    pub name: String,
    pub description: String,
    pub group: String,
}

/// One declared parameter: name, type, default, current value, metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub default: ParamValue,
    pub value: ParamValue,
    pub range: Option<ParamRange>,
    pub can_optimize: bool,
    pub display: ParamDisplay,
}

impl ParamDescriptor {
    fn new(name: &str, kind: ParamKind, default: ParamValue) -> Self {
        Self {
            name: name.to_string(),
            kind,
            value: default.clone(),
            default,
            range: None,
            can_optimize: false,
            display: ParamDisplay {
                name: name.to_string(),
                ..ParamDisplay::default()
            },
        }
    }

    pub fn int(name: &str, default: i64) -> Self {
        Self::new(name, ParamKind::Int, ParamValue::Int(default))
    }

    pub fn float(name: &str, default: f64) -> Self {
        Self::new(name, ParamKind::Float, ParamValue::Float(default))
    }

    pub fn bool(name: &str, default: bool) -> Self {
        Self::new(name, ParamKind::Bool, ParamValue::Bool(default))
    }

    pub fn duration(name: &str, default: Duration) -> Self {
        Self::new(name, ParamKind::Duration, ParamValue::Duration(default))
    }

    pub fn choice(name: &str, choices: &[&str], default: &str) -> Self {
        Self::new(
            name,
            ParamKind::Enum {
                choices: choices.iter().map(|c| c.to_string()).collect(),
            },
            ParamValue::Enum(default.to_string()),
        )
    }

    pub fn timeframe(name: &str, default: Timeframe) -> Self {
        Self::new(name, ParamKind::Timeframe, ParamValue::Timeframe(default))
    }

    /// Legal range; also the optimization range when `optimize()` is set.
    pub fn range(mut self, min: f64, max: f64, step: f64) -> Self {
        self.range = Some(ParamRange { min, max, step });
        self
    }

    pub fn optimize(mut self) -> Self {
        self.can_optimize = true;
        self
    }

    pub fn display(mut self, name: &str, description: &str, group: &str) -> Self {
        self.display = ParamDisplay {
            name: name.to_string(),
            description: description.to_string(),
            group: group.to_string(),
        };
        self
    }

    fn validate(&self, value: &ParamValue) -> Result<(), ParamError> {
        let type_ok = matches!(
            (&self.kind, value),
            (ParamKind::Int, ParamValue::Int(_))
                | (ParamKind::Float, ParamValue::Float(_))
                | (ParamKind::Bool, ParamValue::Bool(_))
                | (ParamKind::Duration, ParamValue::Duration(_))
                | (ParamKind::Enum { .. }, ParamValue::Enum(_))
                | (ParamKind::Timeframe, ParamValue::Timeframe(_))
        );
        if !type_ok {
            return Err(ParamError::TypeMismatch {
                name: self.name.clone(),
                expected: self.kind.type_name(),
                actual: value.type_name(),
            });
        }

        if let (ParamKind::Enum { choices }, ParamValue::Enum(v)) = (&self.kind, value) {
            if !choices.iter().any(|c| c == v) {
                return Err(ParamError::InvalidChoice {
                    name: self.name.clone(),
                    value: v.clone(),
                    allowed: choices.clone(),
                });
            }
        }

        if let (Some(range), Some(number)) = (self.range, value.as_number()) {
            if !number.is_finite() || number < range.min || number > range.max {
                return Err(ParamError::OutOfRange {
                    name: self.name.clone(),
                    value: number,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }

    /// Parse a textual value according to this parameter's kind.
    pub fn parse(&self, input: &str) -> Result<ParamValue, ParamError> {
        let parse_err = || ParamError::Parse {
            name: self.name.clone(),
            input: input.to_string(),
            expected: self.kind.type_name(),
        };
        let input = input.trim();
        match &self.kind {
            ParamKind::Int => input.parse().map(ParamValue::Int).map_err(|_| parse_err()),
            ParamKind::Float => input.parse().map(ParamValue::Float).map_err(|_| parse_err()),
            ParamKind::Bool => input.parse().map(ParamValue::Bool).map_err(|_| parse_err()),
            ParamKind::Duration => parse_duration(input)
                .map(ParamValue::Duration)
                .ok_or_else(parse_err),
            ParamKind::Enum { .. } => Ok(ParamValue::Enum(input.to_string())),
            ParamKind::Timeframe => input
                .parse()
                .map(ParamValue::Timeframe)
                .map_err(|_| parse_err()),
        }
    }
}

/// "90", "90s", "15m", "4h", "2d" -> Duration.
fn parse_duration(input: &str) -> Option<Duration> {
    let (digits, unit) = match input.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => input.split_at(pos),
        None => (input, "s"),
    };
    let n: u64 = digits.parse().ok()?;
    let secs = match unit {
        "s" => n,
        "m" => n * 60,
        "h" => n * 3600,
        "d" => n * 86_400,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

/// Introspection row for the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: String,
    pub default: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub can_optimize: bool,
    pub display_name: String,
    pub display_group: String,
    pub display_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    params: Vec<ParamDescriptor>,
    #[serde(skip)]
    locked: bool,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter. Panics on a duplicate name: declarations are
    /// static strategy code, not user input.
    pub fn declare(mut self, descriptor: ParamDescriptor) -> Self {
        assert!(
            self.find(&descriptor.name).is_none(),
            "{}",
            ParamError::Duplicate(descriptor.name.clone())
        );
        self.params.push(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.params.iter()
    }

    pub fn descriptor(&self, name: &str) -> Option<&ParamDescriptor> {
        self.find(name)
    }

    fn find(&self, name: &str) -> Option<&ParamDescriptor> {
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn lock(&mut self) {
        self.locked = true;
    }

    pub(crate) fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn get(&self, name: &str) -> Result<&ParamValue, ParamError> {
        self.find(name)
            .map(|p| &p.value)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))
    }

    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParamError> {
        if self.locked {
            return Err(ParamError::Locked);
        }
        let param = self
            .params
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        param.validate(&value)?;
        param.value = value;
        Ok(())
    }

    /// Parse `input` per the parameter's kind, then `set`.
    pub fn set_str(&mut self, name: &str, input: &str) -> Result<(), ParamError> {
        let value = self
            .find(name)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))?
            .parse(input)?;
        self.set(name, value)
    }

    /// Copy every value from `other` for parameters declared in both sets.
    pub fn copy_values_from(&mut self, other: &ParamSet) {
        for param in &mut self.params {
            if let Some(src) = other.find(&param.name) {
                if param.validate(&src.value).is_ok() {
                    param.value = src.value.clone();
                }
            }
        }
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ParamError> {
        if self.locked {
            return Err(ParamError::Locked);
        }
        for param in &mut self.params {
            param.value = param.default.clone();
        }
        Ok(())
    }

    fn mismatch(&self, name: &str, expected: &'static str) -> ParamError {
        match self.get(name) {
            Ok(v) => ParamError::TypeMismatch {
                name: name.to_string(),
                expected,
                actual: v.type_name(),
            },
            Err(e) => e,
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64, ParamError> {
        match self.get(name)? {
            ParamValue::Int(v) => Ok(*v),
            _ => Err(self.mismatch(name, "int")),
        }
    }

    /// An int parameter used as a period or count; must be at least 1.
    pub fn get_usize(&self, name: &str) -> Result<usize, ParamError> {
        let value = self.get_int(name)?;
        if value < 1 {
            let max = self
                .descriptor(name)
                .and_then(|d| d.range)
                .map_or(i64::MAX as f64, |r| r.max);
            return Err(ParamError::OutOfRange {
                name: name.to_string(),
                value: value as f64,
                min: 1.0,
                max,
            });
        }
        Ok(value as usize)
    }

    /// Float parameters; int parameters are widened.
    pub fn get_float(&self, name: &str) -> Result<f64, ParamError> {
        match self.get(name)? {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            _ => Err(self.mismatch(name, "float")),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, ParamError> {
        match self.get(name)? {
            ParamValue::Bool(v) => Ok(*v),
            _ => Err(self.mismatch(name, "bool")),
        }
    }

    pub fn get_duration(&self, name: &str) -> Result<Duration, ParamError> {
        match self.get(name)? {
            ParamValue::Duration(v) => Ok(*v),
            _ => Err(self.mismatch(name, "duration")),
        }
    }

    pub fn get_enum(&self, name: &str) -> Result<&str, ParamError> {
        match self.get(name)? {
            ParamValue::Enum(v) => Ok(v),
            _ => Err(self.mismatch(name, "enum")),
        }
    }

    pub fn get_timeframe(&self, name: &str) -> Result<Timeframe, ParamError> {
        match self.get(name)? {
            ParamValue::Timeframe(v) => Ok(*v),
            _ => Err(self.mismatch(name, "timeframe")),
        }
    }

    /// Current values keyed by name, sorted.
    pub fn values(&self) -> BTreeMap<String, ParamValue> {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    /// BLAKE3 over the canonical JSON of the current values.
    pub fn hash(&self) -> ParamSetHash {
        let canonical = serde_json::to_vec(&self.values()).unwrap_or_default();
        ParamSetHash::from_bytes(&canonical)
    }

    pub fn info(&self) -> Vec<ParamInfo> {
        self.params
            .iter()
            .map(|p| ParamInfo {
                name: p.name.clone(),
                type_name: p.kind.type_name().to_string(),
                value: p.value.to_string(),
                default: p.default.to_string(),
                min: p.range.map(|r| r.min),
                max: p.range.map(|r| r.max),
                step: p.range.map(|r| r.step),
                can_optimize: p.can_optimize,
                display_name: p.display.name.clone(),
                display_group: p.display.group.clone(),
                display_description: p.display.description.clone(),
            })
            .collect()
    }
}
