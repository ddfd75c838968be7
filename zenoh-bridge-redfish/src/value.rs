//! Conversion of scalars read from Redfish documents into typed samples.

use redfish_common::{Sample, SampleKind};
use serde_json::Value;
use thiserror::Error;

/// Scalar read from a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    String(String),
    Integer(i64),
    /// Integers above `i64::MAX`.
    Unsigned(u64),
    Real(f64),
    Boolean(bool),
}

impl RawValue {
    /// Map a JSON scalar. Null, objects and arrays are not scalars.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RawValue::String(s.clone())),
            Value::Bool(b) => Some(RawValue::Boolean(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(RawValue::Integer(i))
                } else if let Some(u) = n.as_u64() {
                    Some(RawValue::Unsigned(u))
                } else {
                    n.as_f64().map(RawValue::Real)
                }
            }
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, RawValue::Boolean(_))
    }
}

/// Failure to turn a [`RawValue`] into a [`Sample`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("malformed numeric value '{0}'")]
    Malformed(String),

    #[error("value {value} is out of range for a {kind} sample")]
    OutOfRange { value: String, kind: SampleKind },

    /// Booleans have no numeric meaning; callers are expected to filter them.
    #[error("boolean values cannot be converted to samples")]
    NotNumeric,
}

/// Convert a raw scalar into a sample of the requested kind.
///
/// Strings are parsed as decimal numbers. A fractional value converted to an
/// integer kind is truncated toward zero. Counter and absolute samples reject
/// negative values.
pub fn convert(raw: &RawValue, kind: SampleKind) -> Result<Sample, ConversionError> {
    match raw {
        RawValue::String(s) => convert_str(s, kind),
        RawValue::Integer(i) => convert_integer(*i, kind),
        RawValue::Unsigned(u) => convert_unsigned(*u, kind),
        RawValue::Real(r) => convert_real(*r, kind),
        RawValue::Boolean(_) => Err(ConversionError::NotNumeric),
    }
}

fn convert_str(s: &str, kind: SampleKind) -> Result<Sample, ConversionError> {
    let text = s.trim();

    // Exact integer forms are taken as-is so large counters do not round
    // through f64.
    match kind {
        SampleKind::Gauge => {}
        SampleKind::Derive => {
            if let Ok(v) = text.parse::<i64>() {
                return Ok(Sample::Derive(v));
            }
        }
        SampleKind::Counter | SampleKind::Absolute => {
            if let Ok(v) = text.parse::<u64>() {
                return Ok(unsigned(v, kind));
            }
        }
    }

    let value: f64 = text
        .parse()
        .map_err(|_| ConversionError::Malformed(s.to_string()))?;
    if !value.is_finite() {
        return Err(ConversionError::Malformed(s.to_string()));
    }

    convert_real(value, kind)
}

fn convert_integer(value: i64, kind: SampleKind) -> Result<Sample, ConversionError> {
    match kind {
        SampleKind::Gauge => Ok(Sample::Gauge(value as f64)),
        SampleKind::Derive => Ok(Sample::Derive(value)),
        SampleKind::Counter | SampleKind::Absolute => u64::try_from(value)
            .map(|v| unsigned(v, kind))
            .map_err(|_| out_of_range(value, kind)),
    }
}

fn convert_unsigned(value: u64, kind: SampleKind) -> Result<Sample, ConversionError> {
    match kind {
        SampleKind::Gauge => Ok(Sample::Gauge(value as f64)),
        SampleKind::Derive => i64::try_from(value)
            .map(Sample::Derive)
            .map_err(|_| out_of_range(value, kind)),
        SampleKind::Counter | SampleKind::Absolute => Ok(unsigned(value, kind)),
    }
}

fn convert_real(value: f64, kind: SampleKind) -> Result<Sample, ConversionError> {
    if !value.is_finite() {
        return Err(ConversionError::Malformed(value.to_string()));
    }

    let truncated = value.trunc();
    match kind {
        SampleKind::Gauge => Ok(Sample::Gauge(value)),
        SampleKind::Derive => {
            // i64::MAX as f64 rounds up to 2^63, which is already out of range.
            if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                return Err(out_of_range(value, kind));
            }
            Ok(Sample::Derive(truncated as i64))
        }
        SampleKind::Counter | SampleKind::Absolute => {
            if truncated < 0.0 || truncated >= u64::MAX as f64 {
                return Err(out_of_range(value, kind));
            }
            Ok(unsigned(truncated as u64, kind))
        }
    }
}

fn unsigned(value: u64, kind: SampleKind) -> Sample {
    if kind == SampleKind::Absolute {
        Sample::Absolute(value)
    } else {
        Sample::Counter(value)
    }
}

fn out_of_range(value: impl ToString, kind: SampleKind) -> ConversionError {
    ConversionError::OutOfRange {
        value: value.to_string(),
        kind,
    }
}
