//! Normalization of backend timestamps into integer milliseconds.
//!
//! Speech backends disagree on how they encode offsets: protobuf-JSON
//! duration strings (`"2.5s"`), `{seconds, nanos}` objects whose fields may
//! themselves be strings, or bare millisecond numbers. Everything that reads
//! a backend timestamp goes through [`to_millis`].

use serde::{Deserialize, Serialize};

/// A number that may arrive as a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(&self) -> f64 {
        match self {
            Numeric::Number(n) => *n,
            Numeric::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

/// Any of the duration encodings returned by speech backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DurationLike {
    /// Already milliseconds
    Millis(f64),
    /// `"1.250s"` or a plain float string
    Text(String),
    /// Protobuf `Duration` object
    Parts {
        #[serde(default)]
        seconds: Option<Numeric>,
        #[serde(default)]
        nanos: Option<Numeric>,
    },
}

impl DurationLike {
    pub fn seconds_nanos(seconds: i64, nanos: i64) -> Self {
        DurationLike::Parts {
            seconds: Some(Numeric::Number(seconds as f64)),
            nanos: Some(Numeric::Number(nanos as f64)),
        }
    }

    pub fn to_millis(&self) -> i64 {
        let raw = match self {
            DurationLike::Millis(ms) => *ms,
            DurationLike::Text(s) => {
                let s = s.trim();
                match s.strip_suffix('s') {
                    Some(secs) => secs.trim().parse::<f64>().unwrap_or(f64::NAN) * 1000.0,
                    None => s.parse::<f64>().unwrap_or(f64::NAN),
                }
            }
            DurationLike::Parts { seconds, nanos } => {
                let secs = seconds.as_ref().map(Numeric::value).unwrap_or(0.0);
                let nanos = nanos.as_ref().map(Numeric::value).unwrap_or(0.0);
                secs * 1000.0 + nanos / 1_000_000.0
            }
        };
        finite_millis(raw)
    }
}

impl From<f64> for DurationLike {
    fn from(ms: f64) -> Self {
        DurationLike::Millis(ms)
    }
}

impl From<&str> for DurationLike {
    fn from(s: &str) -> Self {
        DurationLike::Text(s.to_string())
    }
}

/// Convert an optional backend duration to milliseconds. Absent or
/// malformed values are `0`.
pub fn to_millis(value: Option<&DurationLike>) -> i64 {
    value.map(DurationLike::to_millis).unwrap_or(0)
}

fn finite_millis(raw: f64) -> i64 {
    if raw.is_finite() {
        raw.round() as i64
    } else {
        0
    }
}
