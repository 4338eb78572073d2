//! The flat metric record that is shipped in the beacon
//!
//! Fields are written from two places: aggregators overwrite their running
//! value as entries arrive, and the snapshot builder fills the rest once at
//! send time. A field whose value is undefined, NaN or infinite is never
//! stored, so it can never reach the wire as a literal `NaN`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single metric value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Number(_) => None,
            MetricValue::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // `-0` would otherwise print with its sign
            MetricValue::Number(n) if *n == 0.0 => f.write_str("0"),
            MetricValue::Number(n) => write!(f, "{}", n),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

/// Mapping from metric name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PerformanceRecord {
    fields: BTreeMap<String, MetricValue>,
}

impl PerformanceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a number, or drop the field if the value is not finite
    ///
    /// Returns whether the field is now present.
    pub fn set_number(&mut self, key: impl Into<String>, value: f64) -> bool {
        let key = key.into();
        if value.is_finite() {
            self.fields.insert(key, MetricValue::Number(value));
            true
        } else {
            self.fields.remove(&key);
            false
        }
    }

    /// Store a number if there is one; `None` clears the field
    pub fn set_optional_number(&mut self, key: impl Into<String>, value: Option<f64>) -> bool {
        match value {
            Some(v) => self.set_number(key, v),
            None => {
                self.fields.remove(&key.into());
                false
            }
        }
    }

    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), MetricValue::Text(value.into()));
    }

    /// Store text if there is some; `None` clears the field
    pub fn set_optional_text(&mut self, key: impl Into<String>, value: Option<String>) {
        match value {
            Some(v) => self.set_text(key, v),
            None => {
                self.fields.remove(&key.into());
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<MetricValue> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.fields.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(MetricValue::as_f64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetricValue::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the defined fields in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}
