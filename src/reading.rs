//! Raw reading schema
//!
//! A reading is one point-in-time machine-state record: a flat JSON object of
//! named fields with heterogeneous values, as delivered by the ingest layer.
//! Readings are ephemeral - each one is consumed once per transformation call.

use crate::error::PrepError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Well-known field names used by the validator and transformer
pub mod fields {
    pub const AIR_TEMPERATURE: &str = "Air_temperature";
    pub const PROCESS_TEMPERATURE: &str = "Process_temperature";
    pub const ROTATIONAL_SPEED: &str = "Rotational_speed";
    pub const TORQUE: &str = "Torque";
    pub const TOOL_WEAR: &str = "Tool_wear";
    pub const MACHINE_TYPE: &str = "Type";
    pub const DATETIME: &str = "datetime";
    pub const MACHINE_AGE_HOURS: &str = "machine_age_hours";
    pub const HOURS_SINCE_LAST: &str = "hours_since_last";
    pub const TEMP_RATE_OF_CHANGE: &str = "Temp_Rate_of_Change";
    pub const RPM_VARIANCE: &str = "RPM_Variance";
}

/// Flexible field value (supports the types sensor feeds actually send)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Boolean(bool),
}

impl FieldValue {
    /// Numeric coercion in the same spirit as the ingest layer: numbers pass
    /// through, numeric strings parse, everything else is rejected.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Boolean(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

/// One raw machine-state reading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawReading {
    fields: HashMap<String, FieldValue>,
}

impl RawReading {
    /// Create an empty reading
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a field value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Remove a field, returning its previous value
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field value coerced to f64, if present and coercible
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(FieldValue::as_f64)
    }

    /// Field value coerced to f64, falling back to `default` when the field
    /// is absent or non-numeric
    pub fn numeric_or(&self, name: &str, default: f64) -> f64 {
        self.numeric(name).unwrap_or(default)
    }

    /// Field value as text, if present and textual
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse newline-delimited JSON (one reading per line, blank lines skipped)
    pub fn parse_ndjson(input: &str) -> Result<Vec<RawReading>, PrepError> {
        let mut readings = Vec::new();
        for line in input.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            readings.push(serde_json::from_str(trimmed)?);
        }
        Ok(readings)
    }

    /// Parse a JSON array of readings
    pub fn parse_array(input: &str) -> Result<Vec<RawReading>, PrepError> {
        Ok(serde_json::from_str(input)?)
    }
}
