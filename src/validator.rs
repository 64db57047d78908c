//! Input validation
//!
//! Checks a raw reading for required fields and physical range constraints
//! before it is trusted for feature derivation. Validation is purely
//! functional: the outcome is a report value, never a panic, and the reading
//! is not mutated.

use crate::reading::{fields, FieldValue, RawReading};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Required fields, in check order
pub const REQUIRED_FIELDS: [&str; 6] = [
    fields::AIR_TEMPERATURE,
    fields::PROCESS_TEMPERATURE,
    fields::ROTATIONAL_SPEED,
    fields::TORQUE,
    fields::TOOL_WEAR,
    fields::MACHINE_TYPE,
];

/// Machine type codes accepted by the downstream model
pub const MACHINE_TYPES: [&str; 3] = ["H", "M", "L"];

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// One or more required fields absent; lists every missing name
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// Numeric value outside its documented bound (bounds are inclusive)
    #[error("{field} out of range: {value} (expected {min}-{max}{unit})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
        unit: &'static str,
    },

    /// Machine type not one of H, M, L
    #[error("Invalid Type: {0} (expected H, M, or L)")]
    InvalidMachineType(String),

    /// Required field present but not parseable as a number
    #[error("Invalid data type: {field} = {value} is not numeric")]
    NotNumeric { field: &'static str, value: String },
}

/// Inclusive range bounds for each numeric required field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Air temperature range (K)
    pub air_temperature_k: (f64, f64),
    /// Process temperature range (K)
    pub process_temperature_k: (f64, f64),
    /// Rotational speed range (RPM)
    pub rotational_speed_rpm: (f64, f64),
    /// Torque range (Nm)
    pub torque_nm: (f64, f64),
    /// Tool wear range (minutes)
    pub tool_wear_min: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            air_temperature_k: (200.0, 400.0),
            process_temperature_k: (200.0, 400.0),
            rotational_speed_rpm: (1000.0, 3000.0),
            torque_nm: (0.0, 100.0),
            tool_wear_min: (0.0, 300.0),
        }
    }
}

/// Outcome of validating one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the reading passed all checks
    pub valid: bool,
    /// Human-readable failure description; empty on success
    pub message: String,
}

impl ValidationReport {
    pub fn pass() -> Self {
        Self {
            valid: true,
            message: String::new(),
        }
    }

    pub fn fail(error: &ValidationError) -> Self {
        Self {
            valid: false,
            message: error.to_string(),
        }
    }
}

/// Validator for raw machine-state readings
pub struct Validator {
    config: ValidationConfig,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl Validator {
    /// Create a validator with the given range configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a reading, returning the (valid, message) report pair
    pub fn validate(&self, reading: &RawReading) -> ValidationReport {
        match self.check(reading) {
            Ok(()) => ValidationReport::pass(),
            Err(error) => ValidationReport::fail(&error),
        }
    }

    /// Validate a reading, returning the first failure as a typed error.
    ///
    /// Presence of all required fields is checked first (every missing name
    /// is reported at once); range checks then run in the documented field
    /// order and stop at the first violation.
    pub fn check(&self, reading: &RawReading) -> Result<(), ValidationError> {
        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|name| !reading.contains(name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        self.check_range(
            reading,
            fields::AIR_TEMPERATURE,
            self.config.air_temperature_k,
            "K",
        )?;
        self.check_range(
            reading,
            fields::PROCESS_TEMPERATURE,
            self.config.process_temperature_k,
            "K",
        )?;
        self.check_range(
            reading,
            fields::ROTATIONAL_SPEED,
            self.config.rotational_speed_rpm,
            " RPM",
        )?;
        self.check_range(reading, fields::TORQUE, self.config.torque_nm, " Nm")?;
        self.check_range(reading, fields::TOOL_WEAR, self.config.tool_wear_min, " min")?;

        let machine_type = reading
            .get(fields::MACHINE_TYPE)
            .map(FieldValue::to_string)
            .unwrap_or_default();
        if !MACHINE_TYPES.contains(&machine_type.as_str()) {
            return Err(ValidationError::InvalidMachineType(machine_type));
        }

        Ok(())
    }

    fn check_range(
        &self,
        reading: &RawReading,
        field: &'static str,
        (min, max): (f64, f64),
        unit: &'static str,
    ) -> Result<(), ValidationError> {
        let Some(raw) = reading.get(field) else {
            return Err(ValidationError::MissingFields(vec![field.to_string()]));
        };
        let value = raw.as_f64().ok_or_else(|| ValidationError::NotNumeric {
            field,
            value: raw.to_string(),
        })?;
        if value < min || value > max {
            return Err(ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
                unit,
            });
        }
        Ok(())
    }
}
