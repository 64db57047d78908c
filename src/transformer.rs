//! Feature derivation
//!
//! Turns one raw reading into the fixed 18-slot feature vector the downstream
//! failure-prediction model consumes. The slot order is a frozen contract:
//! the model was trained on exactly this column order, and reordering breaks
//! predictions silently.
//!
//! Transformation is deliberately permissive: a field missing from the
//! reading is substituted with its training-time default instead of raising,
//! so the transformer can run standalone on partially-validated or legacy
//! records. The validator is the only hard gate.

use crate::error::PrepError;
use crate::reading::{fields, RawReading};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Number of slots in the feature vector
pub const FEATURE_COUNT: usize = 18;

/// Feature names in slot order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    // Sensor (5)
    "Air_temperature",
    "Process_temperature",
    "Rotational_speed",
    "Torque",
    "Tool_wear",
    // Engineered (5)
    "Temp_Difference",
    "Power",
    "Torque_Speed_Ratio",
    "Temp_Rate_of_Change",
    "RPM_Variance",
    // Datetime (3)
    "month",
    "hour",
    "dayofweek",
    // Temporal (2)
    "machine_age_hours",
    "hours_since_last",
    // Machine type (3)
    "Type_H",
    "Type_L",
    "Type_M",
];

/// RPM x torque to watts: 60 / 2π, rounded to the constant the model was
/// trained with.
const POWER_DIVISOR: f64 = 9.5488;

/// Accepted timestamp layouts, canonical form first
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Fallback values substituted when a field is absent from a reading.
///
/// These were fixed when the model was trained and are independent of the
/// validation ranges; they must not drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultValues {
    pub air_temperature: f64,
    pub process_temperature: f64,
    pub rotational_speed: f64,
    pub torque: f64,
    pub tool_wear: f64,
    pub temp_rate_of_change: f64,
    pub rpm_variance: f64,
    pub machine_age_hours: f64,
    pub hours_since_last: f64,
    /// Machine type assumed when the Type field is absent
    pub machine_type: String,
}

impl Default for DefaultValues {
    fn default() -> Self {
        Self {
            air_temperature: 300.0,
            process_temperature: 310.0,
            rotational_speed: 1500.0,
            torque: 40.0,
            tool_wear: 100.0,
            temp_rate_of_change: 0.0,
            rpm_variance: 20.0,
            machine_age_hours: 10000.0,
            hours_since_last: 8.0,
            machine_type: "M".to_string(),
        }
    }
}

/// Fixed-order feature vector - one row of model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    /// Slot value looked up by feature name
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|slot| self.values[slot])
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, slot: usize) -> &f64 {
        &self.values[slot]
    }
}

/// What a batch does with a reading whose timestamp fails to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// First failing reading aborts the whole batch
    Abort,
    /// Failing readings are dropped; survivors keep their input order
    Skip,
}

/// Transformer producing fixed-order feature vectors from raw readings
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTransformer {
    feature_names: Vec<String>,
    defaults: DefaultValues,
    fitted: bool,
}

impl Default for FeatureTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureTransformer {
    /// Create a transformer with the training-time defaults
    pub fn new() -> Self {
        Self::with_defaults(DefaultValues::default())
    }

    /// Create a transformer with a specific defaults table
    pub fn with_defaults(defaults: DefaultValues) -> Self {
        Self {
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            defaults,
            fitted: false,
        }
    }

    pub(crate) fn from_parts(
        feature_names: Vec<String>,
        defaults: DefaultValues,
        fitted: bool,
    ) -> Self {
        Self {
            feature_names,
            defaults,
            fitted,
        }
    }

    /// Ordered feature names matching the output slot order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn defaults(&self) -> &DefaultValues {
        &self.defaults
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Transform one reading into its 18-slot feature vector.
    ///
    /// The only failure mode is a malformed `datetime` field; every other
    /// absent or non-numeric field falls back to its default.
    pub fn transform(&self, reading: &RawReading) -> Result<FeatureVector, PrepError> {
        let air_temp = reading.numeric_or(fields::AIR_TEMPERATURE, self.defaults.air_temperature);
        let process_temp = reading.numeric_or(
            fields::PROCESS_TEMPERATURE,
            self.defaults.process_temperature,
        );
        let rpm = reading.numeric_or(fields::ROTATIONAL_SPEED, self.defaults.rotational_speed);
        let torque = reading.numeric_or(fields::TORQUE, self.defaults.torque);
        let tool_wear = reading.numeric_or(fields::TOOL_WEAR, self.defaults.tool_wear);

        let temp_difference = process_temp - air_temp;
        let power = torque * rpm / POWER_DIVISOR;
        // The +1 keeps the ratio finite even for zero-speed readings that
        // never went through validation.
        let torque_speed_ratio = torque / (rpm + 1.0);

        let temp_rate_of_change = reading.numeric_or(
            fields::TEMP_RATE_OF_CHANGE,
            self.defaults.temp_rate_of_change,
        );
        let rpm_variance = reading.numeric_or(fields::RPM_VARIANCE, self.defaults.rpm_variance);

        let stamp = match reading.get(fields::DATETIME) {
            Some(value) => {
                let raw = value
                    .as_str()
                    .ok_or_else(|| PrepError::TimestampParse(value.to_string()))?;
                parse_timestamp(raw)?
            }
            None => Local::now().naive_local(),
        };
        let month = f64::from(stamp.month());
        let hour = f64::from(stamp.hour());
        // ISO weekday numbering, Monday = 0
        let dayofweek = f64::from(stamp.weekday().num_days_from_monday());

        let machine_age_hours =
            reading.numeric_or(fields::MACHINE_AGE_HOURS, self.defaults.machine_age_hours);
        let hours_since_last =
            reading.numeric_or(fields::HOURS_SINCE_LAST, self.defaults.hours_since_last);

        // A present but non-text or unrecognized Type encodes as all zeros;
        // only an absent Type falls back to the default code.
        let machine_type = match reading.get(fields::MACHINE_TYPE) {
            Some(value) => value.as_str().unwrap_or(""),
            None => self.defaults.machine_type.as_str(),
        };
        let type_h = if machine_type == "H" { 1.0 } else { 0.0 };
        let type_l = if machine_type == "L" { 1.0 } else { 0.0 };
        let type_m = if machine_type == "M" { 1.0 } else { 0.0 };

        Ok(FeatureVector {
            values: [
                air_temp,
                process_temp,
                rpm,
                torque,
                tool_wear,
                temp_difference,
                power,
                torque_speed_ratio,
                temp_rate_of_change,
                rpm_variance,
                month,
                hour,
                dayofweek,
                machine_age_hours,
                hours_since_last,
                type_h,
                type_l,
                type_m,
            ],
        })
    }

    /// Transform a batch, aborting on the first failing reading
    pub fn transform_batch(&self, readings: &[RawReading]) -> Result<Vec<FeatureVector>, PrepError> {
        self.transform_batch_with(readings, BatchPolicy::Abort)
    }

    /// Transform a batch with an explicit failure policy.
    ///
    /// Records are independent; output rows preserve input order.
    pub fn transform_batch_with(
        &self,
        readings: &[RawReading],
        policy: BatchPolicy,
    ) -> Result<Vec<FeatureVector>, PrepError> {
        let mut rows = Vec::with_capacity(readings.len());
        for reading in readings {
            match self.transform(reading) {
                Ok(row) => rows.push(row),
                Err(error) => match policy {
                    BatchPolicy::Abort => return Err(error),
                    BatchPolicy::Skip => continue,
                },
            }
        }
        Ok(rows)
    }

    /// Mark the transformer as fitted.
    ///
    /// No statistic is estimated from data; the flag exists only for parity
    /// with transform-pipeline calling conventions.
    pub fn fit(&mut self) {
        self.fitted = true;
    }

    /// Fit on a dataset and return its stacked feature matrix
    pub fn fit_transform(
        &mut self,
        readings: &[RawReading],
    ) -> Result<Vec<FeatureVector>, PrepError> {
        self.fitted = true;
        self.transform_batch(readings)
    }
}

/// Parse an ISO-8601-like timestamp into a naive calendar stamp.
///
/// Offset-carrying RFC 3339 strings keep their own wall-clock time; the
/// calendar features describe when the reading happened locally, not in UTC.
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, PrepError> {
    let trimmed = raw.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(stamp);
        }
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(stamp.naive_local());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(PrepError::TimestampParse(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOLERANCE: f64 = 1e-9;

    fn sample_reading() -> RawReading {
        RawReading::new()
            .with(fields::DATETIME, "2025-01-20 14:30:00")
            .with(fields::MACHINE_TYPE, "M")
            .with(fields::AIR_TEMPERATURE, 300.0)
            .with(fields::PROCESS_TEMPERATURE, 310.0)
            .with(fields::ROTATIONAL_SPEED, 1480.0)
            .with(fields::TORQUE, 42.0)
            .with(fields::TOOL_WEAR, 150.0)
            .with(fields::MACHINE_AGE_HOURS, 15000.0)
            .with(fields::HOURS_SINCE_LAST, 8.0)
            .with(fields::TEMP_RATE_OF_CHANGE, 0.15)
            .with(fields::RPM_VARIANCE, 35.0)
    }

    fn assert_close(actual: f64, expected: f64, slot: usize) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "slot {slot} ({}): {actual} != {expected}",
            FEATURE_NAMES[slot]
        );
    }

    #[test]
    fn test_sample_reading_full_vector() {
        let transformer = FeatureTransformer::new();
        let vector = transformer.transform(&sample_reading()).unwrap();

        let expected = [
            300.0,
            310.0,
            1480.0,
            42.0,
            150.0,
            10.0,
            42.0 * 1480.0 / 9.5488,
            42.0 / 1481.0,
            0.15,
            35.0,
            1.0,  // January
            14.0, // 14:30
            0.0,  // 2025-01-20 is a Monday
            15000.0,
            8.0,
            0.0,
            0.0,
            1.0,
        ];

        assert_eq!(vector.as_slice().len(), FEATURE_COUNT);
        for (slot, (&actual, &wanted)) in
            vector.as_slice().iter().zip(expected.iter()).enumerate()
        {
            assert_close(actual, wanted, slot);
        }
    }

    #[test]
    fn test_transform_is_idempotent() {
        let transformer = FeatureTransformer::new();
        let reading = sample_reading();

        let first = transformer.transform(&reading).unwrap();
        let second = transformer.transform(&reading).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_optional_field_defaults() {
        let transformer = FeatureTransformer::new();
        let mut reading = sample_reading();
        reading.remove(fields::TEMP_RATE_OF_CHANGE);
        reading.remove(fields::RPM_VARIANCE);
        reading.remove(fields::MACHINE_AGE_HOURS);
        reading.remove(fields::HOURS_SINCE_LAST);

        let vector = transformer.transform(&reading).unwrap();
        assert_eq!(vector.get("Temp_Rate_of_Change"), Some(0.0));
        assert_eq!(vector.get("RPM_Variance"), Some(20.0));
        assert_eq!(vector.get("machine_age_hours"), Some(10000.0));
        assert_eq!(vector.get("hours_since_last"), Some(8.0));
    }

    #[test]
    fn test_missing_required_field_defaults_instead_of_failing() {
        let transformer = FeatureTransformer::new();
        let mut reading = sample_reading();
        reading.remove(fields::TORQUE);

        // Validation would reject this reading; transform substitutes the
        // training-time default and recomputes the engineered features.
        let vector = transformer.transform(&reading).unwrap();
        assert_eq!(vector.get("Torque"), Some(40.0));
        assert_close(vector.get("Power").unwrap(), 40.0 * 1480.0 / 9.5488, 6);
        assert_close(vector.get("Torque_Speed_Ratio").unwrap(), 40.0 / 1481.0, 7);
    }

    #[test]
    fn test_one_hot_exclusivity() {
        let transformer = FeatureTransformer::new();

        for (code, expected) in [
            ("H", [1.0, 0.0, 0.0]),
            ("L", [0.0, 1.0, 0.0]),
            ("M", [0.0, 0.0, 1.0]),
        ] {
            let reading = sample_reading().with(fields::MACHINE_TYPE, code);
            let vector = transformer.transform(&reading).unwrap();
            assert_eq!(&vector.as_slice()[15..18], &expected, "Type {code}");
        }
    }

    #[test]
    fn test_unknown_machine_type_encodes_all_zero() {
        let transformer = FeatureTransformer::new();
        let reading = sample_reading().with(fields::MACHINE_TYPE, "X");

        let vector = transformer.transform(&reading).unwrap();
        assert_eq!(&vector.as_slice()[15..18], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_machine_type_defaults_to_m() {
        let transformer = FeatureTransformer::new();
        let mut reading = sample_reading();
        reading.remove(fields::MACHINE_TYPE);

        let vector = transformer.transform(&reading).unwrap();
        assert_eq!(&vector.as_slice()[15..18], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_timestamp_variants() {
        let transformer = FeatureTransformer::new();

        for stamp in [
            "2025-01-20 14:30:00",
            "2025-01-20T14:30:00",
            "2025-01-20 14:30:00.250",
            "2025-01-20T14:30:00+00:00",
        ] {
            let reading = sample_reading().with(fields::DATETIME, stamp);
            let vector = transformer.transform(&reading).unwrap();
            assert_eq!(vector.get("month"), Some(1.0), "{stamp}");
            assert_eq!(vector.get("hour"), Some(14.0), "{stamp}");
            assert_eq!(vector.get("dayofweek"), Some(0.0), "{stamp}");
        }

        // Date-only input decomposes at midnight
        let reading = sample_reading().with(fields::DATETIME, "2025-01-25");
        let vector = transformer.transform(&reading).unwrap();
        assert_eq!(vector.get("hour"), Some(0.0));
        assert_eq!(vector.get("dayofweek"), Some(5.0)); // Saturday
    }

    #[test]
    fn test_malformed_timestamp_is_an_error() {
        let transformer = FeatureTransformer::new();
        let reading = sample_reading().with(fields::DATETIME, "not-a-date");

        let result = transformer.transform(&reading);
        assert!(matches!(result, Err(PrepError::TimestampParse(_))));
    }

    #[test]
    fn test_absent_datetime_uses_wall_clock() {
        let transformer = FeatureTransformer::new();
        let mut reading = sample_reading();
        reading.remove(fields::DATETIME);

        let vector = transformer.transform(&reading).unwrap();
        let month = vector.get("month").unwrap();
        let hour = vector.get("hour").unwrap();
        assert!((1.0..=12.0).contains(&month));
        assert!((0.0..=23.0).contains(&hour));
    }

    #[test]
    fn test_batch_preserves_order() {
        let transformer = FeatureTransformer::new();
        let readings: Vec<RawReading> = (0..5)
            .map(|i| sample_reading().with(fields::TORQUE, 40.0 + i as f64))
            .collect();

        let rows = transformer.transform_batch(&readings).unwrap();
        assert_eq!(rows.len(), 5);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.get("Torque"), Some(40.0 + i as f64));
        }
    }

    #[test]
    fn test_batch_abort_propagates_first_error() {
        let transformer = FeatureTransformer::new();
        let readings = vec![
            sample_reading(),
            sample_reading().with(fields::DATETIME, "garbage"),
            sample_reading(),
        ];

        assert!(transformer.transform_batch(&readings).is_err());
    }

    #[test]
    fn test_batch_skip_drops_only_failures() {
        let transformer = FeatureTransformer::new();
        let readings = vec![
            sample_reading().with(fields::TORQUE, 41.0),
            sample_reading().with(fields::DATETIME, "garbage"),
            sample_reading().with(fields::TORQUE, 43.0),
        ];

        let rows = transformer
            .transform_batch_with(&readings, BatchPolicy::Skip)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Torque"), Some(41.0));
        assert_eq!(rows[1].get("Torque"), Some(43.0));
    }

    #[test]
    fn test_fit_transform_sets_flag_only() {
        let mut transformer = FeatureTransformer::new();
        assert!(!transformer.is_fitted());

        let readings = vec![sample_reading()];
        let fitted_rows = transformer.fit_transform(&readings).unwrap();
        assert!(transformer.is_fitted());

        // Fitting estimates nothing; a fresh transformer produces the same rows.
        let plain_rows = FeatureTransformer::new().transform_batch(&readings).unwrap();
        assert_eq!(fitted_rows, plain_rows);
    }

    #[test]
    fn test_feature_names_match_slot_order() {
        let transformer = FeatureTransformer::new();
        let names = transformer.feature_names();

        assert_eq!(names.len(), FEATURE_COUNT);
        for (name, expected) in names.iter().zip(FEATURE_NAMES.iter()) {
            assert_eq!(name, expected);
        }
    }
}
