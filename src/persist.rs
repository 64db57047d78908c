//! Pipeline persistence
//!
//! Saves the transformer configuration as a versioned JSON artifact and
//! restores it, so a deployment can pin the exact feature contract the model
//! was trained against. Loading rejects artifacts written under a different
//! schema version instead of guessing.

use crate::error::PrepError;
use crate::transformer::{DefaultValues, FeatureTransformer, FEATURE_COUNT};
use crate::{PREP_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Current artifact schema version
pub const ARTIFACT_VERSION: &str = "pdm.pipeline.v1";

/// Producer metadata stamped into every artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactProducer {
    pub name: String,
    pub version: String,
}

/// On-disk shape of a saved pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub schema_version: String,
    pub artifact_id: String,
    pub saved_at: DateTime<Utc>,
    pub producer: ArtifactProducer,
    pub feature_names: Vec<String>,
    pub defaults: DefaultValues,
    pub fitted: bool,
}

impl PipelineArtifact {
    /// Capture a transformer's configuration as a fresh artifact
    pub fn from_transformer(transformer: &FeatureTransformer) -> Self {
        Self {
            schema_version: ARTIFACT_VERSION.to_string(),
            artifact_id: Uuid::new_v4().to_string(),
            saved_at: Utc::now(),
            producer: ArtifactProducer {
                name: PRODUCER_NAME.to_string(),
                version: PREP_VERSION.to_string(),
            },
            feature_names: transformer.feature_names().to_vec(),
            defaults: transformer.defaults().clone(),
            fitted: transformer.is_fitted(),
        }
    }

    /// Reconstruct a transformer, rejecting incompatible artifacts
    pub fn into_transformer(self) -> Result<FeatureTransformer, PrepError> {
        if self.schema_version != ARTIFACT_VERSION {
            return Err(PrepError::UnsupportedArtifact {
                expected: ARTIFACT_VERSION.to_string(),
                actual: self.schema_version,
            });
        }
        if self.feature_names.len() != FEATURE_COUNT {
            return Err(PrepError::FeatureCountMismatch {
                expected: FEATURE_COUNT,
                actual: self.feature_names.len(),
            });
        }
        Ok(FeatureTransformer::from_parts(
            self.feature_names,
            self.defaults,
            self.fitted,
        ))
    }
}

impl FeatureTransformer {
    /// Serialize the pipeline configuration to a versioned JSON artifact
    pub fn to_json(&self) -> Result<String, PrepError> {
        let artifact = PipelineArtifact::from_transformer(self);
        serde_json::to_string_pretty(&artifact).map_err(PrepError::JsonError)
    }

    /// Restore a transformer from a JSON artifact
    pub fn from_json(json: &str) -> Result<Self, PrepError> {
        let artifact: PipelineArtifact = serde_json::from_str(json)?;
        artifact.into_transformer()
    }

    /// Write the pipeline artifact to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PrepError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a pipeline artifact from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PrepError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{fields, RawReading};

    fn pinned_reading() -> RawReading {
        RawReading::new()
            .with(fields::DATETIME, "2025-01-20 14:30:00")
            .with(fields::MACHINE_TYPE, "M")
            .with(fields::AIR_TEMPERATURE, 300.0)
            .with(fields::PROCESS_TEMPERATURE, 310.0)
            .with(fields::ROTATIONAL_SPEED, 1480.0)
            .with(fields::TORQUE, 42.0)
            .with(fields::TOOL_WEAR, 150.0)
    }

    #[test]
    fn test_round_trip_produces_identical_output() {
        let mut transformer = FeatureTransformer::new();
        transformer.fit();

        let json = transformer.to_json().unwrap();
        let loaded = FeatureTransformer::from_json(&json).unwrap();

        assert!(loaded.is_fitted());
        assert_eq!(loaded.feature_names(), transformer.feature_names());

        let reading = pinned_reading();
        let before = transformer.transform(&reading).unwrap();
        let after = loaded.transform(&reading).unwrap();
        for (a, b) in before.as_slice().iter().zip(after.as_slice()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_artifact_metadata() {
        let artifact = PipelineArtifact::from_transformer(&FeatureTransformer::new());

        assert_eq!(artifact.schema_version, ARTIFACT_VERSION);
        assert_eq!(artifact.producer.name, PRODUCER_NAME);
        assert_eq!(artifact.feature_names.len(), FEATURE_COUNT);
        assert!(!artifact.fitted);
    }

    #[test]
    fn test_unknown_schema_version_rejected() {
        let mut artifact = PipelineArtifact::from_transformer(&FeatureTransformer::new());
        artifact.schema_version = "pdm.pipeline.v9".to_string();

        let result = artifact.into_transformer();
        assert!(matches!(result, Err(PrepError::UnsupportedArtifact { .. })));
    }

    #[test]
    fn test_truncated_feature_list_rejected() {
        let mut artifact = PipelineArtifact::from_transformer(&FeatureTransformer::new());
        artifact.feature_names.pop();

        let result = artifact.into_transformer();
        assert!(matches!(
            result,
            Err(PrepError::FeatureCountMismatch {
                expected: FEATURE_COUNT,
                actual: 17
            })
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("presage-prep-{}.json", Uuid::new_v4()));

        let transformer = FeatureTransformer::new();
        transformer.save(&path).unwrap();
        let loaded = FeatureTransformer::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, transformer);
    }

    #[test]
    fn test_custom_defaults_survive_round_trip() {
        let defaults = DefaultValues {
            torque: 55.0,
            ..Default::default()
        };
        let transformer = FeatureTransformer::with_defaults(defaults);

        let loaded = FeatureTransformer::from_json(&transformer.to_json().unwrap()).unwrap();
        assert_eq!(loaded.defaults().torque, 55.0);
    }
}
