//! Presage Prep - deterministic preprocessing for predictive-maintenance inference
//!
//! Prep turns raw machine-state readings into the fixed 18-slot feature vector
//! the downstream failure-prediction model consumes, through a deterministic
//! pipeline: input validation → feature derivation → vector assembly.
//!
//! ## Modules
//!
//! - **Validator**: presence and physical-range checks on raw readings
//! - **FeatureTransformer**: engineered features, calendar decomposition,
//!   default substitution, one-hot machine type, fixed slot order
//! - **Persistence**: versioned JSON artifacts for the pipeline configuration

pub mod error;
pub mod persist;
pub mod reading;
pub mod transformer;
pub mod validator;

pub use error::PrepError;
pub use persist::{PipelineArtifact, ARTIFACT_VERSION};
pub use reading::{FieldValue, RawReading};
pub use transformer::{
    BatchPolicy, DefaultValues, FeatureTransformer, FeatureVector, FEATURE_COUNT, FEATURE_NAMES,
};
pub use validator::{ValidationConfig, ValidationError, ValidationReport, Validator};

/// Prep version embedded in all persisted artifacts
pub const PREP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for persisted artifacts
pub const PRODUCER_NAME: &str = "presage-prep";
