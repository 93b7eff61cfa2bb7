//! Classifier, artifact persistence, training and inference

pub mod artifact;
pub mod classifier;
pub mod inference;
pub mod trainer;

pub use artifact::{ArtifactMetadata, ArtifactStore, ModelArtifact};
pub use classifier::{ClassifierParams, LogisticClassifier};
pub use inference::{InferenceService, PredictionResult};
pub use trainer::{derive_labels, TrainingConfig, TrainingPipeline};
