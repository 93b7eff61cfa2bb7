//! Churn Prediction Pipeline Library
//!
//! Retail churn scoring with one feature contract shared by offline training
//! and online inference, plus rule-based risk explanations and portfolio
//! reporting.

pub mod config;
pub mod consumer;
pub mod encoder;
pub mod error;
pub mod explain;
pub mod feature_extractor;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod report;
pub mod types;

pub use config::AppConfig;
pub use encoder::{CategoryEncoder, EncoderRegistry};
pub use error::{ChurnError, Result};
pub use explain::{explain, explain_for_report, RiskExplanation};
pub use feature_extractor::{CoercionMode, FeatureVector, FeatureVectorizer};
pub use models::{ArtifactStore, InferenceService, ModelArtifact, PredictionResult, TrainingPipeline};
pub use report::{summarize, PortfolioSummary};
pub use types::{CustomerRecord, ScoredCustomer};
