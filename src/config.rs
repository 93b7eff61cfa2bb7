//! Configuration management for the churn pipeline

use crate::feature_extractor::CoercionMode;
use crate::models::trainer::TrainingConfig;
use crate::types::RiskLevelThresholds;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative config file
pub const CONFIG_ENV: &str = "CHURN_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub training: TrainingSection,
    #[serde(default)]
    pub scoring: ScoringConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming customer records
    pub record_subject: String,
    /// Subject for outgoing scored customers
    pub score_subject: String,
    /// Subject that triggers an artifact reload
    pub reload_subject: String,
}

/// Where trained artifacts live
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
}

/// Offline training settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingSection {
    /// Default CSV corpus for `train-model`
    #[serde(default)]
    pub data_path: Option<PathBuf>,
    #[serde(flatten)]
    pub params: TrainingConfig,
}

/// Online scoring settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfig {
    /// Numeric coercion: "lenient" imputes 0, "strict" rejects
    #[serde(default)]
    pub coercion: CoercionMode,
    /// Risk band thresholds on the churn probability
    #[serde(default)]
    pub risk_levels: RiskLevelThresholds,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum records scored concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load from `$CHURN_CONFIG`, or `config/config.toml` when unset
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = Config::builder()
            .add_source(File::from(path))
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.display()))?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                record_subject: "customers.score".to_string(),
                score_subject: "customers.scored".to_string(),
                reload_subject: "customers.model.reload".to_string(),
            },
            artifacts: ArtifactsConfig {
                dir: PathBuf::from("artifacts"),
            },
            training: TrainingSection::default(),
            scoring: ScoringConfig::default(),
            pipeline: PipelineConfig {
                workers: 4,
                metrics_interval_secs: default_metrics_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.nats.record_subject, "customers.score");
        assert_eq!(config.scoring.coercion, CoercionMode::Lenient);
        assert_eq!(config.scoring.risk_levels.medium, 0.5);
        assert_eq!(config.training.params.seed, 42);
        assert_eq!(config.pipeline.workers, 4);
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[nats]
url = "nats://nats:4222"
record_subject = "in"
score_subject = "out"
reload_subject = "reload"

[artifacts]
dir = "/var/lib/churn"

[training]
data_path = "data/customers.csv"
validation_fraction = 0.25

[training.classifier]
max_iterations = 50
alpha = 0.5

[scoring]
coercion = "strict"

[scoring.risk_levels]
medium = 0.4
high = 0.6
critical = 0.8

[pipeline]
workers = 8

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.nats.record_subject, "in");
        assert_eq!(config.artifacts.dir, PathBuf::from("/var/lib/churn"));
        assert_eq!(config.training.data_path, Some(PathBuf::from("data/customers.csv")));
        assert_eq!(config.training.params.validation_fraction, 0.25);
        assert_eq!(config.training.params.seed, 42);
        assert_eq!(config.training.params.classifier.max_iterations, 50);
        assert_eq!(config.scoring.coercion, CoercionMode::Strict);
        assert_eq!(config.scoring.risk_levels.critical, 0.8);
        assert_eq!(config.pipeline.workers, 8);
        assert_eq!(config.pipeline.metrics_interval_secs, 30);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(AppConfig::load_from_path("does/not/exist.toml").is_err());
    }
}
