//! Offline training job
//!
//! Fits the encoder registry and classifier on a CSV export and publishes
//! the resulting artifact to the store.
//!
//! Usage: train-model [data.csv] [artifacts-dir]

use anyhow::{Context, Result};
use churn_prediction_pipeline::{
    config::AppConfig, ingest, logging, models::ArtifactStore, models::TrainingPipeline,
};
use std::path::PathBuf;
use tracing::{info, warn};

fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    logging::init(&config.logging, &["churn_prediction_pipeline", "train_model"])?;

    let args: Vec<String> = std::env::args().collect();
    let data_path = args
        .get(1)
        .map(PathBuf::from)
        .or_else(|| config.training.data_path.clone())
        .context("No training data given and training.data_path is not configured")?;
    let artifacts_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.artifacts.dir.clone());

    let records = ingest::read_csv_path(&data_path)
        .with_context(|| format!("Failed to read {}", data_path.display()))?;
    if records.iter().all(|r| r.churn.is_none()) {
        warn!("No Churn column values found, every record will be labelled 0");
    }

    let pipeline = TrainingPipeline::new(config.training.params.clone());
    let artifact = pipeline.train_records(&records)?;

    let store = ArtifactStore::new(&artifacts_dir);
    let dir = store.save(&artifact)?;

    info!(
        artifact_id = %artifact.artifact_id(),
        training_rows = artifact.metadata().training_rows,
        validation_accuracy = ?artifact.metadata().validation_accuracy,
        path = %dir.display(),
        "Artifact ready"
    );
    Ok(())
}
