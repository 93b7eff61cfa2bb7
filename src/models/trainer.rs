//! Offline training: fit encoders and classifier, emit one artifact

use crate::encoder::EncoderRegistry;
use crate::error::{ChurnError, Result};
use crate::feature_extractor::FeatureVectorizer;
use crate::models::artifact::ModelArtifact;
use crate::models::classifier::{ClassifierParams, LogisticClassifier};
use crate::types::CustomerRecord;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::{info, warn};

/// Training job settings
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Share of rows held out for validation; 0 disables the split
    #[serde(default = "default_validation_fraction")]
    pub validation_fraction: f64,
    /// Seed for the validation shuffle
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub classifier: ClassifierParams,
}

fn default_validation_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            validation_fraction: default_validation_fraction(),
            seed: default_seed(),
            classifier: ClassifierParams::default(),
        }
    }
}

/// Binary labels from the `Churn` column: "Yes" is 1, anything else 0
pub fn derive_labels(records: &[CustomerRecord]) -> Vec<usize> {
    records.iter().map(CustomerRecord::churn_label).collect()
}

/// Fits the encoder registry and classifier as one unit.
#[derive(Debug, Clone, Default)]
pub struct TrainingPipeline {
    config: TrainingConfig,
    vectorizer: FeatureVectorizer,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            vectorizer: FeatureVectorizer::new(),
        }
    }

    /// Train from records labelled by their `Churn` column.
    pub fn train_records(&self, records: &[CustomerRecord]) -> Result<ModelArtifact> {
        let labels = derive_labels(records);
        self.train(records, &labels)
    }

    /// Train on `records` with explicit 0/1 `labels`.
    ///
    /// The registry is fitted on the whole corpus, so every training record
    /// encodes; the classifier only sees the training split.
    pub fn train(&self, records: &[CustomerRecord], labels: &[usize]) -> Result<ModelArtifact> {
        if records.is_empty() {
            return Err(ChurnError::Training("training corpus is empty".to_string()));
        }
        if records.len() != labels.len() {
            return Err(ChurnError::Training(format!(
                "{} records but {} labels",
                records.len(),
                labels.len()
            )));
        }
        if let Some(bad) = labels.iter().find(|&&l| l > 1) {
            return Err(ChurnError::Training(format!("label {bad} is not binary")));
        }

        let registry = EncoderRegistry::fit(records);
        let x = self.vectorizer.vectorize_batch(records, &registry)?;
        let y = Array1::from(labels.to_vec());

        let (train_idx, holdout_idx) = self.split(records.len());
        let (x_train, y_train) = select(&x, &y, &train_idx);

        info!(
            rows = records.len(),
            train_rows = train_idx.len(),
            holdout_rows = holdout_idx.len(),
            churned = labels.iter().filter(|&&l| l == 1).count(),
            "Fitting churn classifier"
        );

        let classifier = LogisticClassifier::fit(&x_train, &y_train, &self.config.classifier)?;

        let validation_accuracy = if holdout_idx.is_empty() {
            None
        } else {
            let (x_test, y_test) = select(&x, &y, &holdout_idx);
            let accuracy = classifier.accuracy(&x_test, &y_test);
            info!(accuracy = format!("{:.3}", accuracy), "Validation accuracy");
            Some(accuracy)
        };

        let artifact = ModelArtifact::new(classifier, registry, train_idx.len(), validation_accuracy)?;
        info!(
            artifact_id = %artifact.artifact_id(),
            fingerprint = %artifact.metadata().registry_fingerprint,
            "Training complete"
        );
        Ok(artifact)
    }

    /// Shuffled (train, holdout) row indices.
    fn split(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        let fraction = self.config.validation_fraction;
        if !(0.0..1.0).contains(&fraction) {
            warn!(fraction, "Validation fraction out of range, training on all rows");
            return ((0..n).collect(), Vec::new());
        }

        let holdout = (n as f64 * fraction).round() as usize;
        // keep at least one training row
        let holdout = holdout.min(n.saturating_sub(1));
        if holdout == 0 {
            return ((0..n).collect(), Vec::new());
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);
        let train = indices.split_off(holdout);
        (train, indices)
    }
}

fn select(x: &Array2<f64>, y: &Array1<usize>, idx: &[usize]) -> (Array2<f64>, Array1<usize>) {
    (x.select(Axis(0), idx), y.select(Axis(0), idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoricalField, NumericValue};

    fn customer(i: usize, churn: bool) -> CustomerRecord {
        let countries = ["US", "UK", "DE"];
        CustomerRecord {
            name: format!("customer {i}"),
            gender: if i % 2 == 0 { "F" } else { "M" }.to_string(),
            income: if churn { "Low" } else { "High" }.to_string(),
            age: NumericValue::from((20 + i % 40) as f64),
            country: countries[i % countries.len()].to_string(),
            total_amount: NumericValue::from(if churn { 150.0 + i as f64 } else { 3000.0 + i as f64 }),
            feedback: if churn { "Bad" } else { "Good" }.to_string(),
            order_status: if churn { "Returned" } else { "Delivered" }.to_string(),
            ratings: NumericValue::from(if churn { 2.0 } else { 8.0 }),
            churn: Some(if churn { "Yes" } else { "No" }.to_string()),
            ..Default::default()
        }
    }

    fn corpus(n: usize) -> Vec<CustomerRecord> {
        (0..n).map(|i| customer(i, i % 3 == 0)).collect()
    }

    #[test]
    fn test_derive_labels() {
        let records = corpus(6);
        assert_eq!(derive_labels(&records), vec![1, 0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_train_reports_validation() {
        let records = corpus(30);
        let artifact = TrainingPipeline::default().train_records(&records).unwrap();

        assert_eq!(artifact.metadata().training_rows, 24);
        let accuracy = artifact.metadata().validation_accuracy.unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn test_registry_covers_full_corpus() {
        let records = corpus(30);
        let artifact = TrainingPipeline::default().train_records(&records).unwrap();
        let vectorizer = FeatureVectorizer::new();

        for record in &records {
            assert!(vectorizer.vectorize(record, artifact.registry()).is_ok());
        }
        assert_eq!(
            artifact.registry().encoder(CategoricalField::Country).unwrap().len(),
            3
        );
    }

    #[test]
    fn test_split_is_deterministic() {
        let pipeline = TrainingPipeline::default();
        assert_eq!(pipeline.split(50), pipeline.split(50));

        let (train, holdout) = pipeline.split(50);
        assert_eq!(train.len(), 40);
        assert_eq!(holdout.len(), 10);
    }

    #[test]
    fn test_split_disabled() {
        let pipeline = TrainingPipeline::new(TrainingConfig {
            validation_fraction: 0.0,
            ..Default::default()
        });
        let artifact = pipeline.train_records(&corpus(9)).unwrap();
        assert_eq!(artifact.metadata().training_rows, 9);
        assert_eq!(artifact.metadata().validation_accuracy, None);
    }

    #[test]
    fn test_train_rejects_bad_input() {
        let pipeline = TrainingPipeline::default();
        assert!(pipeline.train(&[], &[]).is_err());

        let records = corpus(3);
        assert!(pipeline.train(&records, &[1, 0]).is_err());
        assert!(pipeline.train(&records, &[1, 0, 2]).is_err());
    }
}
