//! Online churn inference over a resident, swappable artifact

use crate::error::Result;
use crate::explain::explain;
use crate::feature_extractor::{CoercionMode, FeatureVectorizer};
use crate::models::artifact::{ArtifactStore, ModelArtifact};
use crate::models::classifier::label_for;
use crate::types::{CustomerRecord, RiskLevel, RiskLevelThresholds, ScoredCustomer};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Result of scoring one record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted label (1 = churn)
    #[serde(rename = "prediction")]
    pub label: u8,
    /// Probability of the churn class
    #[serde(rename = "probability_of_churn")]
    pub probability: f64,
}

/// Scores records against the current artifact.
///
/// Every call works on a snapshot of the artifact taken at entry, so a
/// concurrent [`InferenceService::swap`] never mixes an old registry with a
/// new classifier.
pub struct InferenceService {
    artifact: RwLock<Arc<ModelArtifact>>,
    vectorizer: FeatureVectorizer,
}

impl InferenceService {
    /// Create a service around an already loaded artifact
    pub fn new(artifact: ModelArtifact) -> Self {
        Self::with_mode(artifact, CoercionMode::default())
    }

    pub fn with_mode(artifact: ModelArtifact, mode: CoercionMode) -> Self {
        info!(
            artifact_id = %artifact.artifact_id(),
            mode = ?mode,
            "Inference service initialized"
        );
        Self {
            artifact: RwLock::new(Arc::new(artifact)),
            vectorizer: FeatureVectorizer::with_mode(mode),
        }
    }

    /// Load the current artifact from `store`
    pub fn from_store(store: &ArtifactStore, mode: CoercionMode) -> Result<Self> {
        let artifact = store.load_current()?;
        Ok(Self::with_mode(artifact, mode))
    }

    /// Snapshot of the resident artifact
    pub fn current(&self) -> Arc<ModelArtifact> {
        self.artifact
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn coercion_mode(&self) -> CoercionMode {
        self.vectorizer.mode()
    }

    /// Replace the resident artifact; returns the one it replaced.
    pub fn swap(&self, artifact: ModelArtifact) -> Arc<ModelArtifact> {
        let next = Arc::new(artifact);
        let mut slot = self.artifact.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *slot, next);
        info!(
            previous = %previous.artifact_id(),
            current = %slot.artifact_id(),
            "Artifact swapped"
        );
        previous
    }

    /// Load the store's current artifact, then repoint to it.
    ///
    /// On failure the resident artifact stays in place.
    pub fn reload(&self, store: &ArtifactStore) -> Result<Arc<ModelArtifact>> {
        let artifact = store.load_current()?;
        Ok(self.swap(artifact))
    }

    /// Label and churn probability for one record.
    pub fn predict(&self, record: &CustomerRecord) -> Result<PredictionResult> {
        let artifact = self.current();
        self.predict_with(&artifact, record)
    }

    /// One result per record, all against the same artifact snapshot
    pub fn predict_batch(&self, records: &[CustomerRecord]) -> Vec<Result<PredictionResult>> {
        let artifact = self.current();
        records
            .iter()
            .map(|record| self.predict_with(&artifact, record))
            .collect()
    }

    /// Prediction plus risk band and rule-based reasons, ready to publish.
    pub fn score(
        &self,
        record: &CustomerRecord,
        thresholds: &RiskLevelThresholds,
    ) -> Result<ScoredCustomer> {
        let artifact = self.current();
        let prediction = self.predict_with(&artifact, record)?;
        let risk_level = RiskLevel::from_probability(prediction.probability, thresholds);

        Ok(ScoredCustomer::new(
            record.name.clone(),
            record.email.clone(),
            prediction.label,
            prediction.probability,
            risk_level,
        )
        .with_reasons(explain(record).reasons())
        .with_artifact(artifact.artifact_id().to_string()))
    }

    fn predict_with(
        &self,
        artifact: &ModelArtifact,
        record: &CustomerRecord,
    ) -> Result<PredictionResult> {
        let features = self.vectorizer.vectorize(record, artifact.registry())?;
        let probability = artifact.classifier().predict_proba(&features);
        let label = label_for(probability);

        debug!(
            artifact_id = %artifact.artifact_id(),
            probability = probability,
            label = label,
            "Record scored"
        );

        Ok(PredictionResult { label, probability })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChurnError;
    use crate::models::trainer::TrainingPipeline;
    use crate::types::NumericValue;

    fn customer(i: usize, churn: bool) -> CustomerRecord {
        CustomerRecord {
            name: format!("customer {i}"),
            email: format!("c{i}@example.com"),
            gender: if i % 2 == 0 { "F" } else { "M" }.to_string(),
            income: if churn { "Low" } else { "High" }.to_string(),
            age: NumericValue::from((25 + i % 30) as f64),
            country: if i % 2 == 0 { "US" } else { "UK" }.to_string(),
            total_amount: NumericValue::from(if churn { 120.0 } else { 4200.0 }),
            feedback: if churn { "Bad" } else { "Good" }.to_string(),
            order_status: if churn { "Returned" } else { "Delivered" }.to_string(),
            ratings: NumericValue::from(if churn { 2.0 } else { 9.0 }),
            churn: Some(if churn { "Yes" } else { "No" }.to_string()),
            ..Default::default()
        }
    }

    fn trained() -> (Vec<CustomerRecord>, ModelArtifact) {
        let records: Vec<CustomerRecord> = (0..24).map(|i| customer(i, i % 3 == 0)).collect();
        let artifact = TrainingPipeline::default().train_records(&records).unwrap();
        (records, artifact)
    }

    #[test]
    fn test_predict_bounds() {
        let (records, artifact) = trained();
        let service = InferenceService::new(artifact);

        for record in &records {
            let result = service.predict(record).unwrap();
            assert!((0.0..=1.0).contains(&result.probability));
            assert_eq!(result.label, label_for(result.probability));
        }
    }

    #[test]
    fn test_churners_predicted_as_churn() {
        // a third of the corpus churns
        let (records, artifact) = trained();
        let service = InferenceService::new(artifact);

        let churner = service.predict(&records[0]).unwrap();
        assert_eq!(churner.label, 1);
        assert!(churner.probability > 0.5);

        let retained = service.predict(&records[1]).unwrap();
        assert_eq!(retained.label, 0);
        assert!(retained.probability < 0.5);

        let scored = service.score(&records[0], &RiskLevelThresholds::default()).unwrap();
        assert_ne!(scored.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_unknown_country_is_client_error() {
        let (records, artifact) = trained();
        let service = InferenceService::new(artifact);

        let mut record = records[0].clone();
        record.country = "FR".to_string();
        let err = service.predict(&record).unwrap_err();

        assert!(err.is_client_error());
        assert!(matches!(
            err,
            ChurnError::UnknownCategory { ref field, ref value } if field == "Country" && value == "FR"
        ));
    }

    #[test]
    fn test_strict_mode_rejects_garbage_age() {
        let (records, artifact) = trained();
        let service = InferenceService::with_mode(artifact, CoercionMode::Strict);

        let mut record = records[1].clone();
        record.age = NumericValue::from("abc");
        let err = service.predict(&record).unwrap_err();
        assert!(matches!(err, ChurnError::MalformedRecord { .. }));

        let lenient = InferenceService::new(service.current().as_ref().clone());
        assert!(lenient.predict(&record).is_ok());
    }

    #[test]
    fn test_predict_batch_keeps_order() {
        let (records, artifact) = trained();
        let service = InferenceService::new(artifact);

        let mut batch = records[..3].to_vec();
        batch[1].country = "FR".to_string();
        let results = service.predict_batch(&batch);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_swap_is_seen_by_later_calls() {
        let (records, first) = trained();
        let first_id = first.artifact_id().to_string();
        let service = InferenceService::new(first);

        let second = TrainingPipeline::default().train_records(&records).unwrap();
        let second_id = second.artifact_id().to_string();
        let snapshot = service.current();

        let previous = service.swap(second);
        assert_eq!(previous.artifact_id(), first_id);
        assert_eq!(service.current().artifact_id(), second_id);
        // an earlier snapshot is untouched
        assert_eq!(snapshot.artifact_id(), first_id);

        let scored = service.score(&records[0], &RiskLevelThresholds::default()).unwrap();
        assert_eq!(scored.artifact_id, second_id);
    }

    #[test]
    fn test_score_attaches_reasons() {
        let (records, artifact) = trained();
        let service = InferenceService::new(artifact);

        let scored = service.score(&records[0], &RiskLevelThresholds::default()).unwrap();
        assert_eq!(scored.name, "customer 0");
        assert_eq!(scored.reasons, explain(&records[0]).reasons());
        assert_eq!(
            scored.risk_level,
            RiskLevel::from_probability(scored.probability_of_churn, &RiskLevelThresholds::default())
        );
    }

    #[test]
    fn test_prediction_wire_names() {
        let json = serde_json::to_value(PredictionResult {
            label: 1,
            probability: 0.75,
        })
        .unwrap();
        assert_eq!(json["prediction"], 1);
        assert_eq!(json["probability_of_churn"], 0.75);
    }
}
