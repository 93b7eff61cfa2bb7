//! Scored customer events and responses published by the service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk band derived from the churn probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Determine risk band from probability and thresholds
    pub fn from_probability(probability: f64, thresholds: &RiskLevelThresholds) -> Self {
        if probability >= thresholds.critical {
            RiskLevel::Critical
        } else if probability >= thresholds.high {
            RiskLevel::High
        } else if probability >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Lower bounds of each band above `low`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            medium: 0.5,
            high: 0.7,
            critical: 0.9,
        }
    }
}

/// Event published for every record the service scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCustomer {
    /// Unique event identifier
    pub score_id: String,

    pub name: String,

    pub email: String,

    /// Predicted label (1 = churn)
    pub prediction: u8,

    /// Probability of the churn class
    pub probability_of_churn: f64,

    pub risk_level: RiskLevel,

    /// Rule-based explanation, independent of the model
    pub reasons: Vec<String>,

    /// Artifact that produced the prediction
    pub artifact_id: String,

    pub scored_at: DateTime<Utc>,
}

impl ScoredCustomer {
    pub fn new(
        name: String,
        email: String,
        prediction: u8,
        probability_of_churn: f64,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            score_id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            prediction,
            probability_of_churn,
            risk_level,
            reasons: Vec::new(),
            artifact_id: String::new(),
            scored_at: Utc::now(),
        }
    }

    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.reasons = reasons;
        self
    }

    pub fn with_artifact(mut self, artifact_id: String) -> Self {
        self.artifact_id = artifact_id;
        self
    }
}

/// Reply sent back to a requester whose record was rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl From<&crate::error::ChurnError> for ErrorResponse {
    fn from(err: &crate::error::ChurnError) -> Self {
        let (field, value) = match err.offending_field() {
            Some((field, value)) => (Some(field.to_string()), Some(value.to_string())),
            None => (None, None),
        };
        Self {
            error: err.to_string(),
            field,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChurnError;

    #[test]
    fn test_risk_level_from_probability() {
        let thresholds = RiskLevelThresholds::default();

        assert_eq!(RiskLevel::from_probability(0.1, &thresholds), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.5, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.75, &thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.95, &thresholds), RiskLevel::Critical);
    }

    #[test]
    fn test_scored_customer_serialization() {
        let scored = ScoredCustomer::new(
            "Ann".to_string(),
            "ann@example.com".to_string(),
            1,
            0.82,
            RiskLevel::High,
        )
        .with_reasons(vec!["Low rating (3)".to_string()]);

        let json = serde_json::to_string(&scored).unwrap();
        assert!(json.contains(r#""risk_level":"high""#));

        let deserialized: ScoredCustomer = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.score_id, scored.score_id);
        assert_eq!(deserialized.reasons, scored.reasons);
    }

    #[test]
    fn test_error_response_names_field() {
        let err = ChurnError::UnknownCategory {
            field: "Country".to_string(),
            value: "FR".to_string(),
        };
        let response = ErrorResponse::from(&err);

        assert_eq!(response.field.as_deref(), Some("Country"));
        assert_eq!(response.value.as_deref(), Some("FR"));
    }
}
