//! Binary churn classifier backed by linfa's logistic regression

use crate::error::{ChurnError, Result};
use crate::feature_extractor::FeatureVector;
use linfa::prelude::*;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decision threshold on the churn probability
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Fit-time hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Maximum optimizer iterations
    pub max_iterations: u64,
    /// L2 regularization strength
    pub alpha: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            alpha: 1.0,
        }
    }
}

/// Fitted classifier state.
///
/// Columns are standardized with statistics learned at fit time; the
/// weights apply to standardized input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    means: Vec<f64>,
    scales: Vec<f64>,
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticClassifier {
    /// Fit on an `n x d` matrix with 0/1 labels.
    pub fn fit(x: &Array2<f64>, y: &Array1<usize>, params: &ClassifierParams) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(ChurnError::Training("cannot fit on an empty matrix".to_string()));
        }
        if x.nrows() != y.len() {
            return Err(ChurnError::Training(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }

        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ChurnError::Training("cannot fit on an empty matrix".to_string()))?;
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        let standardized = (x - &means) / &scales;

        let dataset = Dataset::new(standardized, y.clone());
        let model = LogisticRegression::default()
            .alpha(params.alpha)
            .max_iterations(params.max_iterations)
            .fit(&dataset)
            .map_err(|e| ChurnError::Classifier(e.to_string()))?;

        // linfa's positive class is the more frequent label; store weights
        // for P(label = 1) either way
        let sign = if model.labels().pos.class == 1 { 1.0 } else { -1.0 };
        let classifier = Self {
            means: means.to_vec(),
            scales: scales.to_vec(),
            weights: model.params().iter().map(|w| sign * w).collect(),
            intercept: sign * model.intercept(),
        };

        debug!(
            rows = x.nrows(),
            features = x.ncols(),
            intercept = classifier.intercept,
            "Logistic classifier fitted"
        );

        Ok(classifier)
    }

    /// Number of input columns the classifier was fitted on
    pub fn input_width(&self) -> usize {
        self.weights.len()
    }

    /// Probability of the churn class for one feature row
    pub fn predict_proba_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let logit = row
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .zip(&self.weights)
            .map(|(((x, mean), scale), weight)| (x - mean) / scale * weight)
            .sum::<f64>()
            + self.intercept;

        sigmoid(logit)
    }

    /// Probability of the churn class
    pub fn predict_proba(&self, features: &FeatureVector) -> f64 {
        self.predict_proba_row(ArrayView1::from(features.as_slice()))
    }

    /// Predicted label (1 = churn)
    pub fn predict(&self, features: &FeatureVector) -> u8 {
        label_for(self.predict_proba(features))
    }

    /// Fraction of rows whose predicted label matches `y`
    pub fn accuracy(&self, x: &Array2<f64>, y: &Array1<usize>) -> f64 {
        if x.nrows() == 0 {
            return 0.0;
        }
        let correct = x
            .outer_iter()
            .zip(y.iter())
            .filter(|(row, &label)| usize::from(label_for(self.predict_proba_row(row.view()))) == label)
            .count();
        correct as f64 / x.nrows() as f64
    }
}

/// Label for a churn probability
pub fn label_for(probability: f64) -> u8 {
    u8::from(probability >= DECISION_THRESHOLD)
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
