//! Feature vectorization for churn model training and inference.
//!
//! This is the only place a `CustomerRecord` becomes model input. The
//! training job and the scoring service both go through it, so the column
//! order and the imputation rules cannot drift apart.

use crate::encoder::EncoderRegistry;
use crate::error::{ChurnError, Result};
use crate::types::{CategoricalField, CustomerRecord, NumericField};
use ndarray::Array2;
use serde::Deserialize;

/// Number of model input columns.
pub const FEATURE_COUNT: usize = 8;

/// Model input columns, in order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Gender",
    "Income",
    "Age",
    "Country",
    "Total_Amount",
    "Feedback",
    "Order_Status",
    "Ratings",
];

#[derive(Debug, Clone, Copy)]
enum Column {
    Categorical(CategoricalField),
    Numeric(NumericField),
}

const COLUMNS: [Column; FEATURE_COUNT] = [
    Column::Categorical(CategoricalField::Gender),
    Column::Categorical(CategoricalField::Income),
    Column::Numeric(NumericField::Age),
    Column::Categorical(CategoricalField::Country),
    Column::Numeric(NumericField::TotalAmount),
    Column::Categorical(CategoricalField::Feedback),
    Column::Categorical(CategoricalField::OrderStatus),
    Column::Numeric(NumericField::Ratings),
];

/// How numeric cells that fail to parse are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionMode {
    /// Unparseable or missing numerics become 0.0, as in training
    #[default]
    Lenient,
    /// Present but unparseable numerics are rejected
    Strict,
}

/// Encoded model input for one customer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Value of a named column
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.0[idx])
    }

    /// Little-endian bytes of every value, for exact comparisons
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

/// Turns raw customer records into model input.
///
/// Holds no state besides the coercion mode; the encoder registry is passed
/// in by the caller and never mutated.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureVectorizer {
    mode: CoercionMode,
}

impl FeatureVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: CoercionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> CoercionMode {
        self.mode
    }

    /// Encode one record.
    pub fn vectorize(
        &self,
        record: &CustomerRecord,
        registry: &EncoderRegistry,
    ) -> Result<FeatureVector> {
        let mut values = [0.0; FEATURE_COUNT];

        for (slot, column) in values.iter_mut().zip(COLUMNS) {
            *slot = match column {
                Column::Categorical(field) => {
                    f64::from(registry.transform(field, record.categorical(field))?)
                }
                Column::Numeric(field) => {
                    let cell = record.numeric(field);
                    match self.mode {
                        CoercionMode::Lenient => cell.value(),
                        CoercionMode::Strict => cell.strict(field)?,
                    }
                }
            };
        }

        Ok(FeatureVector(values))
    }

    /// Encode a batch into an `n x 8` matrix; the first failing row aborts.
    pub fn vectorize_batch(
        &self,
        records: &[CustomerRecord],
        registry: &EncoderRegistry,
    ) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((records.len(), FEATURE_COUNT));

        for (row, record) in records.iter().enumerate() {
            let vector = self
                .vectorize(record, registry)
                .map_err(|source| ChurnError::Row {
                    row,
                    source: Box::new(source),
                })?;
            for (col, value) in vector.as_slice().iter().enumerate() {
                matrix[[row, col]] = *value;
            }
        }

        Ok(matrix)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names, in model column order.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}
