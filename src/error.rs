//! Error types for encoding, training and scoring.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Errors raised by the prediction-consistency core.
#[derive(Debug, Error)]
pub enum ChurnError {
    /// Categorical value absent from the fitted encoder
    #[error("unknown category for {field}: {value:?} was not present at training time")]
    UnknownCategory {
        /// Source column name
        field: String,
        /// Offending raw value
        value: String,
    },

    /// Numeric value that strict coercion refuses to impute
    #[error("malformed record: {field} value {value:?} is not a number")]
    MalformedRecord {
        /// Source column name
        field: String,
        /// Offending raw value
        value: String,
    },

    /// Classifier and encoder registry do not belong together
    #[error("artifact mismatch: {0}")]
    ArtifactMismatch(String),

    /// Batch vectorization failed on a specific row
    #[error("row {row}: {source}")]
    Row {
        /// Zero-based row index in the batch
        row: usize,
        /// Underlying error
        #[source]
        source: Box<ChurnError>,
    },

    /// Training could not proceed
    #[error("training error: {0}")]
    Training(String),

    /// The classifier capability failed
    #[error("classifier error: {0}")]
    Classifier(String),

    /// No artifact has been published to the store yet
    #[error("no artifact found in {0}")]
    NoArtifact(String),

    /// Record ingestion error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChurnError {
    /// Whether the caller sent a record the artifact cannot encode.
    ///
    /// Client errors are rejected back to the sender; everything else is a
    /// fault on the serving side.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::UnknownCategory { .. } | Self::MalformedRecord { .. } => true,
            Self::Row { source, .. } => source.is_client_error(),
            _ => false,
        }
    }

    /// Field and value named by an encoding error, if any.
    pub fn offending_field(&self) -> Option<(&str, &str)> {
        match self {
            Self::UnknownCategory { field, value } | Self::MalformedRecord { field, value } => {
                Some((field.as_str(), value.as_str()))
            }
            Self::Row { source, .. } => source.offending_field(),
            _ => None,
        }
    }

    pub(crate) fn unknown_category(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownCategory {
            field: field.into(),
            value: value.into(),
        }
    }
}
