//! Categorical encoders shared by training and inference.
//!
//! Codes are dense and assigned in sorted value order, so refitting on the
//! same corpus reproduces the same codes. A value outside the fitted domain
//! is an error; there is no fallback code.

use crate::error::{ChurnError, Result};
use crate::types::{CategoricalField, CustomerRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// Label encoder for one categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EncoderState")]
pub struct CategoryEncoder {
    field: CategoricalField,
    /// Fitted domain; the position of a value is its code
    classes: Vec<String>,
}

#[derive(Deserialize)]
struct EncoderState {
    field: CategoricalField,
    classes: Vec<String>,
}

impl TryFrom<EncoderState> for CategoryEncoder {
    type Error = ChurnError;

    fn try_from(state: EncoderState) -> Result<Self> {
        if state.classes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ChurnError::ArtifactMismatch(format!(
                "encoder for {} has unsorted or duplicate classes",
                state.field
            )));
        }
        Ok(Self {
            field: state.field,
            classes: state.classes,
        })
    }
}

impl CategoryEncoder {
    /// Fit an encoder over every value observed for `field`.
    pub fn fit<I, S>(field: CategoricalField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        Self {
            field,
            classes: classes.into_iter().collect(),
        }
    }

    /// Code of a fitted value.
    pub fn transform(&self, value: &str) -> Result<u32> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map(|idx| idx as u32)
            .map_err(|_| ChurnError::unknown_category(self.field.name(), value))
    }

    /// Value behind a code.
    pub fn inverse_transform(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    pub fn field(&self) -> CategoricalField {
        self.field
    }

    /// Fitted domain in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// One encoder per categorical field, persisted and loaded as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RegistryState")]
pub struct EncoderRegistry {
    encoders: BTreeMap<CategoricalField, CategoryEncoder>,
}

#[derive(Deserialize)]
struct RegistryState {
    encoders: BTreeMap<CategoricalField, CategoryEncoder>,
}

impl TryFrom<RegistryState> for EncoderRegistry {
    type Error = ChurnError;

    fn try_from(state: RegistryState) -> Result<Self> {
        for field in CategoricalField::ALL {
            match state.encoders.get(&field) {
                None => {
                    return Err(ChurnError::ArtifactMismatch(format!(
                        "encoder registry has no encoder for {field}"
                    )))
                }
                Some(encoder) if encoder.field != field => {
                    return Err(ChurnError::ArtifactMismatch(format!(
                        "encoder stored under {field} was fitted for {}",
                        encoder.field
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(Self {
            encoders: state.encoders,
        })
    }
}

impl EncoderRegistry {
    /// Fit every categorical encoder over the full training corpus.
    pub fn fit(records: &[CustomerRecord]) -> Self {
        let encoders = CategoricalField::ALL
            .into_iter()
            .map(|field| {
                let values = records.iter().map(|r| r.categorical(field));
                (field, CategoryEncoder::fit(field, values))
            })
            .collect();

        Self { encoders }
    }

    /// Code for `value` of `field`; unseen values name the field and value.
    pub fn transform(&self, field: CategoricalField, value: &str) -> Result<u32> {
        self.encoder(field)?.transform(value)
    }

    pub fn encoder(&self, field: CategoricalField) -> Result<&CategoryEncoder> {
        self.encoders.get(&field).ok_or_else(|| {
            ChurnError::ArtifactMismatch(format!("encoder registry has no encoder for {field}"))
        })
    }

    /// SHA-256 over fields and classes in canonical order, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"churn-encoder-registry-v1\n");
        for (field, encoder) in &self.encoders {
            hasher.update(field.name().as_bytes());
            hasher.update((encoder.classes.len() as u64).to_le_bytes());
            for class in &encoder.classes {
                hasher.update((class.len() as u64).to_le_bytes());
                hasher.update(class.as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}
