//! Model artifact: a classifier and the encoder registry it was trained with

use crate::encoder::EncoderRegistry;
use crate::error::{ChurnError, Result};
use crate::feature_extractor::FEATURE_COUNT;
use crate::models::classifier::LogisticClassifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Blob format understood by this build
pub const FORMAT_VERSION: u32 = 1;

const CLASSIFIER_FILE: &str = "classifier.json";
const ENCODERS_FILE: &str = "encoders.json";
const CURRENT_FILE: &str = "CURRENT";

/// Identity and provenance of an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub artifact_id: String,
    pub trained_at: DateTime<Utc>,
    /// Rows the classifier was fitted on
    pub training_rows: usize,
    /// Accuracy on the held-out split, when one was used
    pub validation_accuracy: Option<f64>,
    pub registry_fingerprint: String,
}

/// Classifier plus encoder registry, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    metadata: ArtifactMetadata,
    classifier: LogisticClassifier,
    registry: EncoderRegistry,
}

impl ModelArtifact {
    /// Pair a freshly fitted classifier with its registry.
    pub fn new(
        classifier: LogisticClassifier,
        registry: EncoderRegistry,
        training_rows: usize,
        validation_accuracy: Option<f64>,
    ) -> Result<Self> {
        check_width(&classifier)?;
        let metadata = ArtifactMetadata {
            artifact_id: uuid::Uuid::new_v4().to_string(),
            trained_at: Utc::now(),
            training_rows,
            validation_accuracy,
            registry_fingerprint: registry.fingerprint(),
        };
        Ok(Self {
            metadata,
            classifier,
            registry,
        })
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    pub fn artifact_id(&self) -> &str {
        &self.metadata.artifact_id
    }

    pub fn classifier(&self) -> &LogisticClassifier {
        &self.classifier
    }

    pub fn registry(&self) -> &EncoderRegistry {
        &self.registry
    }
}

fn check_width(classifier: &LogisticClassifier) -> Result<()> {
    if classifier.input_width() != FEATURE_COUNT {
        return Err(ChurnError::ArtifactMismatch(format!(
            "classifier expects {} features, vectorizer produces {}",
            classifier.input_width(),
            FEATURE_COUNT
        )));
    }
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct ClassifierBlob {
    format_version: u32,
    metadata: ArtifactMetadata,
    classifier: LogisticClassifier,
}

#[derive(Serialize, Deserialize)]
struct EncodersBlob {
    format_version: u32,
    artifact_id: String,
    fingerprint: String,
    registry: EncoderRegistry,
}

/// Directory of versioned artifacts with a `CURRENT` pointer.
///
/// Layout: `<root>/<artifact_id>/{classifier.json,encoders.json}` and
/// `<root>/CURRENT` holding the active id.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `artifact` and make it current.
    ///
    /// Both blobs are written before `CURRENT` is repointed, and the pointer
    /// is replaced by rename, so readers see either the old pair or the new
    /// one. Directories of earlier artifacts are removed afterwards.
    pub fn save(&self, artifact: &ModelArtifact) -> Result<PathBuf> {
        let dir = self.root.join(artifact.artifact_id());
        fs::create_dir_all(&dir)?;

        let classifier = ClassifierBlob {
            format_version: FORMAT_VERSION,
            metadata: artifact.metadata.clone(),
            classifier: artifact.classifier.clone(),
        };
        let encoders = EncodersBlob {
            format_version: FORMAT_VERSION,
            artifact_id: artifact.metadata.artifact_id.clone(),
            fingerprint: artifact.metadata.registry_fingerprint.clone(),
            registry: artifact.registry.clone(),
        };

        write_json(&dir.join(CLASSIFIER_FILE), &classifier)?;
        write_json(&dir.join(ENCODERS_FILE), &encoders)?;

        let pointer_tmp = self.root.join(format!(".{CURRENT_FILE}.tmp"));
        {
            let mut file = fs::File::create(&pointer_tmp)?;
            file.write_all(artifact.artifact_id().as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&pointer_tmp, self.root.join(CURRENT_FILE))?;

        info!(
            artifact_id = %artifact.artifact_id(),
            path = %dir.display(),
            "Artifact published"
        );

        self.prune(artifact.artifact_id());
        Ok(dir)
    }

    /// Id named by the `CURRENT` pointer
    pub fn current_id(&self) -> Result<String> {
        let pointer = self.root.join(CURRENT_FILE);
        match fs::read_to_string(&pointer) {
            Ok(id) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            Ok(_) => Err(ChurnError::NoArtifact(self.root.display().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ChurnError::NoArtifact(self.root.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load the artifact `CURRENT` points to.
    pub fn load_current(&self) -> Result<ModelArtifact> {
        let id = self.current_id()?;
        self.load(&id)
    }

    /// Load both blobs of `artifact_id` and check they belong together.
    pub fn load(&self, artifact_id: &str) -> Result<ModelArtifact> {
        let dir = self.root.join(artifact_id);
        let classifier: ClassifierBlob = read_json(&dir.join(CLASSIFIER_FILE))?;
        let encoders: EncodersBlob = read_json(&dir.join(ENCODERS_FILE))?;

        if classifier.format_version != FORMAT_VERSION || encoders.format_version != FORMAT_VERSION
        {
            return Err(ChurnError::ArtifactMismatch(format!(
                "unsupported format versions {}/{} (expected {FORMAT_VERSION})",
                classifier.format_version, encoders.format_version
            )));
        }
        if classifier.metadata.artifact_id != encoders.artifact_id {
            return Err(ChurnError::ArtifactMismatch(format!(
                "classifier belongs to {} but encoders belong to {}",
                classifier.metadata.artifact_id, encoders.artifact_id
            )));
        }
        let fingerprint = encoders.registry.fingerprint();
        if fingerprint != classifier.metadata.registry_fingerprint
            || fingerprint != encoders.fingerprint
        {
            return Err(ChurnError::ArtifactMismatch(format!(
                "encoder registry fingerprint {fingerprint} does not match the one recorded at training ({})",
                classifier.metadata.registry_fingerprint
            )));
        }
        check_width(&classifier.classifier)?;

        info!(
            artifact_id = %artifact_id,
            trained_at = %classifier.metadata.trained_at,
            "Artifact loaded"
        );

        Ok(ModelArtifact {
            metadata: classifier.metadata,
            classifier: classifier.classifier,
            registry: encoders.registry,
        })
    }

    fn prune(&self, keep: &str) {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Could not list artifact directory for pruning");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() || entry.file_name() == keep {
                continue;
            }
            if !path.join(CLASSIFIER_FILE).exists() {
                continue;
            }
            if let Err(e) = fs::remove_dir_all(&path) {
                warn!(path = %path.display(), error = %e, "Failed to remove old artifact");
            }
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let mut file = fs::File::create(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ChurnError::ArtifactMismatch(format!("{} cannot be decoded: {e}", path.display()))
    })
}
