//! Trained classifier loaded from a JSON artifact.
//!
//! The artifact describes a multinomial logistic regression: one row of
//! coefficients and one intercept per class, applied to the subset of
//! `feature1..feature5` listed under `features`. Probabilities are the
//! softmax of the class scores.

use common::{ModelInfo, FEATURE_NAMES};
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{InferenceError, ModelLoadError};

pub const SUPPORTED_MODEL_TYPE: &str = "multinomial_logistic_regression";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelArtifact {
    model_type: String,
    #[serde(default = "default_version")]
    version: String,
    features: Vec<String>,
    classes: Vec<i64>,
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

fn default_version() -> String {
    "unversioned".to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: i64,
    pub probabilities: Vec<f64>,
}

/// The loaded model plus its metadata. Read-only once built.
#[derive(Debug)]
pub struct ModelHandle {
    weights: Array2<f64>,
    intercepts: Array1<f64>,
    classes: Vec<i64>,
    /// Positions in the declared feature order, one per weight column.
    columns: Vec<usize>,
    info: ModelInfo,
}

impl ModelHandle {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ModelArtifact =
            serde_json::from_slice(&contents).map_err(|source| ModelLoadError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_artifact(artifact, path).map_err(|reason| ModelLoadError::Invalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn from_artifact(artifact: ModelArtifact, path: &Path) -> Result<Self, String> {
        if artifact.model_type != SUPPORTED_MODEL_TYPE {
            return Err(format!("unsupported model type {:?}", artifact.model_type));
        }

        let n_classes = artifact.classes.len();
        let n_features = artifact.features.len();
        if n_classes < 2 {
            return Err(format!("expected at least 2 classes, found {}", n_classes));
        }
        if n_features == 0 {
            return Err("model consumes no features".to_string());
        }

        let mut seen = artifact.classes.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != n_classes {
            return Err("class labels must be unique".to_string());
        }

        let columns = artifact
            .features
            .iter()
            .map(|name| {
                FEATURE_NAMES
                    .iter()
                    .position(|known| *known == name.as_str())
                    .ok_or_else(|| format!("unknown feature {:?}", name))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if artifact.coefficients.len() != n_classes {
            return Err(format!(
                "{} coefficient rows for {} classes",
                artifact.coefficients.len(),
                n_classes
            ));
        }
        if let Some(row) = artifact.coefficients.iter().find(|row| row.len() != n_features) {
            return Err(format!(
                "coefficient row has {} entries for {} features",
                row.len(),
                n_features
            ));
        }
        if artifact.intercepts.len() != n_classes {
            return Err(format!(
                "{} intercepts for {} classes",
                artifact.intercepts.len(),
                n_classes
            ));
        }

        let flat: Vec<f64> = artifact.coefficients.into_iter().flatten().collect();
        if flat.iter().chain(&artifact.intercepts).any(|v| !v.is_finite()) {
            return Err("parameters must be finite".to_string());
        }
        let weights = Array2::from_shape_vec((n_classes, n_features), flat)
            .map_err(|e| format!("coefficient matrix: {}", e))?;

        let info = ModelInfo {
            model_type: artifact.model_type,
            version: artifact.version,
            path: path.display().to_string(),
            features: artifact.features,
            classes: artifact.classes.clone(),
            class_count: n_classes,
        };

        Ok(Self {
            weights,
            intercepts: Array1::from(artifact.intercepts),
            classes: artifact.classes,
            columns,
            info,
        })
    }

    pub fn metadata(&self) -> &ModelInfo {
        &self.info
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn predict_proba(&self, features: &[f64; 5]) -> Result<Vec<f64>, InferenceError> {
        let x: Array1<f64> = self.columns.iter().map(|&i| features[i]).collect();
        if x.len() != self.weights.ncols() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.weights.ncols(),
                actual: x.len(),
            });
        }

        let scores = (self.weights.dot(&x) + &self.intercepts).to_vec();
        let probabilities = softmax(&scores);

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::NonFinite(probabilities));
        }
        Ok(probabilities)
    }

    pub fn predict(&self, features: &[f64; 5]) -> Result<Prediction, InferenceError> {
        let probabilities = self.predict_proba(features)?;
        let best = argmax(&probabilities);
        Ok(Prediction {
            label: self.classes[best],
            probabilities,
        })
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

// First index wins on ties.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_value), (i, &v)| {
            if v > best_value {
                (i, v)
            } else {
                (best, best_value)
            }
        })
        .0
}

/// Location of the bundled iris model, relative to the workspace root.
pub fn bundled_model_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(common::config::DEFAULT_MODEL_PATH)
}
