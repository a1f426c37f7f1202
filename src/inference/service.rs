//! Inference service implementation

use std::sync::Arc;

use ndarray::ArrayView1;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::booster::{argmax, Booster, ModelOutput};
use crate::loader::{LoadOutcome, LoadSource, LoadedModel};
use crate::preprocessing::{FeatureEncoder, FeatureRecord, LabelMapping, ModelMetadata};

/// Anything that can score an encoded row.
///
/// [`Booster`] is the production implementation; the trait is the seam where
/// tests substitute a failing model.
pub trait Predictor: Send + Sync {
    fn predict(&self, row: ArrayView1<'_, f32>) -> anyhow::Result<ModelOutput>;
}

impl Predictor for Booster {
    fn predict(&self, row: ArrayView1<'_, f32>) -> anyhow::Result<ModelOutput> {
        Ok(self.predict_row(row)?)
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("model not ready")]
    NotReady,

    /// Carries the detail for server-side logging only.
    #[error("internal prediction error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Ok,
    Degraded,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: Readiness,
    pub source: LoadSource,
}

/// A successful prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub class_index: usize,
    pub species: String,
}

struct ReadyModel {
    predictor: Arc<dyn Predictor>,
    encoder: FeatureEncoder,
    labels: LabelMapping,
}

/// Holds the loaded model for the life of the process.
///
/// Readiness is fixed at construction: a ready service never becomes
/// unready, and a degraded one stays degraded until restart. Everything
/// inside is read-only, so a shared reference serves any number of
/// concurrent requests without locking.
pub struct InferenceService {
    model: Option<ReadyModel>,
    source: LoadSource,
}

impl std::fmt::Debug for InferenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceService")
            .field("ready", &self.is_ready())
            .field("source", &self.source)
            .field("n_features", &self.model.as_ref().map(|m| m.encoder.schema().len()))
            .finish()
    }
}

impl InferenceService {
    /// A service that serves `predictor` with the given metadata.
    pub fn ready(predictor: Arc<dyn Predictor>, metadata: ModelMetadata, source: LoadSource) -> Self {
        Self {
            model: Some(ReadyModel {
                predictor,
                encoder: FeatureEncoder::new(metadata.schema),
                labels: metadata.labels,
            }),
            source,
        }
    }

    /// A service with no model; every prediction fails with `NotReady`.
    pub fn not_ready() -> Self {
        Self {
            model: None,
            source: LoadSource::Unknown,
        }
    }

    pub fn from_loaded(model: LoadedModel, source: LoadSource) -> Self {
        Self::ready(Arc::new(model.booster), model.metadata, source)
    }

    pub fn from_outcome(outcome: LoadOutcome) -> Self {
        match outcome {
            LoadOutcome::Ready { model, source } => Self::from_loaded(model, source),
            LoadOutcome::Degraded { .. } => Self::not_ready(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn source(&self) -> LoadSource {
        self.source
    }

    /// Class names the model can return, empty when not ready.
    pub fn classes(&self) -> &[String] {
        self.model.as_ref().map(|m| m.labels.classes()).unwrap_or(&[])
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: if self.is_ready() {
                Readiness::Ok
            } else {
                Readiness::Degraded
            },
            source: self.source,
        }
    }

    /// Encode, score and label one record.
    pub fn predict<R: FeatureRecord + ?Sized>(&self, record: &R) -> Result<Prediction, PredictError> {
        let model = self.model.as_ref().ok_or(PredictError::NotReady)?;

        let row = model.encoder.encode(record);
        let output = model
            .predictor
            .predict(row.view())
            .map_err(|e| PredictError::Internal(format!("model call failed: {:#}", e)))?;

        let class_index = select_class(&output)?;
        let species = model
            .labels
            .class_name(class_index)
            .ok_or_else(|| {
                PredictError::Internal(format!(
                    "class index {} outside label mapping of {} classes",
                    class_index,
                    model.labels.len()
                ))
            })?
            .to_string();

        debug!(class_index, species = %species, "Prediction complete");
        Ok(Prediction {
            class_index,
            species,
        })
    }
}

/// Turn raw model output into a class index.
///
/// Score vectors must be finite and pick the highest score. Scalars are
/// already a class (or a probability of class 1) and are rounded to the
/// nearest integer.
pub fn select_class(output: &ModelOutput) -> Result<usize, PredictError> {
    match output {
        ModelOutput::Scores(scores) => {
            if scores.is_empty() {
                return Err(PredictError::Internal("model returned no scores".to_string()));
            }
            if scores.iter().any(|s| !s.is_finite()) {
                return Err(PredictError::Internal(format!(
                    "model returned non-finite scores {}",
                    scores
                )));
            }
            let scores = scores.to_vec();
            Ok(argmax(&scores))
        }
        ModelOutput::Scalar(value) => {
            if !value.is_finite() || *value < 0.0 {
                return Err(PredictError::Internal(format!(
                    "model returned {} which is not a class index",
                    value
                )));
            }
            Ok(value.round() as usize)
        }
    }
}
