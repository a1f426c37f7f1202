//! Objective-dependent output transforms.

use ndarray::Array1;

use super::{ModelError, ModelOutput};

/// Objectives the service can serve, grouped by how the margin is turned
/// into a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// `multi:softprob`: per-class probabilities.
    SoftProb,
    /// `multi:softmax`: winning class index as a scalar.
    SoftMax,
    /// `binary:logistic`, `reg:logistic`: sigmoid of the margin.
    Logistic,
    /// `binary:hinge`: 0 or 1.
    Hinge,
    /// `binary:logitraw`: the margin itself, with a logit base score.
    LogitRaw,
    /// Regression objectives: the margin itself.
    Raw,
}

impl Objective {
    pub fn from_name(name: &str) -> Result<Self, ModelError> {
        match name {
            "multi:softprob" => Ok(Self::SoftProb),
            "multi:softmax" => Ok(Self::SoftMax),
            "binary:logistic" | "reg:logistic" => Ok(Self::Logistic),
            "binary:hinge" => Ok(Self::Hinge),
            "binary:logitraw" => Ok(Self::LogitRaw),
            "reg:squarederror" | "reg:linear" | "reg:absoluteerror" => Ok(Self::Raw),
            other => Err(ModelError::UnsupportedObjective(other.to_string())),
        }
    }

    pub fn is_multiclass(self) -> bool {
        matches!(self, Self::SoftProb | Self::SoftMax)
    }

    /// Convert `base_score` from output space into margin space.
    pub fn base_margin(self, base_score: f32) -> f32 {
        match self {
            Self::Logistic | Self::LogitRaw => {
                let p = base_score.clamp(1e-7, 1.0 - 1e-7);
                (p / (1.0 - p)).ln()
            }
            _ => base_score,
        }
    }

    /// Apply the output transform to the per-group margins.
    pub fn transform(self, margins: Array1<f32>) -> ModelOutput {
        match self {
            Self::SoftProb => ModelOutput::Scores(softmax(margins)),
            Self::SoftMax => ModelOutput::Scalar(argmax(margins.as_slice().unwrap_or(&[])) as f32),
            Self::Logistic => ModelOutput::Scalar(sigmoid(first(&margins))),
            Self::Hinge => ModelOutput::Scalar(if first(&margins) > 0.0 { 1.0 } else { 0.0 }),
            Self::LogitRaw | Self::Raw => ModelOutput::Scalar(first(&margins)),
        }
    }
}

fn first(margins: &Array1<f32>) -> f32 {
    margins.get(0).copied().unwrap_or(f32::NAN)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(margins: Array1<f32>) -> Array1<f32> {
    let max = margins.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let exp = margins.mapv(|x| (x - max).exp());
    let sum = exp.sum();
    exp / sum
}

/// Index of the first maximum, skipping NaN. An all-NaN slice yields its
/// last index, so callers must check scores are finite first.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] || values[best].is_nan() {
            best = i;
        }
    }
    best
}
