//! Model metadata: feature schema and label mapping
//!
//! Both come from the encoders document written at training time:
//!
//! ```json
//! {
//!   "feature_columns": ["bill_length_mm", "...", "island_Torgersen"],
//!   "label_encoder": {"Adelie": "0", "Chinstrap": "1", "Gentoo": "2"}
//! }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid metadata JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("feature_columns is empty")]
    EmptySchema,

    #[error("feature column {0:?} appears more than once")]
    DuplicateColumn(String),

    #[error("label_encoder is empty")]
    EmptyLabels,

    #[error("label index {index} is used by both {first:?} and {second:?}")]
    DuplicateLabelIndex {
        index: usize,
        first: String,
        second: String,
    },

    #[error("label indices must be dense from 0; no class has index {0}")]
    MissingLabelIndex(usize),
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct EncodersDocument {
    feature_columns: Vec<String>,
    #[serde_as(as = "BTreeMap<_, PickFirst<(_, DisplayFromStr)>>")]
    label_encoder: BTreeMap<String, usize>,
}

/// Ordered column names of the model input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self, MetadataError> {
        if columns.is_empty() {
            return Err(MetadataError::EmptySchema);
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(MetadataError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Class names indexed by the model's class index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMapping {
    classes: Vec<String>,
}

impl LabelMapping {
    /// Invert a class-name -> index table. Indices must cover `0..n` exactly.
    pub fn from_encoder(encoder: BTreeMap<String, usize>) -> Result<Self, MetadataError> {
        if encoder.is_empty() {
            return Err(MetadataError::EmptyLabels);
        }

        let mut slots: Vec<Option<String>> = vec![None; encoder.len()];
        for (name, index) in encoder {
            // An index past the end leaves a hole below it, reported after the loop.
            let Some(slot) = slots.get_mut(index) else {
                continue;
            };
            if let Some(first) = slot.take() {
                return Err(MetadataError::DuplicateLabelIndex {
                    index,
                    first,
                    second: name,
                });
            }
            *slot = Some(name);
        }

        let classes = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.ok_or(MetadataError::MissingLabelIndex(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { classes })
    }

    pub fn class_name(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

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

/// Feature schema plus label mapping, loaded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMetadata {
    pub schema: FeatureSchema,
    pub labels: LabelMapping,
}

impl ModelMetadata {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MetadataError> {
        let doc: EncodersDocument = serde_json::from_slice(bytes)?;
        Ok(Self {
            schema: FeatureSchema::new(doc.feature_columns)?,
            labels: LabelMapping::from_encoder(doc.label_encoder)?,
        })
    }
}
