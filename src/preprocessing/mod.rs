//! Data preprocessing module
//!
//! Turns validated requests into model input rows:
//! - Request record types ([`PenguinFeatures`])
//! - Feature schema and label mapping loaded with the model
//! - Indicator expansion and schema alignment ([`FeatureEncoder`])

mod encoder;
mod features;
mod metadata;

pub use encoder::FeatureEncoder;
pub use features::{FeatureRecord, Island, PenguinFeatures, Sex};
pub use metadata::{FeatureSchema, LabelMapping, MetadataError, ModelMetadata};
