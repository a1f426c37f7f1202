//! Request -> model row encoding

use std::collections::HashMap;

use ndarray::Array1;

use super::{FeatureRecord, FeatureSchema};

/// One-hot expands categorical fields and aligns the result with the
/// training-time column order.
///
/// Schema columns missing from the expansion are filled with zero and
/// expansion columns the schema does not know are dropped, so a category
/// unseen at training time encodes as "all indicators off" instead of
/// failing the request.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
}

impl FeatureEncoder {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encode one record into a row of `schema.len()` values.
    pub fn encode<R: FeatureRecord + ?Sized>(&self, record: &R) -> Array1<f32> {
        let mut expanded: HashMap<String, f32> = HashMap::new();
        for (name, value) in record.numeric() {
            expanded.insert(name.to_string(), value as f32);
        }
        for (field, value) in record.categorical() {
            expanded.insert(format!("{}_{}", field, value), 1.0);
        }

        self.schema
            .columns()
            .iter()
            .map(|column| expanded.get(column).copied().unwrap_or(0.0))
            .collect()
    }
}
