//! The inference request record

use serde::{Deserialize, Serialize};

/// Island the penguin was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Island {
    Torgersen,
    Biscoe,
    Dream,
}

impl Island {
    pub fn as_str(self) -> &'static str {
        match self {
            Island::Torgersen => "Torgersen",
            Island::Biscoe => "Biscoe",
            Island::Dream => "Dream",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

/// Measurements for one penguin. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenguinFeatures {
    pub bill_length_mm: f64,
    pub bill_depth_mm: f64,
    pub flipper_length_mm: f64,
    pub body_mass_g: f64,
    pub year: i64,
    pub sex: Sex,
    pub island: Island,
}

/// A record the [`FeatureEncoder`](super::FeatureEncoder) can turn into a
/// model row.
pub trait FeatureRecord {
    /// Numeric fields by column name.
    fn numeric(&self) -> Vec<(&'static str, f64)>;

    /// Categorical fields as `(field, value)`; each becomes an indicator
    /// column named `{field}_{value}`.
    fn categorical(&self) -> Vec<(&'static str, &str)>;
}

impl FeatureRecord for PenguinFeatures {
    fn numeric(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("bill_length_mm", self.bill_length_mm),
            ("bill_depth_mm", self.bill_depth_mm),
            ("flipper_length_mm", self.flipper_length_mm),
            ("body_mass_g", self.body_mass_g),
            ("year", self.year as f64),
        ]
    }

    fn categorical(&self) -> Vec<(&'static str, &str)> {
        vec![("sex", self.sex.as_str()), ("island", self.island.as_str())]
    }
}
