//! HTTP request handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::inference::HealthStatus;
use crate::preprocessing::{Island, PenguinFeatures, Sex};

use super::error::{FieldError, Result, ServerError};
use super::state::AppState;

pub const WELCOME_MESSAGE: &str = "Hello! Welcome to the Penguins Classification API.";

// ============================================================================
// Request validation
// ============================================================================

#[derive(Clone, Copy)]
enum FieldKind {
    Number,
    Integer,
    Sex,
    Island,
}

impl FieldKind {
    /// The value in the form the record deserializes, or `None` if rejected.
    fn coerce(self, value: &Value) -> Option<Value> {
        let accepted = match self {
            FieldKind::Number => parses::<f64>(value),
            FieldKind::Integer => return integral(value).map(Value::from),
            FieldKind::Sex => parses::<Sex>(value),
            FieldKind::Island => parses::<Island>(value),
        };
        accepted.then(|| value.clone())
    }

    fn rejection(self) -> (&'static str, &'static str) {
        match self {
            FieldKind::Number => ("Input should be a valid number", "float_type"),
            FieldKind::Integer => ("Input should be a valid integer", "int_type"),
            FieldKind::Sex => ("Input should be 'male' or 'female'", "enum"),
            FieldKind::Island => ("Input should be 'Torgersen', 'Biscoe' or 'Dream'", "enum"),
        }
    }
}

fn parses<T: DeserializeOwned>(value: &Value) -> bool {
    T::deserialize(value).is_ok()
}

/// Integers, plus floats with no fractional part (`2008.0`).
fn integral(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then(|| f as i64)
}

/// Request fields in wire order.
const FIELDS: [(&str, FieldKind); 7] = [
    ("bill_length_mm", FieldKind::Number),
    ("bill_depth_mm", FieldKind::Number),
    ("flipper_length_mm", FieldKind::Number),
    ("body_mass_g", FieldKind::Number),
    ("year", FieldKind::Integer),
    ("sex", FieldKind::Sex),
    ("island", FieldKind::Island),
];

/// Validate a raw request body, collecting every field error rather than
/// stopping at the first. Unknown extra keys are ignored.
pub fn parse_features(body: &[u8]) -> std::result::Result<PenguinFeatures, Vec<FieldError>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| vec![FieldError::body(format!("JSON decode error: {}", e), "json_invalid")])?;

    let mut map: Map<String, Value> = match value {
        Value::Object(map) => map,
        _ => {
            return Err(vec![FieldError::body(
                "Input should be a valid dictionary or object",
                "model_attributes_type",
            )])
        }
    };

    let mut errors = Vec::new();
    for (name, kind) in FIELDS {
        let Some(raw) = map.get(name) else {
            errors.push(FieldError::field(name, "Field required", "missing"));
            continue;
        };
        match kind.coerce(raw) {
            Some(value) => {
                map.insert(name.to_string(), value);
            }
            None => {
                let (msg, code) = kind.rejection();
                errors.push(FieldError::field(name, msg, code));
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value(Value::Object(map))
        .map_err(|e| vec![FieldError::body(e.to_string(), "value_error")])
}

/// Extractor for a fully validated prediction request body.
///
/// Rejects with a 422 listing every problem found.
pub struct ValidatedFeatures(pub PenguinFeatures);

#[axum::async_trait]
impl<S> FromRequest<S> for ValidatedFeatures
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ServerError::Validation(vec![FieldError::body(e.body_text(), "body_read")]))?;

        parse_features(&body)
            .map(ValidatedFeatures)
            .map_err(ServerError::Validation)
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn root() -> Json<Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(state.service.health())
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub species: String,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    ValidatedFeatures(features): ValidatedFeatures,
) -> Result<Json<PredictResponse>> {
    let prediction = state.service.predict(&features)?;

    info!(
        island = features.island.as_str(),
        sex = features.sex.as_str(),
        species = %prediction.species,
        "Prediction served"
    );
    Ok(Json(PredictResponse {
        species: prediction.species,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Value {
        json!({
            "bill_length_mm": 40.0,
            "bill_depth_mm": 18.0,
            "flipper_length_mm": 195,
            "body_mass_g": 4000,
            "year": 2008,
            "sex": "male",
            "island": "Biscoe"
        })
    }

    fn body(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn test_valid_body_parses() {
        let features = parse_features(&body(&valid())).unwrap();
        assert_eq!(features.island, Island::Biscoe);
        assert_eq!(features.year, 2008);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let mut value = valid();
        value["comment"] = json!("seen at dawn");
        assert!(parse_features(&body(&value)).is_ok());
    }

    #[test]
    fn test_empty_object_lists_every_field() {
        let errors = parse_features(b"{}").unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.loc[1].as_str()).collect();
        assert_eq!(fields, FIELDS.iter().map(|(name, _)| *name).collect::<Vec<_>>());
        assert!(errors.iter().all(|e| e.kind == "missing"));
    }

    #[test]
    fn test_all_bad_fields_reported() {
        let mut value = valid();
        value["bill_length_mm"] = json!("long");
        value["year"] = json!(2008.5);
        value["sex"] = json!("Male");
        value["island"] = json!("Atlantis");

        let errors = parse_features(&body(&value)).unwrap_err();
        let summary: Vec<(&str, &str)> = errors
            .iter()
            .map(|e| (e.loc[1].as_str(), e.kind.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("bill_length_mm", "float_type"),
                ("year", "int_type"),
                ("sex", "enum"),
                ("island", "enum"),
            ]
        );
    }

    #[test]
    fn test_integral_float_year_accepted() {
        let mut value = valid();
        value["year"] = json!(2008.0);
        assert_eq!(parse_features(&body(&value)).unwrap().year, 2008);

        value["year"] = json!(1e30);
        let errors = parse_features(&body(&value)).unwrap_err();
        assert_eq!(errors[0].kind, "int_type");

        value["year"] = json!("2008");
        assert!(parse_features(&body(&value)).is_err());
    }

    #[test]
    fn test_null_is_rejected() {
        let mut value = valid();
        value["body_mass_g"] = Value::Null;
        let errors = parse_features(&body(&value)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].loc, vec!["body", "body_mass_g"]);
    }

    #[test]
    fn test_malformed_and_non_object_bodies() {
        let errors = parse_features(b"{\"bill_length_mm\": ").unwrap_err();
        assert_eq!(errors[0].kind, "json_invalid");
        assert_eq!(errors[0].loc, vec!["body"]);

        let errors = parse_features(b"[1, 2, 3]").unwrap_err();
        assert_eq!(errors[0].kind, "model_attributes_type");

        let errors = parse_features(b"").unwrap_err();
        assert_eq!(errors[0].kind, "json_invalid");
    }
}
