//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::inference::PredictError;

/// One entry of a 422 `detail` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path to the offending value, starting with `"body"`.
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn body(msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: vec!["body".to_string()],
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    pub fn field(field: &str, msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: vec!["body".to_string(), field.to_string()],
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("request validation failed ({} errors)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("model not ready")]
    NotReady,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("not found")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,
}

impl From<PredictError> for ServerError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::NotReady => ServerError::NotReady,
            PredictError::Internal(detail) => ServerError::Internal(detail),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ServerError::Validation(errors) => {
                tracing::debug!(errors = errors.len(), "Rejected invalid request body");
                (StatusCode::UNPROCESSABLE_ENTITY, json!(errors))
            }
            ServerError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, json!("Model not ready")),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal prediction error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("Internal prediction error"),
                )
            }
            ServerError::NotFound => (StatusCode::NOT_FOUND, json!("Not Found")),
            ServerError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, json!("Method Not Allowed"))
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
