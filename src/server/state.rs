//! Application state shared across handlers

use crate::inference::InferenceService;

/// Built once at startup and never mutated.
#[derive(Debug)]
pub struct AppState {
    pub service: InferenceService,
}

impl AppState {
    pub fn new(service: InferenceService) -> Self {
        Self { service }
    }
}
