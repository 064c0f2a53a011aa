//! Health check handlers

use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub storage: String,
    pub current_date: NaiveDate,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let session = state.session.lock().await;
    // Check the data directory is still there
    let storage = if session.store().inner().root().is_dir() {
        "available".to_string()
    } else {
        "unavailable".to_string()
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        storage,
        current_date: session.current_date(),
    })
}
