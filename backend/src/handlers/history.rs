//! HTTP handlers for past ledgers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{AppError, AppResult};
use crate::services::inventory::{ArchivedLedger, HistoryEntry, InventoryService};
use crate::AppState;

/// Dates with a stored ledger in the last thirty days
pub async fn list_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    let service = InventoryService::new(state.session, state.exporter);
    Json(service.history().await)
}

/// A past ledger, addressed as YYYY-MM-DD
pub async fn get_archived_ledger(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> AppResult<Json<ArchivedLedger>> {
    let date = shared::parse_date_key(&date).map_err(|message| AppError::Validation {
        field: "date".to_string(),
        message: message.to_string(),
    })?;
    let service = InventoryService::new(state.session, state.exporter);
    Ok(Json(service.archived(date).await?))
}
