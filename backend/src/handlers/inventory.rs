//! HTTP handlers for the daily ledger endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shared::{DayEndOutcome, ImportMode, InventoryStats, LedgerRow, MedicineId, MedicineRecord, MedicineUpdate};

use crate::error::{AppError, AppResult};
use crate::services::inventory::{ImportSummary, InventoryService, LedgerView, WithNotifications};
use crate::AppState;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    #[serde(default = "default_import_mode")]
    pub mode: ImportMode,
}

fn default_import_mode() -> ImportMode {
    ImportMode::Replace
}

/// Today's ledger
pub async fn get_ledger(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Json<LedgerView> {
    let service = InventoryService::new(state.session, state.exporter);
    Json(service.ledger(query.search.as_deref()).await)
}

/// Summary counters for today's ledger
pub async fn get_stats(State(state): State<AppState>) -> Json<InventoryStats> {
    let service = InventoryService::new(state.session, state.exporter);
    Json(service.stats().await)
}

/// Medicines at or below the low stock threshold
pub async fn get_low_stock(State(state): State<AppState>) -> Json<Vec<LedgerRow>> {
    let service = InventoryService::new(state.session, state.exporter);
    Json(service.low_stock().await)
}

/// Add a blank medicine row
pub async fn add_medicine(State(state): State<AppState>) -> Json<WithNotifications<LedgerRow>> {
    let service = InventoryService::new(state.session, state.exporter);
    Json(service.add_medicine().await)
}

/// Edit one or more fields of a medicine
pub async fn update_medicine(
    State(state): State<AppState>,
    Path(id): Path<MedicineId>,
    Json(update): Json<MedicineUpdate>,
) -> AppResult<Json<WithNotifications<LedgerRow>>> {
    let service = InventoryService::new(state.session, state.exporter);
    let row = service.update_medicine(id, update).await?;
    Ok(Json(row))
}

/// Delete a medicine; requires `confirm=true`
pub async fn delete_medicine(
    State(state): State<AppState>,
    Path(id): Path<MedicineId>,
    Query(query): Query<ConfirmQuery>,
) -> AppResult<Json<WithNotifications<MedicineRecord>>> {
    let service = InventoryService::new(state.session, state.exporter);
    let removed = service.delete_medicine(id, query.confirm).await?;
    Ok(Json(removed))
}

pub async fn save_ledger(State(state): State<AppState>) -> AppResult<Json<WithNotifications<InventoryStats>>> {
    let service = InventoryService::new(state.session, state.exporter);
    Ok(Json(service.save().await?))
}

/// Download today's ledger as xlsx
pub async fn export_ledger(State(state): State<AppState>) -> AppResult<Response> {
    let service = InventoryService::new(state.session, state.exporter);
    let file = service.export().await?;
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

/// Import a workbook uploaded as the `file` field of a multipart form
pub async fn import_ledger(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    mut multipart: Multipart,
) -> AppResult<Json<WithNotifications<ImportSummary>>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid upload: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::ValidationError(format!("Invalid upload: {}", e)))?;
            upload = Some(bytes);
            break;
        }
    }
    let bytes = upload.ok_or_else(|| AppError::Validation {
        field: "file".to_string(),
        message: "A spreadsheet must be uploaded in the 'file' field".to_string(),
    })?;

    let service = InventoryService::new(state.session, state.exporter);
    Ok(Json(service.import(&bytes, query.mode).await?))
}

/// End the current day and roll stock forward; requires `confirm=true`
pub async fn end_day(
    State(state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> AppResult<Json<WithNotifications<DayEndOutcome>>> {
    let service = InventoryService::new(state.session, state.exporter);
    Ok(Json(service.end_day(query.confirm).await?))
}
