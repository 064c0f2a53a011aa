//! Inventory service: the HTTP-facing wrapper around the shared session

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use shared::{
    format_date_display, DayEndOutcome, DayLedger, ImportMode, InventoryStats, LedgerRow, MedicineId,
    MedicineRecord, MedicineUpdate, Notification, NotificationKind, Session, StockStatus,
};
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::services::scheduler::with_session_blocking;
use crate::services::spreadsheet::{import_workbook, WorkbookDownload, XlsxExporter};
use crate::storage::FileStore;

pub type SharedSession = Arc<Mutex<Session<FileStore>>>;

/// Inventory service for the ledger bound to the current day
#[derive(Clone)]
pub struct InventoryService {
    session: SharedSession,
    exporter: XlsxExporter,
}

/// Current ledger as shown on the main screen
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerView {
    pub date: NaiveDate,
    pub display_date: String,
    pub medicines: Vec<LedgerRow>,
    pub stats: InventoryStats,
}

/// Result of a mutation plus the messages it raised
#[derive(Debug, Serialize)]
pub struct WithNotifications<T> {
    pub data: T,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub mode: ImportMode,
    pub total_medicines: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub display_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedLedger {
    pub date: NaiveDate,
    pub display_date: String,
    pub medicines: Vec<LedgerRow>,
    pub stats: InventoryStats,
}

/// A rendered workbook ready for download
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl InventoryService {
    pub fn new(session: SharedSession, exporter: XlsxExporter) -> Self {
        Self { session, exporter }
    }

    /// Listing of today's ledger, optionally filtered by name
    pub async fn ledger(&self, search: Option<&str>) -> LedgerView {
        let session = self.session.lock().await;
        let date = session.current_date();
        LedgerView {
            date,
            display_date: format_date_display(date),
            medicines: session.listing(search.unwrap_or_default()),
            stats: session.stats(),
        }
    }

    pub async fn stats(&self) -> InventoryStats {
        self.session.lock().await.stats()
    }

    /// Append a blank medicine to today's ledger
    pub async fn add_medicine(&self) -> WithNotifications<LedgerRow> {
        let mut session = self.session.lock().await;
        let record = session.add_medicine(now_ms());
        tracing::debug!("Added medicine {}", record.id);
        WithNotifications {
            data: LedgerRow::from(&record),
            notifications: session.take_notifications(),
        }
    }

    pub async fn update_medicine(
        &self,
        id: MedicineId,
        update: MedicineUpdate,
    ) -> AppResult<WithNotifications<LedgerRow>> {
        if update.is_empty() {
            return Err(AppError::ValidationError("No fields to update".to_string()));
        }
        let mut session = self.session.lock().await;
        let record = session.update_medicine(id, update, now_ms())?;
        Ok(WithNotifications {
            data: LedgerRow::from(&record),
            notifications: session.take_notifications(),
        })
    }

    pub async fn delete_medicine(&self, id: MedicineId, confirm: bool) -> AppResult<WithNotifications<MedicineRecord>> {
        require_confirmation(confirm, "deleting a medicine")?;
        let mut session = self.session.lock().await;
        let removed = session.delete_medicine(id)?;
        tracing::info!("Deleted medicine {} ({})", removed.id, removed.name);
        Ok(WithNotifications {
            data: removed,
            notifications: session.take_notifications(),
        })
    }

    /// Persist today's ledger
    pub async fn save(&self) -> AppResult<WithNotifications<InventoryStats>> {
        let mut session = self.session.lock().await;
        let saved = session.save();
        let notifications = session.take_notifications();
        if !saved {
            return Err(AppError::StorageError(first_error(&notifications)));
        }
        Ok(WithNotifications {
            data: session.stats(),
            notifications,
        })
    }

    /// Render today's ledger as a workbook
    pub async fn export(&self) -> AppResult<ExportFile> {
        let mut session = self.session.lock().await;
        let mut download = WorkbookDownload::default();
        let result = session.export_current(&mut download);
        session.take_notifications();
        let file_name = result?;
        let bytes = download
            .into_bytes()
            .ok_or_else(|| AppError::Internal("export produced no workbook".to_string()))?;
        Ok(ExportFile { file_name, bytes })
    }

    /// Load medicines from an uploaded workbook
    pub async fn import(&self, bytes: &[u8], mode: ImportMode) -> AppResult<WithNotifications<ImportSummary>> {
        let rows = import_workbook(bytes)?;
        let mut session = self.session.lock().await;
        let result = session.import(rows, mode, now_ms());
        let notifications = session.take_notifications();
        let imported = result?;
        Ok(WithNotifications {
            data: ImportSummary {
                imported,
                mode,
                total_medicines: session.records().len(),
            },
            notifications,
        })
    }

    /// Close the current day on the user's request
    pub async fn end_day(&self, confirm: bool) -> AppResult<WithNotifications<DayEndOutcome>> {
        require_confirmation(confirm, "ending the day")?;
        let mut exporter = self.exporter.clone();
        let date = today();
        let (outcome, notifications) = with_session_blocking(&self.session, move |session| {
            let outcome = session.manual_day_end(date, &mut exporter);
            (outcome, session.take_notifications())
        })
        .await
        .ok_or_else(|| AppError::Internal("day-end task failed".to_string()))?;
        tracing::info!(
            "Manual day-end closed {} into {:?}",
            outcome.closed_date,
            outcome.target_date
        );
        Ok(WithNotifications {
            data: outcome,
            notifications,
        })
    }

    /// Dates of the last thirty days with a stored ledger, newest first
    pub async fn history(&self) -> Vec<HistoryEntry> {
        let session = self.session.lock().await;
        session
            .history(today())
            .into_iter()
            .map(|date| HistoryEntry {
                date,
                display_date: format_date_display(date),
            })
            .collect()
    }

    pub async fn archived(&self, date: NaiveDate) -> AppResult<ArchivedLedger> {
        let session = self.session.lock().await;
        let DayLedger { date, records } = session
            .archived(date)
            .ok_or_else(|| AppError::NotFound(format!("Ledger for {}", date)))?;
        Ok(ArchivedLedger {
            date,
            display_date: format_date_display(date),
            stats: InventoryStats::from_records(&records),
            medicines: shared::listing(&records, ""),
        })
    }

    /// Medicines that need reordering, lowest stock first
    pub async fn low_stock(&self) -> Vec<LedgerRow> {
        let session = self.session.lock().await;
        let mut rows: Vec<LedgerRow> = session
            .listing("")
            .into_iter()
            .filter(|row| row.status != StockStatus::InStock)
            .collect();
        rows.sort_by(|a, b| a.remaining.cmp(&b.remaining));
        rows
    }
}

fn require_confirmation(confirm: bool, action: &str) -> AppResult<()> {
    if confirm {
        Ok(())
    } else {
        Err(AppError::ConfirmationRequired(action.to_string()))
    }
}

fn first_error(notifications: &[Notification]) -> String {
    notifications
        .iter()
        .find(|n| n.kind == NotificationKind::Error)
        .map(|n| n.message.clone())
        .unwrap_or_else(|| "Failed to save data".to_string())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
