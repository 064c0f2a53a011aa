//! WebAssembly module for the medicine inventory
//!
//! Provides the in-browser build of the ledger:
//! - Stock derivations (closing stock, status, rollover)
//! - A session persisted to `localStorage`
//! - Spreadsheet rows handed over from JavaScript for import

mod local_storage;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

pub use local_storage::LocalStorageStore;
pub use shared::models::*;
pub use shared::types::*;

use shared::{
    export_file_name, ledger_key, parse_date_key, rows_from_table, CellValue, LedgerError, LedgerExporter,
    MedicineUpdate, Session,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("medicine inventory module loaded"));
}

fn js_err(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(js_err)
}

fn decimal(value: f64) -> Decimal {
    shared::validation::coerce_float_quantity(value)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_string().parse().unwrap_or(0.0)
}

/// Closing stock: opening + added - used
#[wasm_bindgen]
pub fn remaining_stock(total: f64, added: f64, used: f64) -> f64 {
    let record = MedicineRecord {
        total_quantity: decimal(total),
        added_quantity: decimal(added),
        used_quantity: decimal(used),
        ..MedicineRecord::blank(0)
    };
    to_f64(remaining(&record))
}

/// Display label for a closing stock value
#[wasm_bindgen]
pub fn stock_status(remaining: f64) -> String {
    status_of(decimal(remaining)).to_string()
}

#[wasm_bindgen]
pub fn stock_badge(remaining: f64) -> String {
    status_of(decimal(remaining)).badge().to_string()
}

/// Storage key for a `YYYY-MM-DD` date
#[wasm_bindgen]
pub fn ledger_storage_key(date: &str) -> Result<String, JsValue> {
    let date = parse_date_key(date).map_err(js_err)?;
    Ok(ledger_key(date))
}

/// Roll a JSON ledger forward one day
#[wasm_bindgen]
pub fn rollover_ledger(records_json: &str) -> Result<String, JsValue> {
    let records: Vec<MedicineRecord> = serde_json::from_str(records_json).map_err(js_err)?;
    to_json(&rollover_all(&records))
}

/// Filtered, display-ordered rows of a JSON ledger
#[wasm_bindgen]
pub fn ledger_listing(records_json: &str, search: &str) -> Result<String, JsValue> {
    let records: Vec<MedicineRecord> = serde_json::from_str(records_json).map_err(js_err)?;
    to_json(&listing(&records, search))
}

/// Workbook parsed on the JavaScript side, as rows of cell values
fn cells_from_json(rows: &[Vec<Value>]) -> Vec<Vec<CellValue>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Value::Null => CellValue::Empty,
                    Value::Bool(b) => CellValue::Bool(*b),
                    Value::Number(n) => CellValue::Number(n.as_f64().unwrap_or(0.0)),
                    Value::String(s) => CellValue::Text(s.clone()),
                    other => CellValue::Text(other.to_string()),
                })
                .collect()
        })
        .collect()
}

/// An export the page still has to turn into a file
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingExport {
    date: NaiveDate,
    file_name: String,
    rows: Vec<LedgerRow>,
}

/// Queues exports for the page; the workbook itself is written in JavaScript
#[derive(Default)]
struct QueuedExports(Vec<PendingExport>);

impl LedgerExporter for QueuedExports {
    fn export(&mut self, date: NaiveDate, records: &[MedicineRecord]) -> Result<String, LedgerError> {
        let file_name = export_file_name(date);
        self.0.push(PendingExport {
            date,
            file_name: file_name.clone(),
            rows: records.iter().map(LedgerRow::from).collect(),
        });
        Ok(file_name)
    }
}

fn local_today() -> Result<NaiveDate, JsValue> {
    let now = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(now.get_full_year() as i32, now.get_month() + 1, now.get_date())
        .ok_or_else(|| JsValue::from_str("invalid local date"))
}

fn local_now() -> Result<NaiveDateTime, JsValue> {
    let now = js_sys::Date::new_0();
    local_today()?
        .and_hms_opt(now.get_hours(), now.get_minutes(), now.get_seconds())
        .ok_or_else(|| JsValue::from_str("invalid local time"))
}

fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

/// The browser session: today's ledger backed by `localStorage`
#[wasm_bindgen]
pub struct InventoryApp {
    session: Session<LocalStorageStore>,
    exports: QueuedExports,
}

#[wasm_bindgen]
impl InventoryApp {
    /// Open the app, catching up a day-end missed while the page was closed
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<InventoryApp, JsValue> {
        let store = LocalStorageStore::from_window().map_err(js_err)?;
        let mut exports = QueuedExports::default();
        let session = Session::start(store, local_today()?, &mut exports);
        Ok(InventoryApp { session, exports })
    }

    #[wasm_bindgen(js_name = currentDate)]
    pub fn current_date(&self) -> String {
        self.session.current_date().to_string()
    }

    #[wasm_bindgen(js_name = displayDate)]
    pub fn display_date(&self) -> String {
        format_date_display(self.session.current_date())
    }

    pub fn listing(&self, search: &str) -> Result<String, JsValue> {
        to_json(&self.session.listing(search))
    }

    pub fn stats(&self) -> Result<String, JsValue> {
        to_json(&self.session.stats())
    }

    #[wasm_bindgen(js_name = addMedicine)]
    pub fn add_medicine(&mut self) -> Result<String, JsValue> {
        to_json(&self.session.add_medicine(now_ms()))
    }

    /// Apply a partial edit given as `{ name?, totalQuantity?, ... }`
    #[wasm_bindgen(js_name = updateMedicine)]
    pub fn update_medicine(&mut self, id: f64, update_json: &str) -> Result<String, JsValue> {
        let update: MedicineUpdate = serde_json::from_str(update_json).map_err(js_err)?;
        let record = self.session.update_medicine(id as i64, update, now_ms()).map_err(js_err)?;
        to_json(&LedgerRow::from(&record))
    }

    /// Delete after the page has asked the user
    #[wasm_bindgen(js_name = deleteMedicine)]
    pub fn delete_medicine(&mut self, id: f64, confirmed: bool) -> Result<bool, JsValue> {
        if !confirmed {
            return Ok(false);
        }
        self.session.delete_medicine(id as i64).map_err(js_err)?;
        Ok(true)
    }

    pub fn save(&mut self) -> bool {
        self.session.save()
    }

    /// Import rows of cells (header row first); `mode` is "replace" or "merge"
    #[wasm_bindgen(js_name = importRows)]
    pub fn import_rows(&mut self, rows_json: &str, mode: &str) -> Result<usize, JsValue> {
        let mode: ImportMode = serde_json::from_value(Value::String(mode.to_string())).map_err(js_err)?;
        let table: Vec<Vec<Value>> = serde_json::from_str(rows_json).map_err(js_err)?;
        let rows = rows_from_table(cells_from_json(&table).into_iter());
        self.session.import(rows, mode, now_ms()).map_err(js_err)
    }

    /// Queue an export of the ledger as it stands
    pub fn export(&mut self) -> Result<String, JsValue> {
        self.session.export_current(&mut self.exports).map_err(js_err)
    }

    /// End the day after the page has asked the user
    #[wasm_bindgen(js_name = endDay)]
    pub fn end_day(&mut self, confirmed: bool) -> Result<String, JsValue> {
        if !confirmed {
            return Ok(String::from("null"));
        }
        let outcome = self.session.manual_day_end(local_today()?, &mut self.exports);
        to_json(&outcome)
    }

    /// Call once a minute; returns true when the page should reload shortly
    pub fn tick(&mut self) -> Result<bool, JsValue> {
        let outcome = self.session.tick(local_now()?, &mut self.exports);
        Ok(outcome.map(|o| o.reload_requested).unwrap_or(false))
    }

    pub fn reload(&mut self) -> Result<(), JsValue> {
        self.session.reload(local_today()?);
        Ok(())
    }

    pub fn history(&self) -> Result<String, JsValue> {
        let dates: Vec<String> = self.session.history(local_today()?).iter().map(|d| d.to_string()).collect();
        to_json(&dates)
    }

    pub fn archived(&self, date: &str) -> Result<String, JsValue> {
        let date = parse_date_key(date).map_err(js_err)?;
        to_json(&self.session.archived(date))
    }

    #[wasm_bindgen(js_name = takeNotifications)]
    pub fn take_notifications(&mut self) -> Result<String, JsValue> {
        to_json(&self.session.take_notifications())
    }

    #[wasm_bindgen(js_name = takePendingExports)]
    pub fn take_pending_exports(&mut self) -> Result<String, JsValue> {
        to_json(&std::mem::take(&mut self.exports.0))
    }
}
