//! Tabular row mapping for spreadsheet import and export
//!
//! Workbook parsing lives with the I/O code; this module only knows the
//! column layout and how loosely typed cells turn into ledger fields.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{remaining, status_of, MedicineRecord};
use crate::validation::{coerce_float_quantity, coerce_quantity};

pub const COLUMN_NAME: &str = "Medicine Name";
pub const COLUMN_OPENING: &str = "Opening Stock";
pub const COLUMN_ADDED: &str = "Added Quantity";
pub const COLUMN_USED: &str = "Used Quantity";
pub const COLUMN_CLOSING: &str = "Closing Stock";
pub const COLUMN_STATUS: &str = "Status";

/// Header row written on export
pub const EXPORT_HEADERS: [&str; 6] = [
    COLUMN_NAME,
    COLUMN_OPENING,
    COLUMN_ADDED,
    COLUMN_USED,
    COLUMN_CLOSING,
    COLUMN_STATUS,
];

/// Character widths of the exported columns
pub const EXPORT_COLUMN_WIDTHS: [f64; 6] = [30.0, 15.0, 15.0, 15.0, 15.0, 15.0];

/// Name of the single exported worksheet
pub const EXPORT_SHEET_NAME: &str = "Daily Inventory";

/// File name of the export for a given date
pub fn export_file_name(date: chrono::NaiveDate) -> String {
    format!("Medicine_Inventory_{}.xlsx", date.format("%Y-%m-%d"))
}

/// A spreadsheet cell, independent of the workbook reader
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }

    fn as_quantity(&self) -> Decimal {
        match self {
            CellValue::Empty => Decimal::ZERO,
            CellValue::Text(s) => coerce_quantity(s),
            CellValue::Number(n) => coerce_float_quantity(*n),
            CellValue::Bool(true) => Decimal::ONE,
            CellValue::Bool(false) => Decimal::ZERO,
        }
    }
}

/// One medicine read from an imported sheet, before it gets an id
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub name: String,
    pub total_quantity: Decimal,
    pub added_quantity: Decimal,
    pub used_quantity: Decimal,
}

/// Positions of the recognised headers
#[derive(Debug, Clone, Copy, Default)]
struct ColumnMap {
    name: Option<usize>,
    opening: Option<usize>,
    added: Option<usize>,
    used: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &[CellValue]) -> Self {
        let mut map = Self::default();
        for (idx, cell) in header.iter().enumerate() {
            match cell.as_text().as_str() {
                COLUMN_NAME => map.name = Some(idx),
                COLUMN_OPENING => map.opening = Some(idx),
                COLUMN_ADDED => map.added = Some(idx),
                COLUMN_USED => map.used = Some(idx),
                _ => {}
            }
        }
        map
    }

    fn cell<'a>(row: &'a [CellValue], idx: Option<usize>) -> Option<&'a CellValue> {
        idx.and_then(|i| row.get(i))
    }

    fn read(&self, row: &[CellValue]) -> ImportRow {
        let quantity = |idx| Self::cell(row, idx).map(CellValue::as_quantity).unwrap_or(Decimal::ZERO);
        ImportRow {
            name: Self::cell(row, self.name).map(CellValue::as_text).unwrap_or_default(),
            total_quantity: quantity(self.opening),
            added_quantity: quantity(self.added),
            used_quantity: quantity(self.used),
        }
    }
}

/// Map a sheet (first row = headers) to import rows
///
/// Fully blank rows are skipped; every other row yields a record even when
/// none of its populated cells sit under a recognised header.
pub fn rows_from_table<I>(mut rows: I) -> Vec<ImportRow>
where
    I: Iterator<Item = Vec<CellValue>>,
{
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let columns = ColumnMap::from_header(&header);
    rows.filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .map(|row| columns.read(&row))
        .collect()
}

/// A fully derived export line
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub name: String,
    pub opening: f64,
    pub added: f64,
    pub used: f64,
    pub closing: f64,
    pub status: String,
}

impl From<&MedicineRecord> for ExportRow {
    fn from(record: &MedicineRecord) -> Self {
        let closing = remaining(record);
        Self {
            name: record.name.clone(),
            opening: record.total_quantity.to_f64().unwrap_or(0.0),
            added: record.added_quantity.to_f64().unwrap_or(0.0),
            used: record.used_quantity.to_f64().unwrap_or(0.0),
            closing: closing.to_f64().unwrap_or(0.0),
            status: status_of(closing).to_string(),
        }
    }
}

pub fn export_rows(records: &[MedicineRecord]) -> Vec<ExportRow> {
    records.iter().map(ExportRow::from).collect()
}
