//! Spreadsheet bridge
//!
//! Writes ledgers as single-sheet xlsx workbooks and reads any workbook
//! calamine understands back into [`ImportRow`]s.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use shared::{
    export_file_name, export_rows, rows_from_table, CellValue, ImportRow, LedgerError, LedgerExporter,
    MedicineRecord, EXPORT_COLUMN_WIDTHS, EXPORT_HEADERS, EXPORT_SHEET_NAME,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Failed to read Excel file: {0}")]
    Read(String),

    #[error("Excel file has no sheets: {0}")]
    NoSheets(String),

    #[error("Failed to write workbook: {0}")]
    Write(#[from] XlsxError),

    #[error("Failed to write export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Render `records` as the daily inventory workbook
pub fn render_workbook(records: &[MedicineRecord]) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = build_workbook(records)?;
    Ok(workbook.save_to_buffer()?)
}

fn build_workbook(records: &[MedicineRecord]) -> Result<Workbook, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    for (col, (title, width)) in EXPORT_HEADERS.iter().zip(EXPORT_COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *title, &header)?;
        worksheet.set_column_width(col, width)?;
    }

    for (idx, row) in export_rows(records).iter().enumerate() {
        let r = idx as u32 + 1;
        worksheet.write_string(r, 0, &row.name)?;
        worksheet.write_number(r, 1, row.opening)?;
        worksheet.write_number(r, 2, row.added)?;
        worksheet.write_number(r, 3, row.used)?;
        worksheet.write_number(r, 4, row.closing)?;
        worksheet.write_string(r, 5, &row.status)?;
    }

    Ok(workbook)
}

/// Parse an uploaded workbook's first sheet
///
/// Rows are keyed by the header row, so column order does not matter.
/// Returns an empty list when the sheet holds nothing usable.
pub fn import_workbook(bytes: &[u8]) -> Result<Vec<ImportRow>, SpreadsheetError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| SpreadsheetError::Read(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SpreadsheetError::NoSheets("workbook is empty".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SpreadsheetError::Read(format!("sheet '{}': {}", sheet_name, e)))?;

    let table = range.rows().map(|row| row.iter().map(cell_value).collect::<Vec<_>>());
    let rows = rows_from_table(table);

    tracing::debug!("Read {} rows from sheet '{}'", rows.len(), sheet_name);
    Ok(rows)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        other => CellValue::Text(other.to_string()),
    }
}

/// Writes exports into a directory on disk
#[derive(Debug, Clone)]
pub struct XlsxExporter {
    output_dir: PathBuf,
}

impl XlsxExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn write(&self, date: NaiveDate, records: &[MedicineRecord]) -> Result<PathBuf, SpreadsheetError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(export_file_name(date));
        let bytes = render_workbook(records)?;
        std::fs::write(&path, bytes)?;
        tracing::info!("Exported {} medicines to {}", records.len(), path.display());
        Ok(path)
    }
}

impl LedgerExporter for XlsxExporter {
    fn export(&mut self, date: NaiveDate, records: &[MedicineRecord]) -> Result<String, LedgerError> {
        self.write(date, records)
            .map_err(|e| LedgerError::Export(e.to_string()))?;
        Ok(export_file_name(date))
    }
}

/// Captures an export in memory for download
#[derive(Debug, Default)]
pub struct WorkbookDownload {
    bytes: Option<Vec<u8>>,
}

impl WorkbookDownload {
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        self.bytes
    }
}

impl LedgerExporter for WorkbookDownload {
    fn export(&mut self, date: NaiveDate, records: &[MedicineRecord]) -> Result<String, LedgerError> {
        let bytes = render_workbook(records).map_err(|e| LedgerError::Export(e.to_string()))?;
        self.bytes = Some(bytes);
        Ok(export_file_name(date))
    }
}
