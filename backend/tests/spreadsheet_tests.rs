//! Spreadsheet bridge tests
//!
//! Export then import with "replace" reproduces the ledger's quantities,
//! and workbooks written by other tools are read by header name.

use chrono::NaiveDate;
use medicine_inventory_backend::services::spreadsheet::{import_workbook, render_workbook, XlsxExporter};
use rust_decimal::Decimal;
use rust_xlsxwriter::Workbook;
use shared::{ImportMode, LedgerExporter, MedicineRecord, MemoryStore, Session};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn medicine(id: i64, name: &str, total: &str, added: &str, used: &str) -> MedicineRecord {
    MedicineRecord {
        id,
        name: name.to_string(),
        total_quantity: dec(total),
        added_quantity: dec(added),
        used_quantity: dec(used),
        last_updated: None,
    }
}

fn tuples(records: &[MedicineRecord]) -> Vec<(String, Decimal, Decimal, Decimal)> {
    let mut out: Vec<_> = records
        .iter()
        .map(|r| (r.name.clone(), r.total_quantity, r.added_quantity, r.used_quantity))
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

#[test]
fn export_then_replace_import_reproduces_quantities() {
    let original = vec![
        medicine(1, "Paracetamol", "100", "20", "30"),
        medicine(2, "Saline 0.9%", "12.5", "0", "2.5"),
        medicine(3, "Insulin", "0", "0", "0"),
    ];
    let bytes = render_workbook(&original).unwrap();

    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let mut session = Session::open(MemoryStore::new(), today);
    session.add_medicine(1);
    let rows = import_workbook(&bytes).unwrap();
    let imported = session.import(rows, ImportMode::Replace, 1_700_000_000_000).unwrap();

    assert_eq!(imported, 3);
    assert_eq!(tuples(session.records()), tuples(&original));
    assert!(session.records().iter().all(|r| r.id >= 1_700_000_000_000));
}

#[test]
fn merge_import_appends_to_existing_rows() {
    let bytes = render_workbook(&[medicine(1, "Ranitidine", "8", "0", "0")]).unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let mut session = Session::open(MemoryStore::new(), today);
    session.add_medicine(1);

    session
        .import(import_workbook(&bytes).unwrap(), ImportMode::Merge, 5_000)
        .unwrap();

    assert_eq!(session.records().len(), 2);
    assert_eq!(session.store().get(today).unwrap().len(), 2);
}

#[test]
fn columns_are_matched_by_header_not_position() {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, title) in ["Used Quantity", "Medicine Name", "Opening Stock", "Notes"].iter().enumerate() {
        sheet.write_string(0, col as u16, *title).unwrap();
    }
    sheet.write_number(1, 0, 4.0).unwrap();
    sheet.write_string(1, 1, "Aspirin").unwrap();
    sheet.write_string(1, 2, "25").unwrap();
    sheet.write_string(1, 3, "shelf B").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let rows = import_workbook(&bytes).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Aspirin");
    assert_eq!(rows[0].total_quantity, dec("25"));
    assert_eq!(rows[0].added_quantity, Decimal::ZERO);
    assert_eq!(rows[0].used_quantity, dec("4"));
}

#[test]
fn header_only_sheet_imports_nothing() {
    let bytes = render_workbook(&[]).unwrap();
    assert!(import_workbook(&bytes).unwrap().is_empty());
}

#[test]
fn exporter_writes_into_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut exporter = XlsxExporter::new(dir.path().join("exports"));
    let day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

    let name = exporter.export(day, &[medicine(1, "Heparin", "3", "1", "0")]).unwrap();

    let written = std::fs::read(exporter.output_dir().join(&name)).unwrap();
    let rows = import_workbook(&written).unwrap();
    assert_eq!(rows[0].name, "Heparin");
}
