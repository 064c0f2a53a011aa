//! Day-end and rollover tests
//!
//! Tests for the day-state machine including:
//! - Manual day-end rolling closing stock into the next day
//! - Opening a day with no ledger of its own
//! - The automatic midnight tick and the startup catch-up
//! - Derivation properties: remaining, status boundaries and rollover shape

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    remaining, rollover_all, rows_from_table, status_of, CellValue, DayEndTrigger, ImportMode, LedgerError,
    LedgerExporter, LedgerStore, MedicineRecord, MemoryStore, Session, StockStatus, MAX_QUANTITY,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(day: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    day.and_hms_opt(h, m, 0).unwrap()
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

fn store_with(entries: &[(NaiveDate, Vec<MedicineRecord>)]) -> MemoryStore {
    let mut ledgers = LedgerStore::new(MemoryStore::new());
    for (day, records) in entries {
        ledgers.put(*day, records).unwrap();
    }
    ledgers.into_inner()
}

/// Remembers which dates were exported
#[derive(Default)]
struct Exports(Vec<(NaiveDate, usize)>);

impl LedgerExporter for Exports {
    fn export(&mut self, date: NaiveDate, records: &[MedicineRecord]) -> Result<String, LedgerError> {
        self.0.push((date, records.len()));
        Ok(format!("Medicine_Inventory_{}.xlsx", date))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

mod unit_tests {
    use super::*;

    #[test]
    fn manual_day_end_rolls_paracetamol_into_next_day() {
        let jan1 = date(2024, 1, 1);
        let jan2 = date(2024, 1, 2);
        let store = store_with(&[(jan1, vec![medicine(1, "Paracetamol", "100", "20", "30")])]);
        let mut session = Session::open(store, jan1);

        let record = &session.records()[0];
        assert_eq!(record.remaining(), dec("90"));
        assert_eq!(status_of(record.remaining()), StockStatus::InStock);

        let mut exports = Exports::default();
        let outcome = session.manual_day_end(jan1, &mut exports);

        assert_eq!(outcome.trigger, DayEndTrigger::Manual);
        assert_eq!(outcome.target_date, Some(jan2));
        assert_eq!(exports.0, vec![(jan1, 1)]);
        assert_eq!(session.current_date(), jan2);

        let rolled = session.store().get(jan2).unwrap();
        assert_eq!(rolled.len(), 1);
        assert_eq!(rolled[0].name, "Paracetamol");
        assert_eq!(rolled[0].total_quantity, dec("90"));
        assert_eq!(rolled[0].added_quantity, Decimal::ZERO);
        assert_eq!(rolled[0].used_quantity, Decimal::ZERO);
        assert_eq!(session.records(), rolled.as_slice());
    }

    #[test]
    fn opening_a_new_day_rolls_yesterday_forward() {
        let yesterday = date(2024, 3, 9);
        let today = date(2024, 3, 10);
        let store = store_with(&[(yesterday, vec![medicine(7, "Amoxicillin", "20", "0", "15")])]);

        let mut session = Session::open(store, today);

        assert_eq!(session.records().len(), 1);
        assert_eq!(session.records()[0].total_quantity, dec("5"));
        assert_eq!(status_of(session.records()[0].remaining()), StockStatus::LowStock);
        assert!(session.store().contains(today));
        let messages: Vec<String> = session.take_notifications().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["Rolled over from yesterday's data".to_string()]);
    }

    #[test]
    fn opening_with_nothing_stored_gives_an_empty_ledger() {
        let session = Session::open(MemoryStore::new(), date(2024, 3, 10));
        assert!(session.records().is_empty());
        assert!(!session.store().contains(date(2024, 3, 10)));
    }

    #[test]
    fn empty_import_leaves_the_ledger_unchanged() {
        let today = date(2024, 5, 1);
        let before = vec![medicine(1, "Ibuprofen", "40", "0", "2")];
        let mut session = Session::open(store_with(&[(today, before.clone())]), today);
        session.take_notifications();

        let err = session.import(Vec::new(), ImportMode::Replace, 1_000).unwrap_err();

        assert!(matches!(err, LedgerError::EmptyImport));
        assert_eq!(session.records(), before.as_slice());
        let notes = session.take_notifications();
        assert_eq!(notes[0].message, "No valid data found in Excel file!");
    }

    #[test]
    fn listing_sorts_by_last_updated_then_id() {
        let today = date(2024, 5, 1);
        let mut older = medicine(1, "Older", "1", "0", "0");
        older.last_updated = Some(1_000);
        let mut newer = medicine(2, "Newer", "1", "0", "0");
        newer.last_updated = Some(2_000);
        let untouched = medicine(1_500, "Untouched", "1", "0", "0");

        let session = Session::open(store_with(&[(today, vec![older, untouched, newer])]), today);
        let names: Vec<String> = session.listing("").into_iter().map(|row| row.record.name).collect();

        assert_eq!(names, vec!["Newer", "Untouched", "Older"]);
    }

    #[test]
    fn midnight_tick_exports_and_rolls_once() {
        let jan1 = date(2024, 1, 1);
        let jan2 = date(2024, 1, 2);
        let store = store_with(&[(jan1, vec![medicine(1, "Cetirizine", "12", "3", "5")])]);
        let mut session = Session::open(store, jan1);
        let mut exports = Exports::default();

        assert!(session.tick(at(jan1, 23, 59), &mut exports).is_none());

        let outcome = session.tick(at(jan2, 0, 1), &mut exports).unwrap();
        assert_eq!(outcome.trigger, DayEndTrigger::Automatic);
        assert_eq!(outcome.target_date, Some(jan2));
        assert!(outcome.reload_requested);
        assert_eq!(session.store().get(jan2).unwrap()[0].total_quantity, dec("10"));
        assert_eq!(session.store().last_auto_export(), Some(jan2));

        // A second reading within the same minute does nothing
        assert!(session.tick(at(jan2, 0, 1), &mut exports).is_none());
        assert_eq!(exports.0.len(), 1);

        session.reload(jan2);
        assert_eq!(session.current_date(), jan2);
        assert_eq!(session.records()[0].total_quantity, dec("10"));
    }

    #[test]
    fn startup_catches_up_a_missed_day_end() {
        let jan1 = date(2024, 1, 1);
        let jan2 = date(2024, 1, 2);
        let mut ledgers = LedgerStore::new(store_with(&[(jan1, vec![medicine(1, "Omeprazole", "30", "0", "10")])]));
        ledgers.set_last_checked(jan1).unwrap();

        let mut exports = Exports::default();
        let session = Session::start(ledgers.into_inner(), jan2, &mut exports);

        assert!(exports.0.is_empty(), "catch-up does not export");
        assert_eq!(session.current_date(), jan2);
        assert_eq!(session.records()[0].total_quantity, dec("20"));
        assert_eq!(session.store().last_checked(), Some(jan2));
    }

    #[test]
    fn startup_catch_up_keeps_an_existing_successor() {
        let jan1 = date(2024, 1, 1);
        let jan2 = date(2024, 1, 2);
        let edited = vec![medicine(9, "Metformin", "50", "5", "1")];
        let mut ledgers = LedgerStore::new(store_with(&[
            (jan1, vec![medicine(1, "Metformin", "30", "0", "0")]),
            (jan2, edited.clone()),
        ]));
        ledgers.set_last_checked(jan1).unwrap();

        let session = Session::start(ledgers.into_inner(), jan2, &mut Exports::default());

        assert_eq!(session.records(), edited.as_slice());
    }

    #[test]
    fn startup_after_a_week_closes_only_the_last_checked_day() {
        let jan1 = date(2024, 1, 1);
        let jan2 = date(2024, 1, 2);
        let jan8 = date(2024, 1, 8);
        let mut ledgers = LedgerStore::new(store_with(&[(jan1, vec![medicine(1, "Salbutamol", "25", "5", "10")])]));
        ledgers.set_last_checked(jan1).unwrap();

        let session = Session::start(ledgers.into_inner(), jan8, &mut Exports::default());

        let rolled = session.store().get(jan2).unwrap();
        assert_eq!(rolled[0].total_quantity, dec("20"));
        for d in 3..=8 {
            assert!(!session.store().contains(date(2024, 1, d)), "unexpected ledger for 2024-01-{:02}", d);
        }
        assert_eq!(session.current_date(), jan8);
        assert!(session.records().is_empty());
        assert_eq!(session.store().last_checked(), Some(jan8));
    }

    #[test]
    fn oversized_imported_quantities_do_not_break_the_ledger() {
        let jan1 = date(2024, 1, 1);
        let jan2 = date(2024, 1, 2);
        let table = vec![
            vec![
                CellValue::Text("Medicine Name".to_string()),
                CellValue::Text("Opening Stock".to_string()),
                CellValue::Text("Added Quantity".to_string()),
            ],
            vec![
                CellValue::Text("Glucose".to_string()),
                CellValue::Text("79228162514264337593543950335".to_string()),
                CellValue::Text("1".to_string()),
            ],
        ];
        let mut session = Session::open(MemoryStore::new(), jan1);
        let imported = session
            .import(rows_from_table(table.into_iter()), ImportMode::Replace, 1_000)
            .unwrap();
        assert_eq!(imported, 1);

        let limit = Decimal::from(MAX_QUANTITY);
        let rows = session.listing("");
        assert_eq!(rows[0].record.total_quantity, limit);
        assert_eq!(rows[0].remaining, limit + Decimal::ONE);
        assert_eq!(session.stats().total_medicines, 1);

        session.manual_day_end(jan1, &mut Exports::default());
        let reopened = Session::open(session.store().inner().clone(), jan2);
        assert_eq!(reopened.records()[0].total_quantity, limit);
    }

    #[test]
    fn storage_failure_during_save_is_reported() {
        let today = date(2024, 2, 2);
        let mut store = MemoryStore::new();
        store.set_fail_writes(true);
        let mut session = Session::open(store, today);
        session.add_medicine(10);

        assert!(!session.save());
        let notes = session.take_notifications();
        assert!(notes[0].message.starts_with("Failed to save data"));
        assert_eq!(session.records().len(), 1);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (0i64..100_000, 0u32..3).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

fn arb_record() -> impl Strategy<Value = MedicineRecord> {
    (1i64..1_000_000, "[A-Za-z ]{1,20}", arb_quantity(), arb_quantity(), arb_quantity()).prop_map(
        |(id, name, total, added, used)| MedicineRecord {
            id,
            name,
            total_quantity: total,
            added_quantity: added,
            used_quantity: used,
            last_updated: None,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn remaining_is_always_recomputed(record in arb_record()) {
        prop_assert_eq!(
            remaining(&record),
            record.total_quantity + record.added_quantity - record.used_quantity
        );
    }

    #[test]
    fn rollover_carries_remaining_and_clears_movements(records in prop::collection::vec(arb_record(), 0..20)) {
        let rolled = rollover_all(&records);
        prop_assert_eq!(rolled.len(), records.len());
        for (before, after) in records.iter().zip(&rolled) {
            prop_assert_eq!(after.id, before.id);
            prop_assert_eq!(&after.name, &before.name);
            prop_assert_eq!(after.total_quantity, remaining(before));
            prop_assert_eq!(after.added_quantity, Decimal::ZERO);
            prop_assert_eq!(after.used_quantity, Decimal::ZERO);
        }
    }

    #[test]
    fn status_follows_the_threshold(value in -50i64..50) {
        let expected = if value <= 0 {
            StockStatus::OutOfStock
        } else if value < 10 {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        };
        prop_assert_eq!(status_of(Decimal::from(value)), expected);
    }
}
