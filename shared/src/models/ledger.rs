//! A single day's ledger and the listings derived from it

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{remaining, status_of, MedicineRecord, StockStatus};

/// The list of medicine records bound to one calendar date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayLedger {
    pub date: NaiveDate,
    pub records: Vec<MedicineRecord>,
}

impl DayLedger {
    pub fn new(date: NaiveDate, records: Vec<MedicineRecord>) -> Self {
        Self { date, records }
    }

    pub fn empty(date: NaiveDate) -> Self {
        Self::new(date, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> InventoryStats {
        InventoryStats::from_records(&self.records)
    }
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InventoryStats {
    pub total_medicines: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
}

impl InventoryStats {
    pub fn from_records(records: &[MedicineRecord]) -> Self {
        records.iter().fold(Self::default(), |mut stats, record| {
            stats.total_medicines += 1;
            match status_of(remaining(record)) {
                StockStatus::LowStock => stats.low_stock += 1,
                StockStatus::OutOfStock => stats.out_of_stock += 1,
                StockStatus::InStock => {}
            }
            stats
        })
    }
}

/// A record together with its derived closing stock and status
#[derive(Debug, Clone, Serialize)]
pub struct LedgerRow {
    #[serde(flatten)]
    pub record: MedicineRecord,
    #[serde(serialize_with = "super::medicine::lenient::quantity::serialize")]
    pub remaining: rust_decimal::Decimal,
    pub status: StockStatus,
}

impl From<&MedicineRecord> for LedgerRow {
    fn from(record: &MedicineRecord) -> Self {
        let remaining = remaining(record);
        Self {
            record: record.clone(),
            remaining,
            status: status_of(remaining),
        }
    }
}

/// Newest edits first; rows never edited fall back to their id
pub fn sort_for_display(records: &mut [MedicineRecord]) {
    records.sort_by(|a, b| b.display_order_key().cmp(&a.display_order_key()));
}

/// Case-insensitive substring match on the medicine name
///
/// The term is used as typed, surrounding whitespace included. An empty
/// term matches every record.
pub fn filter_by_name<'a>(
    records: &'a [MedicineRecord],
    term: &'a str,
) -> impl Iterator<Item = &'a MedicineRecord> + 'a {
    let needle = term.to_lowercase();
    records
        .iter()
        .filter(move |record| record.name.to_lowercase().contains(&needle))
}

/// Filtered, display-ordered rows for the table
pub fn listing(records: &[MedicineRecord], search: &str) -> Vec<LedgerRow> {
    let mut matched: Vec<MedicineRecord> = filter_by_name(records, search).cloned().collect();
    sort_for_display(&mut matched);
    matched.iter().map(LedgerRow::from).collect()
}
