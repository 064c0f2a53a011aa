//! Medicine records and the stock arithmetic derived from them

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{MedicineId, Timestamp};

/// One medicine's line in a day's ledger
///
/// Only the three quantity fields are stored; the closing stock is always
/// recomputed through [`remaining`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRecord {
    pub id: MedicineId,
    #[serde(default, deserialize_with = "lenient::name")]
    pub name: String,
    /// Opening stock for the day
    #[serde(default, with = "lenient::quantity")]
    pub total_quantity: Decimal,
    #[serde(default, with = "lenient::quantity")]
    pub added_quantity: Decimal,
    #[serde(default, with = "lenient::quantity")]
    pub used_quantity: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

impl MedicineRecord {
    /// A blank row as created by "Add Medicine"
    pub fn blank(id: MedicineId) -> Self {
        Self {
            id,
            name: String::new(),
            total_quantity: Decimal::ZERO,
            added_quantity: Decimal::ZERO,
            used_quantity: Decimal::ZERO,
            last_updated: None,
        }
    }

    pub fn remaining(&self) -> Decimal {
        remaining(self)
    }

    /// Key used when ordering rows for display
    pub fn display_order_key(&self) -> i64 {
        self.last_updated.unwrap_or(self.id)
    }
}

/// Closing stock: opening + added - used
///
/// Can go negative; callers classify anything at or below zero as out of stock.
/// Saturates at the `Decimal` bounds instead of overflowing.
pub fn remaining(record: &MedicineRecord) -> Decimal {
    record
        .total_quantity
        .saturating_add(record.added_quantity)
        .saturating_sub(record.used_quantity)
}

/// Carry a record into the next day
///
/// The closing stock becomes the new opening stock, the day's movements reset
/// to zero and `lastUpdated` is dropped so the row sorts by its id again.
pub fn rollover(record: &MedicineRecord) -> MedicineRecord {
    MedicineRecord {
        id: record.id,
        name: record.name.clone(),
        total_quantity: remaining(record),
        added_quantity: Decimal::ZERO,
        used_quantity: Decimal::ZERO,
        last_updated: None,
    }
}

/// Roll every record of a ledger forward, preserving order
pub fn rollover_all(records: &[MedicineRecord]) -> Vec<MedicineRecord> {
    records.iter().map(rollover).collect()
}

/// Serde helpers accepting whatever a browser ever wrote into storage
pub(super) mod lenient {
    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn name<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub mod quantity {
        use super::*;

        pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value.normalize().to_i64() {
                Some(whole) if value.fract().is_zero() => serializer.serialize_i64(whole),
                _ => serializer.serialize_f64(value.to_f64().unwrap_or(0.0)),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
        where
            D: Deserializer<'de>,
        {
            let value = Value::deserialize(deserializer)?;
            Ok(crate::validation::coerce_json_quantity(&value))
        }
    }
}
