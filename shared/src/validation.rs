//! Input coercion and validation for ledger edits

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

/// Longest medicine name accepted from an edit
pub const MAX_NAME_LENGTH: usize = 200;

/// Largest quantity a field may hold; coerced input is clamped to it
pub const MAX_QUANTITY: i64 = 1_000_000_000_000;

/// Coerce free text to a quantity the way the entry form does
///
/// Blank, unparsable and non-finite input all become zero.
pub fn coerce_quantity(input: &str) -> Decimal {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map(clamp_quantity)
        .or_else(|_| trimmed.parse::<f64>().map(coerce_float_quantity))
        .unwrap_or(Decimal::ZERO)
}

/// Coerce an arbitrary JSON value to a quantity
pub fn coerce_json_quantity(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => clamp_quantity(Decimal::from(i)),
            None => coerce_quantity(&n.to_string()),
        },
        Value::String(s) => coerce_quantity(s),
        Value::Bool(true) => Decimal::ONE,
        _ => Decimal::ZERO,
    }
}

/// Coerce a float read from a spreadsheet cell
pub fn coerce_float_quantity(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    let limit = MAX_QUANTITY as f64;
    if value.abs() > limit {
        return clamp_quantity(if value > 0.0 { Decimal::MAX } else { Decimal::MIN });
    }
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

/// Pull a quantity into `-MAX_QUANTITY..=MAX_QUANTITY`
pub fn clamp_quantity(quantity: Decimal) -> Decimal {
    let limit = Decimal::from(MAX_QUANTITY);
    quantity.clamp(-limit, limit)
}

/// Quantities entered by hand must not be negative or absurdly large
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Quantity cannot be negative");
    }
    if quantity > Decimal::from(MAX_QUANTITY) {
        return Err("Quantity is too large");
    }
    Ok(())
}

pub fn validate_medicine_name(name: &str) -> Result<(), &'static str> {
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err("Medicine name is too long");
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date key
pub fn parse_date_key(raw: &str) -> Result<NaiveDate, &'static str> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| "Date must be formatted as YYYY-MM-DD")
}
