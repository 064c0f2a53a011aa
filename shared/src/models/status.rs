//! Stock status classification

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Closing stock below this (and above zero) counts as low
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Stock level category shown next to each medicine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// Remaining stock at or below zero
    OutOfStock,
    /// 0 < remaining < 10
    LowStock,
    /// 10 or more
    InStock,
}

impl StockStatus {
    /// Badge colour used by the dashboard
    pub fn badge(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "red",
            StockStatus::LowStock => "yellow",
            StockStatus::InStock => "green",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockStatus::OutOfStock => write!(f, "Out of Stock"),
            StockStatus::LowStock => write!(f, "Low Stock"),
            StockStatus::InStock => write!(f, "In Stock"),
        }
    }
}

/// Classify a closing stock value
pub fn status_of(remaining: Decimal) -> StockStatus {
    if remaining <= Decimal::ZERO {
        StockStatus::OutOfStock
    } else if remaining < Decimal::from(LOW_STOCK_THRESHOLD) {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        assert_eq!(status_of(Decimal::from(-4)), StockStatus::OutOfStock);
        assert_eq!(status_of(Decimal::ZERO), StockStatus::OutOfStock);
        assert_eq!(status_of(Decimal::new(1, 1)), StockStatus::LowStock);
        assert_eq!(status_of(Decimal::from(9)), StockStatus::LowStock);
        assert_eq!(status_of(Decimal::new(999, 2)), StockStatus::LowStock);
        assert_eq!(status_of(Decimal::from(10)), StockStatus::InStock);
        assert_eq!(status_of(Decimal::from(250)), StockStatus::InStock);
    }

    #[test]
    fn display_matches_export_labels() {
        assert_eq!(StockStatus::OutOfStock.to_string(), "Out of Stock");
        assert_eq!(StockStatus::LowStock.to_string(), "Low Stock");
        assert_eq!(StockStatus::InStock.to_string(), "In Stock");
    }
}
