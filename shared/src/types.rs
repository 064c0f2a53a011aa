//! Common types used across the inventory tracker

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Record identifier; persisted as a plain JSON number
pub type MedicineId = i64;

/// Milliseconds since the Unix epoch
pub type Timestamp = i64;

/// Prefix of every per-day ledger key
pub const LEDGER_KEY_PREFIX: &str = "medicines-";

/// Date the startup catch-up last ran for
pub const LAST_CHECK_KEY: &str = "lastCheckDate";

/// Date the automatic 00:01 day-end last ran on
pub const LAST_AUTO_BACKUP_KEY: &str = "lastAutoBackup";

/// How far back the history view looks
pub const HISTORY_WINDOW_DAYS: u32 = 30;

/// Storage key for the ledger of `date`
pub fn ledger_key(date: NaiveDate) -> String {
    format!("{}{}", LEDGER_KEY_PREFIX, date.format("%Y-%m-%d"))
}

/// What to do with the current ledger when importing a workbook
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Imported rows become the whole ledger
    Replace,
    /// Imported rows are appended after the existing ones
    Merge,
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Error,
}

/// Transient message surfaced to whoever is driving the session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Success,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Info,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Error,
        }
    }
}

/// Long-form date used in notifications, e.g. "Tuesday, January 2, 2024"
pub fn format_date_display(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}
