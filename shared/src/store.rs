//! Ledger persistence over a synchronous key-value medium
//!
//! [`KeyValueStore`] is the seam: the browser build plugs in local storage,
//! the server a directory of files, and tests the in-memory [`MemoryStore`].
//! [`LedgerStore`] layers the ledger key layout on top of it.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::models::MedicineRecord;
use crate::types::{ledger_key, LAST_AUTO_BACKUP_KEY, LAST_CHECK_KEY};
use crate::validation::parse_date_key;

/// Failures of the underlying storage medium
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not serialize ledger: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Synchronous string key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory store with an optional quota
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota_bytes: Option<usize>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Make every subsequent write fail as if the medium were gone
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        if let Some(limit) = self.quota_bytes {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > limit {
                return Err(StoreError::QuotaExceeded { needed, limit });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed access to per-day ledgers and the two control markers
#[derive(Debug, Clone)]
pub struct LedgerStore<S> {
    inner: S,
}

impl<S: KeyValueStore> LedgerStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Ledger saved for `date`
    ///
    /// Unreadable or unparsable entries count as absent.
    pub fn get(&self, date: NaiveDate) -> Option<Vec<MedicineRecord>> {
        let key = ledger_key(date);
        let raw = match self.inner.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!("Failed to read {}: {}", key, err);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(records) => Some(records),
            Err(err) => {
                tracing::warn!("Ignoring corrupt ledger {}: {}", key, err);
                None
            }
        }
    }

    pub fn put(&mut self, date: NaiveDate, records: &[MedicineRecord]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(records)?;
        self.inner.put(&ledger_key(date), &raw)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.inner.contains(&ledger_key(date)).unwrap_or(false)
    }

    pub fn last_checked(&self) -> Option<NaiveDate> {
        self.read_marker(LAST_CHECK_KEY)
    }

    pub fn set_last_checked(&mut self, date: NaiveDate) -> Result<(), StoreError> {
        self.write_marker(LAST_CHECK_KEY, date)
    }

    pub fn last_auto_export(&self) -> Option<NaiveDate> {
        self.read_marker(LAST_AUTO_BACKUP_KEY)
    }

    pub fn set_last_auto_export(&mut self, date: NaiveDate) -> Result<(), StoreError> {
        self.write_marker(LAST_AUTO_BACKUP_KEY, date)
    }

    /// Dates within the last `days` days (today included) that have a ledger,
    /// newest first
    pub fn history(&self, today: NaiveDate, days: u32) -> Vec<NaiveDate> {
        (0..i64::from(days))
            .map(|offset| today - Duration::days(offset))
            .filter(|date| self.contains(*date))
            .collect()
    }

    fn read_marker(&self, key: &str) -> Option<NaiveDate> {
        match self.inner.get(key) {
            Ok(Some(raw)) => parse_date_key(&raw).ok(),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!("Failed to read {}: {}", key, err);
                None
            }
        }
    }

    fn write_marker(&mut self, key: &str, date: NaiveDate) -> Result<(), StoreError> {
        self.inner.put(key, &date.format("%Y-%m-%d").to_string())
    }
}
