//! Errors raised by ledger operations

use thiserror::Error;

use crate::store::StoreError;
use crate::types::MedicineId;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Medicine {0} not found")]
    NotFound(MedicineId),

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("No valid data found in the imported file")]
    EmptyImport,

    #[error("No data to export")]
    NothingToExport,

    #[error("Export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
