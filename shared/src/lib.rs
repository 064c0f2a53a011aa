//! Shared types and ledger logic for the medicine store inventory tracker
//!
//! This crate holds everything that does not touch a file system or a
//! network: the data model, the stock derivations, the ledger store contract
//! and the day-state machine. It is used by the backend server and, through
//! WASM, by the browser.

pub mod error;
pub mod import;
pub mod models;
pub mod session;
pub mod store;
pub mod types;
pub mod validation;

pub use error::*;
pub use import::*;
pub use models::*;
pub use session::*;
pub use store::*;
pub use types::*;
pub use validation::*;
