//! HTTP request handlers

pub mod health;
pub mod history;
pub mod inventory;

pub use health::health_check;
pub use history::*;
pub use inventory::*;
