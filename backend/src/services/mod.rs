//! Business logic services for the medicine inventory server

pub mod inventory;
pub mod scheduler;
pub mod spreadsheet;

pub use inventory::{InventoryService, SharedSession};
pub use scheduler::{DayEndScheduler, SchedulerSettings};
pub use spreadsheet::XlsxExporter;
