//! Domain models for the medicine inventory ledger

mod ledger;
mod medicine;
mod status;

pub use ledger::*;
pub use medicine::*;
pub use status::*;
