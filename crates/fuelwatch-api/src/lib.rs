//! Shared data model for fuelwatch
//!
//! This crate defines the types exchanged between the monitor core and its
//! readers:
//! - Station records and their fuel state
//! - Cache snapshots and scheduler state
//! - Fuel shopping lists and low-fuel notices

mod shopping;
mod snapshot;
mod types;

pub use shopping::*;
pub use snapshot::*;
pub use types::*;
