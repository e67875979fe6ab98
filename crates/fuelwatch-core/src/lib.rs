//! Station cache, refresh scheduler and fuel depletion engine for fuelwatch
//!
//! This crate is the heart of fuelwatch, containing:
//! - The station cache (atomic snapshot replacement)
//! - The refresh scheduler (Idle -> Refreshing -> Idle, coalesced triggers)
//! - Fuel depletion simulation and low-fuel reminder tracking
//! - Fuel shopping list aggregation

mod cache;
mod depletion;
mod error;
mod monitor;
mod refresh;
mod reminders;
mod scheduler;
mod shopping;
mod ticker;

pub use cache::*;
pub use depletion::*;
pub use error::*;
pub use monitor::*;
pub use refresh::{FetchedFleet, SnapshotFetcher};
pub use reminders::*;
pub use scheduler::*;
pub use shopping::*;
pub use ticker::*;
