//! Shared utilities for fuelwatch
//!
//! This crate provides:
//! - ID types (StationId, TypeId, LocationId, RefreshId)
//! - Time utilities (mockable wall clock, deadline and duration helpers)
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
