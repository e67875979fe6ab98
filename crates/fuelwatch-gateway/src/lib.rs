//! Gateway trait interfaces for fuelwatch
//!
//! This crate defines the seam between the monitor core and the outside
//! world: the upstream station API, the static reference dataset, and
//! reminder delivery. It contains no transport code itself.

mod mock;
mod traits;
mod types;

pub use mock::*;
pub use traits::*;
pub use types::*;
