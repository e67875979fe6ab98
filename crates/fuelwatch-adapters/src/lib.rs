//! Concrete gateways for fuelwatch
//!
//! Provides:
//! - HTTP client for the upstream station API
//! - Composite gateway backed by that client and the SQLite store
//! - Reminder rendering and a file-based mail outbox

mod gateway;
mod http;
mod notice;
mod outbox;

pub use gateway::*;
pub use http::*;
pub use notice::*;
pub use outbox::*;
