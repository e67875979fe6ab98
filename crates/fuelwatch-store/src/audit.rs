//! Audit event types

use chrono::{DateTime, Local};
use fuelwatch_util::{RefreshId, StationId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Station cache replaced
    RefreshCompleted {
        refresh_id: RefreshId,
        station_count: usize,
        expiry: DateTime<Local>,
    },

    /// Refresh aborted, stale cache kept
    RefreshFailed { refresh_id: RefreshId, error: String },

    /// Station entered a low-fuel episode
    ReminderRaised {
        station_id: StationId,
        station_name: String,
        remaining_hours: u64,
    },

    /// Station recovered above the threshold
    ReminderCleared { station_id: StationId },

    /// Delivery to one recipient failed
    NotificationFailed { recipient: String, error: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: fuelwatch_util::now(),
            event,
        }
    }
}
