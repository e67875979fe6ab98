//! Core error types

use fuelwatch_gateway::{GatewayError, NotifyError};
use fuelwatch_util::StationId;
use thiserror::Error;

/// Errors raised by the monitor core
#[derive(Debug, Error)]
pub enum CoreError {
    /// Station list, details or credentials could not be fetched
    #[error("Upstream unavailable while fetching {what}: {source}")]
    UpstreamUnavailable {
        what: String,
        #[source]
        source: GatewayError,
    },

    /// A reference lookup (usage, name, capacity, location) failed
    #[error("Reference data missing for {what}: {source}")]
    ReferenceDataMissing {
        what: String,
        #[source]
        source: GatewayError,
    },

    /// Station burns recognized fuel at a rate of zero
    #[error("Station {station_id} reports zero fuel usage")]
    InvalidDepletionState { station_id: StationId },

    /// Delivery to one recipient failed
    #[error("Notification to {recipient} failed: {source}")]
    NotificationDeliveryFailed {
        recipient: String,
        #[source]
        source: NotifyError,
    },
}

impl CoreError {
    pub(crate) fn upstream(what: impl Into<String>, source: GatewayError) -> Self {
        CoreError::UpstreamUnavailable {
            what: what.into(),
            source,
        }
    }

    pub(crate) fn reference(what: impl Into<String>, source: GatewayError) -> Self {
        CoreError::ReferenceDataMissing {
            what: what.into(),
            source,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
