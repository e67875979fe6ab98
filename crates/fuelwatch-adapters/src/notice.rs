//! Plain-text rendering of fuel reminders

use fuelwatch_api::LowFuelStation;
use fuelwatch_gateway::Recipient;
use fuelwatch_util::format_hours;
use std::fmt::Write;

pub const REMINDER_SUBJECT: &str = "fuelwatch - Station fuel reminder";

/// A rendered reminder ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub subject: String,
    pub body: String,
}

/// Render one reminder covering the whole batch.
///
/// `public_url` points at the web front end; when absent the link line is
/// left out.
pub fn render_fuel_reminder(
    recipient: &Recipient,
    batch: &[LowFuelStation],
    public_url: Option<&str>,
) -> ReminderMessage {
    let mut body = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(body, "Hello {},", recipient.username);
    let _ = writeln!(body);
    let _ = writeln!(body, "The following stations are running low on fuel:");
    let _ = writeln!(body);

    for station in batch {
        let _ = writeln!(
            body,
            "  - {} ({}) at {}: {} x {}, {} left",
            station.name,
            station.type_name,
            station.location_name,
            station.quantity,
            station.fuel_type_name,
            format_hours(station.remaining_hours),
        );
    }

    if let Some(url) = public_url {
        let _ = writeln!(body);
        let _ = writeln!(body, "Check {}/stations for details.", url.trim_end_matches('/'));
    }

    ReminderMessage {
        subject: REMINDER_SUBJECT.to_string(),
        body,
    }
}
