//! Wall-clock timestamps as they appear on the wire.

use chrono::{DateTime, Local, TimeZone};

/// Layout used for every timestamp pushed to clients, e.g. `2025-01-31 14:05:09`.
pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format an instant with [`FORMAT`].
pub fn format<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format(FORMAT).to_string()
}

/// Current local time formatted with [`FORMAT`].
pub fn now() -> String {
    format(&Local::now())
}
