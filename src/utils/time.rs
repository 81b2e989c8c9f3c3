use chrono::{NaiveDateTime, Timelike};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parse an "HH:MM" clock string into minutes since midnight.
///
/// Empty or malformed strings yield `None`, which callers treat as
/// "no schedule" rather than as an error.
pub fn time_string_to_minutes(value: &str) -> Option<u32> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = minutes.trim().parse().ok()?;

    if hours >= 24 || minutes >= 60 {
        return None;
    }

    Some(hours * 60 + minutes)
}

/// Render minutes since midnight as a zero-padded "HH:MM" string.
pub fn minutes_to_time_string(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Minutes since midnight of a timestamp, ignoring date and seconds.
pub fn minutes_of_day(timestamp: &NaiveDateTime) -> u32 {
    timestamp.hour() * 60 + timestamp.minute()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn minutes_to_hours(minutes: i64) -> f64 {
    round2(minutes as f64 / 60.0)
}
