use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::model::attendance_event::AttendanceEvent;
use crate::model::staff::{StaffDirectoryEntry, StaffIndex};
use crate::utils::time::{minutes_of_day, minutes_to_time_string};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DeviationKind {
    LateArrival,
    EarlyDeparture,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DeviationRecord {
    pub staff_id: u64,
    pub staff_name: String,
    #[schema(example = "2024-01-15", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "09:00")]
    pub scheduled_time: String,
    #[schema(example = "09:15")]
    pub actual_time: String,
    #[schema(example = 15)]
    pub deviation_minutes: i64,
    /// Id of the attendance event that was flagged.
    pub event_id: u64,
}

/// Check-ins later than the scheduled start by more than `threshold_minutes`.
pub fn late_arrivals(
    events: &[AttendanceEvent],
    staff: &StaffIndex<'_>,
    threshold_minutes: u32,
) -> Vec<DeviationRecord> {
    detect(events, staff, threshold_minutes, DeviationKind::LateArrival)
}

/// Check-outs earlier than the scheduled end by more than `threshold_minutes`.
pub fn early_departures(
    events: &[AttendanceEvent],
    staff: &StaffIndex<'_>,
    threshold_minutes: u32,
) -> Vec<DeviationRecord> {
    detect(events, staff, threshold_minutes, DeviationKind::EarlyDeparture)
}

fn detect(
    events: &[AttendanceEvent],
    staff: &StaffIndex<'_>,
    threshold_minutes: u32,
    kind: DeviationKind,
) -> Vec<DeviationRecord> {
    let threshold = i64::from(threshold_minutes);

    events
        .iter()
        .filter(|event| match kind {
            DeviationKind::LateArrival => event.is_check_in(),
            DeviationKind::EarlyDeparture => event.is_check_out(),
        })
        .filter_map(|event| {
            let entry = staff.get(&event.staff_id)?;
            let (scheduled, scheduled_time) = schedule_for(entry, kind)?;
            let actual = i64::from(minutes_of_day(&event.timestamp));

            let deviation = match kind {
                DeviationKind::LateArrival => actual - scheduled,
                DeviationKind::EarlyDeparture => scheduled - actual,
            };
            if deviation <= threshold {
                return None;
            }

            Some(DeviationRecord {
                staff_id: entry.staff_id,
                staff_name: entry.name.clone(),
                date: event.date(),
                scheduled_time: scheduled_time.to_string(),
                actual_time: minutes_to_time_string(actual as u32),
                deviation_minutes: deviation,
                event_id: event.id,
            })
        })
        .collect()
}

// Unparseable schedules count as no schedule.
fn schedule_for(entry: &StaffDirectoryEntry, kind: DeviationKind) -> Option<(i64, &str)> {
    let (minutes, raw) = match kind {
        DeviationKind::LateArrival => (
            entry.scheduled_start_minutes()?,
            entry.scheduled_start_time.as_deref()?,
        ),
        DeviationKind::EarlyDeparture => (
            entry.scheduled_end_minutes()?,
            entry.scheduled_end_time.as_deref()?,
        ),
    };
    Some((i64::from(minutes), raw.trim()))
}

pub fn flagged_event_ids(records: &[DeviationRecord]) -> HashSet<u64> {
    records.iter().map(|record| record.event_id).collect()
}
