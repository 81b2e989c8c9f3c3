use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::analytics::error::AnalyticsError;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    CheckIn,
    CheckOut,
}

/// A single check-in or check-out fact. Never mutated by the analytics engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: u64,
    pub staff_id: u64,
    pub organization_id: u64,
    pub branch_id: Option<u64>,
    pub event_type: EventType,
    pub timestamp: NaiveDateTime,
    /// Set by the producer on check-outs it could pair with a check-in.
    pub shift_duration_minutes: Option<i64>,
    pub custom_status: Option<String>,
}

impl AttendanceEvent {
    pub fn is_check_in(&self) -> bool {
        self.event_type == EventType::CheckIn
    }

    pub fn is_check_out(&self) -> bool {
        self.event_type == EventType::CheckOut
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Shift length usable for hour and overtime sums.
    ///
    /// Only check-outs carry one; negative durations are treated as absent.
    pub fn recorded_shift_minutes(&self) -> Option<i64> {
        if !self.is_check_out() {
            return None;
        }
        self.shift_duration_minutes.filter(|minutes| *minutes >= 0)
    }
}

/// Row shape of the `attendance_events` table.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceEventRow {
    pub id: u64,
    pub staff_id: u64,
    pub organization_id: u64,
    pub branch_id: Option<u64>,
    pub event_type: String,
    pub timestamp: NaiveDateTime,
    pub shift_duration_minutes: Option<i64>,
    pub custom_status: Option<String>,
}

impl TryFrom<AttendanceEventRow> for AttendanceEvent {
    type Error = AnalyticsError;

    fn try_from(row: AttendanceEventRow) -> Result<Self, Self::Error> {
        let event_type = EventType::from_str(&row.event_type).map_err(|_| {
            AnalyticsError::MalformedEvent {
                event_id: row.id,
                event_type: row.event_type.clone(),
            }
        })?;

        Ok(AttendanceEvent {
            id: row.id,
            staff_id: row.staff_id,
            organization_id: row.organization_id,
            branch_id: row.branch_id,
            event_type,
            timestamp: row.timestamp,
            shift_duration_minutes: row.shift_duration_minutes,
            custom_status: row.custom_status,
        })
    }
}
