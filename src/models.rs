use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::analytics::error::AnalyticsError;
use crate::model::attendance_event::EventType;

/// Inclusive time window an analytics request is scoped to.
///
/// A value of this type is always valid: `end` is never before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateRange {
    #[schema(example = "2024-01-01T00:00:00", format = "date-time", value_type = String)]
    start: NaiveDateTime,
    #[schema(example = "2024-01-31T23:59:59.999", format = "date-time", value_type = String)]
    end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, AnalyticsError> {
        if end < start {
            return Err(AnalyticsError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whole calendar days, from the first millisecond of `start_date` to the
    /// last millisecond of `end_date`.
    pub fn from_dates(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, AnalyticsError> {
        let start = start_date.and_time(chrono::NaiveTime::MIN);
        let end = end_date
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap_or_else(|| end_date.and_time(chrono::NaiveTime::MIN));
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub staff_id: Option<u64>,
    pub branch_id: Option<u64>,
    pub event_type: Option<EventType>,
}

impl EventFilter {
    pub fn event_type(event_type: EventType) -> Self {
        Self {
            event_type: Some(event_type),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaffFilter {
    pub branch_id: Option<u64>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl StaffFilter {
    pub fn active_with_role(role: Option<String>) -> Self {
        Self {
            branch_id: None,
            role,
            is_active: Some(true),
        }
    }
}

/// Bucket granularity for hours-worked aggregation.
#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Day,
    Week,
    Month,
}

impl GroupBy {
    /// Sortable bucket label: `2024-03-07`, `2024-W10` or `2024-03`.
    pub fn period_label(&self, timestamp: &NaiveDateTime) -> String {
        let date = timestamp.date();
        match self {
            GroupBy::Day => date.format("%Y-%m-%d").to_string(),
            GroupBy::Week => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            GroupBy::Month => date.format("%Y-%m").to_string(),
        }
    }
}
