//! Time-of-day averages, hours worked and overtime over fetched events.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::model::attendance_event::{AttendanceEvent, EventType};
use crate::model::staff::StaffIndex;
use crate::models::GroupBy;
use crate::utils::time::{minutes_of_day, minutes_to_hours, minutes_to_time_string, round2};

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct TimingAverage {
    #[schema(example = 548, nullable = true)]
    pub avg_check_in_minutes: Option<u32>,
    #[schema(example = "09:08", nullable = true)]
    pub avg_check_in: Option<String>,
    #[schema(example = 1022, nullable = true)]
    pub avg_check_out_minutes: Option<u32>,
    #[schema(example = "17:02", nullable = true)]
    pub avg_check_out: Option<String>,
    pub check_in_count: usize,
    pub check_out_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PeriodHours {
    #[schema(example = "2024-01-15")]
    pub period: String,
    pub total_minutes: i64,
    pub total_hours: f64,
    pub shift_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HoursWorked {
    pub total_minutes: i64,
    pub total_hours: f64,
    pub total_shifts: usize,
    pub periods: Vec<PeriodHours>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyOvertime {
    #[schema(example = "2024-01-15", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub minutes_worked: i64,
    pub overtime_minutes: i64,
    pub hours_worked: f64,
    pub overtime_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OvertimeRecord {
    pub staff_id: u64,
    pub staff_name: String,
    pub total_minutes_worked: i64,
    pub total_overtime_minutes: i64,
    pub total_hours_worked: f64,
    pub total_overtime_hours: f64,
    pub average_hours_per_shift: f64,
    pub shift_count: usize,
    pub daily_records: Vec<DailyOvertime>,
}

/// Linear mean of the clock time of each timestamp, rounded half up.
///
/// This is not a circular mean: 23:50 and 00:10 average to 12:00. Shifts that
/// straddle midnight get a misleading average.
pub fn average_time_of_day(timestamps: &[NaiveDateTime]) -> Option<u32> {
    if timestamps.is_empty() {
        return None;
    }

    let total: u64 = timestamps
        .iter()
        .map(|ts| u64::from(minutes_of_day(ts)))
        .sum();
    let count = timestamps.len() as u64;

    Some(((2 * total + count) / (2 * count)) as u32)
}

pub fn average_timings(events: &[AttendanceEvent]) -> BTreeMap<u64, TimingAverage> {
    let mut grouped: BTreeMap<(u64, EventType), Vec<NaiveDateTime>> = BTreeMap::new();
    for event in events {
        grouped
            .entry((event.staff_id, event.event_type))
            .or_default()
            .push(event.timestamp);
    }

    let mut timings: BTreeMap<u64, TimingAverage> = BTreeMap::new();
    for ((staff_id, event_type), timestamps) in grouped {
        let average = average_time_of_day(&timestamps);
        let entry = timings.entry(staff_id).or_default();
        match event_type {
            EventType::CheckIn => {
                entry.avg_check_in_minutes = average;
                entry.avg_check_in = average.map(minutes_to_time_string);
                entry.check_in_count = timestamps.len();
            }
            EventType::CheckOut => {
                entry.avg_check_out_minutes = average;
                entry.avg_check_out = average.map(minutes_to_time_string);
                entry.check_out_count = timestamps.len();
            }
        }
    }

    timings
}

/// Hours per staff member, bucketed by `group_by`.
///
/// Check-outs without a recorded duration are left out, not counted as zero.
pub fn hours_worked(events: &[AttendanceEvent], group_by: GroupBy) -> BTreeMap<u64, HoursWorked> {
    let mut buckets: BTreeMap<u64, BTreeMap<String, (i64, usize)>> = BTreeMap::new();
    for event in events {
        let Some(minutes) = event.recorded_shift_minutes() else {
            continue;
        };
        let bucket = buckets
            .entry(event.staff_id)
            .or_default()
            .entry(group_by.period_label(&event.timestamp))
            .or_default();
        bucket.0 += minutes;
        bucket.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(staff_id, periods)| {
            let periods: Vec<PeriodHours> = periods
                .into_iter()
                .map(|(period, (total_minutes, shift_count))| PeriodHours {
                    period,
                    total_minutes,
                    total_hours: minutes_to_hours(total_minutes),
                    shift_count,
                })
                .collect();
            let total_minutes = periods.iter().map(|p| p.total_minutes).sum();
            let total_shifts = periods.iter().map(|p| p.shift_count).sum();

            (
                staff_id,
                HoursWorked {
                    total_minutes,
                    total_hours: minutes_to_hours(total_minutes),
                    total_shifts,
                    periods,
                },
            )
        })
        .collect()
}

pub fn overtime_minutes(actual_minutes: i64, standard_minutes: i64) -> i64 {
    actual_minutes.saturating_sub(standard_minutes).max(0)
}

pub fn standard_minutes(standard_hours_per_day: f64) -> i64 {
    (standard_hours_per_day * 60.0).round() as i64
}

/// Per-shift overtime against a standard day, summed per staff member.
///
/// Staff without a directory entry are skipped.
pub fn overtime_report(
    events: &[AttendanceEvent],
    staff: &StaffIndex<'_>,
    standard_hours_per_day: f64,
) -> BTreeMap<u64, OvertimeRecord> {
    let standard = standard_minutes(standard_hours_per_day);
    let mut report: BTreeMap<u64, OvertimeRecord> = BTreeMap::new();

    for event in events {
        let Some(worked) = event.recorded_shift_minutes() else {
            continue;
        };
        let Some(entry) = staff.get(&event.staff_id) else {
            continue;
        };

        let overtime = overtime_minutes(worked, standard);
        let record = report
            .entry(event.staff_id)
            .or_insert_with(|| OvertimeRecord {
                staff_id: entry.staff_id,
                staff_name: entry.name.clone(),
                total_minutes_worked: 0,
                total_overtime_minutes: 0,
                total_hours_worked: 0.0,
                total_overtime_hours: 0.0,
                average_hours_per_shift: 0.0,
                shift_count: 0,
                daily_records: Vec::new(),
            });

        record.total_minutes_worked += worked;
        record.total_overtime_minutes += overtime;
        record.shift_count += 1;
        record.daily_records.push(DailyOvertime {
            date: event.date(),
            minutes_worked: worked,
            overtime_minutes: overtime,
            hours_worked: minutes_to_hours(worked),
            overtime_hours: minutes_to_hours(overtime),
        });
    }

    for record in report.values_mut() {
        record.total_hours_worked = minutes_to_hours(record.total_minutes_worked);
        record.total_overtime_hours = minutes_to_hours(record.total_overtime_minutes);
        record.average_hours_per_shift =
            average_hours_per_shift(record.total_minutes_worked, record.shift_count);
    }

    report
}

pub fn average_hours_per_shift(total_minutes: i64, shift_count: usize) -> f64 {
    if shift_count == 0 {
        return 0.0;
    }
    round2(total_minutes as f64 / shift_count as f64 / 60.0)
}
