use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::analytics::aggregation::OvertimeRecord;
use crate::analytics::deviation::{DeviationKind, DeviationRecord};
use crate::utils::time::round2;

/// Ratio of observed value to threshold at which severity becomes high.
pub const HIGH_SEVERITY_RATIO: f64 = 2.0;
/// Ratio of observed value to threshold at which severity becomes medium.
pub const MEDIUM_SEVERITY_RATIO: f64 = 1.5;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Tier of `value` relative to `threshold`. A non-positive threshold is
    /// always exceeded by a wide margin, so it rates high.
    pub fn from_ratio(value: f64, threshold: f64) -> Self {
        if threshold <= 0.0 {
            return Severity::High;
        }
        let ratio = value / threshold;
        if ratio >= HIGH_SEVERITY_RATIO {
            Severity::High
        } else if ratio >= MEDIUM_SEVERITY_RATIO {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    ConsecutiveLateArrivals,
    ConsecutiveEarlyDepartures,
}

impl From<DeviationKind> for PatternType {
    fn from(kind: DeviationKind) -> Self {
        match kind {
            DeviationKind::LateArrival => PatternType::ConsecutiveLateArrivals,
            DeviationKind::EarlyDeparture => PatternType::ConsecutiveEarlyDepartures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Pattern {
    pub staff_id: u64,
    pub staff_name: String,
    pub pattern_type: PatternType,
    /// Length of the longest run of consecutive flagged days.
    pub consecutive_count: usize,
    pub total_occurrences: usize,
    #[schema(value_type = Vec<String>, example = json!(["2024-01-15", "2024-01-16", "2024-01-17"]))]
    pub dates: Vec<NaiveDate>,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ExcessiveOvertime {
    pub staff_id: u64,
    pub staff_name: String,
    pub total_overtime_hours: f64,
    pub total_overtime_minutes: i64,
    pub total_hours_worked: f64,
    pub shift_count: usize,
    pub threshold_exceeded_by: f64,
    pub severity: Severity,
}

/// Longest run of strictly consecutive calendar days.
///
/// Order does not matter and duplicate dates count once.
pub fn longest_consecutive_run(dates: &[NaiveDate]) -> usize {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let Some(first) = sorted.first() else {
        return 0;
    };

    let mut longest = 1;
    let mut current = 1;
    let mut previous = *first;
    for date in sorted.into_iter().skip(1) {
        if previous.succ_opt() == Some(date) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
        previous = date;
    }
    longest
}

/// Staff whose flagged days contain a run of at least `consecutive_threshold`.
///
/// A threshold of zero is treated as one.
pub fn detect_patterns(
    late_arrivals: &[DeviationRecord],
    early_departures: &[DeviationRecord],
    consecutive_threshold: usize,
) -> Vec<Pattern> {
    let threshold = consecutive_threshold.max(1);
    let mut patterns = Vec::new();

    for (kind, records) in [
        (DeviationKind::LateArrival, late_arrivals),
        (DeviationKind::EarlyDeparture, early_departures),
    ] {
        let mut by_staff: BTreeMap<u64, Vec<&DeviationRecord>> = BTreeMap::new();
        for record in records {
            by_staff.entry(record.staff_id).or_default().push(record);
        }

        for (staff_id, records) in by_staff {
            let mut dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
            let run = longest_consecutive_run(&dates);
            if run < threshold {
                continue;
            }

            dates.sort_unstable();
            dates.dedup();
            patterns.push(Pattern {
                staff_id,
                staff_name: records[0].staff_name.clone(),
                pattern_type: kind.into(),
                consecutive_count: run,
                total_occurrences: records.len(),
                dates,
                severity: Severity::from_ratio(run as f64, threshold as f64),
            });
        }
    }

    patterns
}

pub fn exceeds_overtime_threshold(total_overtime_hours: f64, threshold_hours: f64) -> bool {
    total_overtime_hours >= threshold_hours
}

/// Staff at or above the overtime threshold, most overtime first.
pub fn excessive_overtime<'a>(
    report: impl IntoIterator<Item = &'a OvertimeRecord>,
    threshold_hours: f64,
) -> Vec<ExcessiveOvertime> {
    let mut flagged: Vec<ExcessiveOvertime> = report
        .into_iter()
        .filter(|record| exceeds_overtime_threshold(record.total_overtime_hours, threshold_hours))
        .map(|record| ExcessiveOvertime {
            staff_id: record.staff_id,
            staff_name: record.staff_name.clone(),
            total_overtime_hours: record.total_overtime_hours,
            total_overtime_minutes: record.total_overtime_minutes,
            total_hours_worked: record.total_hours_worked,
            shift_count: record.shift_count,
            threshold_exceeded_by: round2(record.total_overtime_hours - threshold_hours),
            severity: Severity::from_ratio(record.total_overtime_hours, threshold_hours),
        })
        .collect();

    flagged.sort_by(|a, b| {
        b.total_overtime_hours
            .partial_cmp(&a.total_overtime_hours)
            .unwrap_or(Ordering::Equal)
            .then(a.staff_id.cmp(&b.staff_id))
    });
    flagged
}
