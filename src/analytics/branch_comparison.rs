use chrono::Timelike;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance_event::AttendanceEvent;
use crate::model::branch::Branch;
use crate::model::staff::StaffDirectoryEntry;
use crate::utils::time::{minutes_to_hours, round2};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BranchMetrics {
    pub branch_id: u64,
    pub branch_name: String,
    pub staff_count: usize,
    pub total_hours_worked: f64,
    pub total_minutes_worked: i64,
    pub shift_count: usize,
    pub avg_hours_per_staff: f64,
    /// Hours per staff member, comparable across branch sizes.
    pub normalized_hours: f64,
    pub normalized_shifts: f64,
    #[schema(example = 8, nullable = true)]
    pub peak_hour: Option<u32>,
    #[schema(example = "08:00", nullable = true)]
    pub peak_hour_formatted: Option<String>,
    pub peak_check_in_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct BranchSummary {
    pub total_branches: usize,
    pub total_staff: usize,
    pub total_hours_worked: f64,
    pub avg_hours_per_branch: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BranchComparison {
    pub branches: Vec<BranchMetrics>,
    pub summary: BranchSummary,
}

pub fn branch_staff_count(
    directory: &[StaffDirectoryEntry],
    branch_id: u64,
    role: Option<&str>,
) -> usize {
    directory
        .iter()
        .filter(|entry| entry.is_active && entry.branch_id == Some(branch_id))
        .filter(|entry| role.is_none_or(|role| entry.role == role))
        .count()
}

/// Per-staff hours; zero when the branch has no staff.
pub fn normalized_hours(total_hours: f64, staff_count: usize) -> f64 {
    if staff_count == 0 {
        return 0.0;
    }
    round2(total_hours / staff_count as f64)
}

/// Hour of day with the most check-ins, and that count.
///
/// Ties go to the earliest hour.
pub fn peak_hour<'a>(check_ins: impl IntoIterator<Item = &'a AttendanceEvent>) -> Option<(u32, usize)> {
    let mut counts = [0usize; 24];
    for event in check_ins {
        counts[event.timestamp.hour() as usize] += 1;
    }

    let mut peak: Option<(u32, usize)> = None;
    for (hour, count) in counts.into_iter().enumerate() {
        if count > peak.map_or(0, |(_, best)| best) {
            peak = Some((hour as u32, count));
        }
    }
    peak
}

/// Compare active branches on headcount, hours and peak check-in hour.
///
/// `events` is expected to be already scoped to the organization and range.
pub fn compare_branches(
    branches: &[Branch],
    directory: &[StaffDirectoryEntry],
    events: &[AttendanceEvent],
    role: Option<&str>,
) -> BranchComparison {
    let metrics: Vec<BranchMetrics> = branches
        .iter()
        .filter(|branch| branch.is_active)
        .map(|branch| branch_metrics(branch, directory, events, role))
        .collect();

    let total_staff = metrics.iter().map(|m| m.staff_count).sum();
    let total_hours: f64 = metrics.iter().map(|m| m.total_hours_worked).sum();
    let avg_hours_per_branch = if metrics.is_empty() {
        0.0
    } else {
        round2(total_hours / metrics.len() as f64)
    };

    BranchComparison {
        summary: BranchSummary {
            total_branches: metrics.len(),
            total_staff,
            total_hours_worked: round2(total_hours),
            avg_hours_per_branch,
        },
        branches: metrics,
    }
}

fn branch_metrics(
    branch: &Branch,
    directory: &[StaffDirectoryEntry],
    events: &[AttendanceEvent],
    role: Option<&str>,
) -> BranchMetrics {
    let in_branch = || {
        events
            .iter()
            .filter(move |event| event.branch_id == Some(branch.branch_id))
    };

    let staff_count = branch_staff_count(directory, branch.branch_id, role);

    let (total_minutes, shift_count) = in_branch()
        .filter_map(AttendanceEvent::recorded_shift_minutes)
        .fold((0i64, 0usize), |(minutes, shifts), worked| (minutes + worked, shifts + 1));
    let total_hours = minutes_to_hours(total_minutes);

    let peak = peak_hour(in_branch().filter(|event| event.is_check_in()));
    let per_staff = normalized_hours(total_hours, staff_count);

    BranchMetrics {
        branch_id: branch.branch_id,
        branch_name: branch.name.clone(),
        staff_count,
        total_hours_worked: total_hours,
        total_minutes_worked: total_minutes,
        shift_count,
        avg_hours_per_staff: per_staff,
        normalized_hours: per_staff,
        normalized_shifts: normalized_hours(shift_count as f64, staff_count),
        peak_hour: peak.map(|(hour, _)| hour),
        peak_hour_formatted: peak.map(|(hour, _)| format!("{:02}:00", hour)),
        peak_check_in_count: peak.map_or(0, |(_, count)| count),
    }
}
