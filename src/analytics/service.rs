use chrono::{DateTime, Utc};
use futures::try_join;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::analytics::aggregation::{self, HoursWorked, OvertimeRecord, TimingAverage};
use crate::analytics::branch_comparison::{self, BranchComparison};
use crate::analytics::deviation::{self, DeviationRecord};
use crate::analytics::error::AnalyticsError;
use crate::analytics::export::{self, ExportFlags};
use crate::analytics::pattern::{self, ExcessiveOvertime, Pattern};
use crate::model::attendance_event::{AttendanceEvent, EventType};
use crate::model::branch::Branch;
use crate::model::staff::{StaffDirectoryEntry, index_staff};
use crate::models::{DateRange, EventFilter, GroupBy, StaffFilter};
use crate::store::AttendanceStore;
use crate::utils::time::round2;

/// Defaults applied when a request leaves a parameter out.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSettings {
    pub standard_hours_per_day: f64,
    pub overtime_threshold_hours: f64,
    pub consecutive_threshold: usize,
    pub late_grace_minutes: u32,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            standard_hours_per_day: 8.0,
            overtime_threshold_hours: 10.0,
            consecutive_threshold: 3,
            late_grace_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportParameters {
    pub group_by: GroupBy,
    pub standard_hours: f64,
    pub overtime_threshold: f64,
    pub consecutive_threshold: usize,
    pub threshold_minutes: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyticsPayload {
    #[schema(value_type = Object)]
    pub average_timings: BTreeMap<u64, TimingAverage>,
    #[schema(value_type = Object)]
    pub hours_worked: BTreeMap<u64, HoursWorked>,
    pub late_arrivals: Vec<DeviationRecord>,
    pub early_departures: Vec<DeviationRecord>,
    #[schema(value_type = Object)]
    pub overtime_report: BTreeMap<u64, OvertimeRecord>,
    pub branch_comparison: BranchComparison,
    pub excessive_overtime: Vec<ExcessiveOvertime>,
    pub patterns: Vec<Pattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnalyticsSummary {
    pub total_late_arrivals: usize,
    pub total_early_departures: usize,
    pub staff_with_overtime: usize,
    pub total_overtime_hours: f64,
    pub patterns_detected: usize,
    pub staff_exceeding_overtime_threshold: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyticsReport {
    pub analytics: AnalyticsPayload,
    pub summary: AnalyticsSummary,
    pub date_range: DateRange,
    pub parameters: ReportParameters,
    #[schema(value_type = String, format = "date-time")]
    pub generated_at: DateTime<Utc>,
}

/// Everything one organization-wide request needs, fetched up front.
struct Snapshot {
    events: Vec<AttendanceEvent>,
    staff: Vec<StaffDirectoryEntry>,
    branches: Vec<Branch>,
}

/// Computes attendance analytics over snapshots fetched from a store.
///
/// All I/O happens in the fetch step; the analyses themselves are pure.
#[derive(Clone)]
pub struct AttendanceAnalytics {
    store: Arc<dyn AttendanceStore>,
    settings: AnalyticsSettings,
}

impl AttendanceAnalytics {
    pub fn new(store: Arc<dyn AttendanceStore>, settings: AnalyticsSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    /// Events and the full directory (inactive staff included), fetched together.
    async fn events_with_staff(
        &self,
        organization_id: u64,
        range: &DateRange,
        filter: EventFilter,
    ) -> Result<(Vec<AttendanceEvent>, Vec<StaffDirectoryEntry>), AnalyticsError> {
        let staff_filter = StaffFilter::default();
        try_join!(
            self.store.fetch_events(organization_id, range, &filter),
            self.store.fetch_staff_directory(organization_id, &staff_filter),
        )
    }

    async fn snapshot(&self, organization_id: u64, range: &DateRange) -> Result<Snapshot, AnalyticsError> {
        let event_filter = EventFilter::default();
        let staff_filter = StaffFilter::default();
        let (events, staff, branches) = try_join!(
            self.store.fetch_events(organization_id, range, &event_filter),
            self.store.fetch_staff_directory(organization_id, &staff_filter),
            self.store.fetch_active_branches(organization_id),
        )?;
        Ok(Snapshot {
            events,
            staff,
            branches,
        })
    }

    #[instrument(skip(self, filter))]
    pub async fn average_timings(
        &self,
        organization_id: u64,
        range: &DateRange,
        filter: EventFilter,
    ) -> Result<BTreeMap<u64, TimingAverage>, AnalyticsError> {
        let events = self.store.fetch_events(organization_id, range, &filter).await?;
        Ok(aggregation::average_timings(&events))
    }

    #[instrument(skip(self))]
    pub async fn hours_worked(
        &self,
        organization_id: u64,
        range: &DateRange,
        group_by: GroupBy,
    ) -> Result<BTreeMap<u64, HoursWorked>, AnalyticsError> {
        let filter = EventFilter::event_type(EventType::CheckOut);
        let events = self.store.fetch_events(organization_id, range, &filter).await?;
        Ok(aggregation::hours_worked(&events, group_by))
    }

    #[instrument(skip(self))]
    pub async fn late_arrivals(
        &self,
        organization_id: u64,
        range: &DateRange,
        threshold_minutes: u32,
    ) -> Result<Vec<DeviationRecord>, AnalyticsError> {
        let (events, staff) = self
            .events_with_staff(organization_id, range, EventFilter::event_type(EventType::CheckIn))
            .await?;
        Ok(deviation::late_arrivals(&events, &index_staff(&staff), threshold_minutes))
    }

    #[instrument(skip(self))]
    pub async fn early_departures(
        &self,
        organization_id: u64,
        range: &DateRange,
        threshold_minutes: u32,
    ) -> Result<Vec<DeviationRecord>, AnalyticsError> {
        let (events, staff) = self
            .events_with_staff(organization_id, range, EventFilter::event_type(EventType::CheckOut))
            .await?;
        Ok(deviation::early_departures(&events, &index_staff(&staff), threshold_minutes))
    }

    #[instrument(skip(self))]
    pub async fn overtime_report(
        &self,
        organization_id: u64,
        range: &DateRange,
        standard_hours_per_day: f64,
    ) -> Result<BTreeMap<u64, OvertimeRecord>, AnalyticsError> {
        let (events, staff) = self
            .events_with_staff(organization_id, range, EventFilter::event_type(EventType::CheckOut))
            .await?;
        Ok(aggregation::overtime_report(&events, &index_staff(&staff), standard_hours_per_day))
    }

    #[instrument(skip(self))]
    pub async fn compare_branches(
        &self,
        organization_id: u64,
        range: &DateRange,
        role: Option<String>,
    ) -> Result<BranchComparison, AnalyticsError> {
        let event_filter = EventFilter::default();
        let staff_filter = StaffFilter::active_with_role(role.clone());
        let (branches, staff, events) = try_join!(
            self.store.fetch_active_branches(organization_id),
            self.store.fetch_staff_directory(organization_id, &staff_filter),
            self.store.fetch_events(organization_id, range, &event_filter),
        )?;

        Ok(branch_comparison::compare_branches(
            &branches,
            &staff,
            &events,
            role.as_deref(),
        ))
    }

    #[instrument(skip(self))]
    pub async fn excessive_overtime(
        &self,
        organization_id: u64,
        range: &DateRange,
        threshold_hours: f64,
        standard_hours_per_day: f64,
    ) -> Result<Vec<ExcessiveOvertime>, AnalyticsError> {
        let report = self
            .overtime_report(organization_id, range, standard_hours_per_day)
            .await?;
        Ok(pattern::excessive_overtime(report.values(), threshold_hours))
    }

    /// Deviation patterns are detected with no grace period, as any flagged
    /// day counts toward a run.
    #[instrument(skip(self))]
    pub async fn detect_patterns(
        &self,
        organization_id: u64,
        range: &DateRange,
        consecutive_threshold: usize,
    ) -> Result<Vec<Pattern>, AnalyticsError> {
        let (events, staff) = self
            .events_with_staff(organization_id, range, EventFilter::default())
            .await?;
        let index = index_staff(&staff);
        let late = deviation::late_arrivals(&events, &index, 0);
        let early = deviation::early_departures(&events, &index, 0);
        Ok(pattern::detect_patterns(&late, &early, consecutive_threshold))
    }

    #[instrument(skip(self))]
    pub async fn export_csv(&self, organization_id: u64, range: &DateRange) -> Result<String, AnalyticsError> {
        let (events, staff) = self
            .events_with_staff(organization_id, range, EventFilter::default())
            .await?;
        let index = index_staff(&staff);

        let late = deviation::late_arrivals(&events, &index, 0);
        let early = deviation::early_departures(&events, &index, 0);
        let overtime = aggregation::overtime_report(&events, &index, self.settings.standard_hours_per_day);

        let flags = ExportFlags {
            late_event_ids: deviation::flagged_event_ids(&late),
            early_event_ids: deviation::flagged_event_ids(&early),
            overtime_staff_ids: overtime
                .values()
                .filter(|record| record.total_overtime_minutes > 0)
                .map(|record| record.staff_id)
                .collect::<HashSet<u64>>(),
        };

        let rows = export::build_rows(&events, &index, &flags);
        info!(organization_id, rows = rows.len(), "Attendance export generated");
        export::write_csv(&rows)
    }

    /// Every analysis over one shared snapshot, plus headline counts.
    #[instrument(skip(self))]
    pub async fn full_report(
        &self,
        organization_id: u64,
        range: &DateRange,
        parameters: ReportParameters,
    ) -> Result<AnalyticsReport, AnalyticsError> {
        let snapshot = self.snapshot(organization_id, range).await?;
        let index = index_staff(&snapshot.staff);
        let events = &snapshot.events;

        let late_arrivals = deviation::late_arrivals(events, &index, parameters.threshold_minutes);
        let early_departures = deviation::early_departures(events, &index, parameters.threshold_minutes);
        let overtime_report = aggregation::overtime_report(events, &index, parameters.standard_hours);
        let excessive_overtime =
            pattern::excessive_overtime(overtime_report.values(), parameters.overtime_threshold);

        let patterns = pattern::detect_patterns(
            &deviation::late_arrivals(events, &index, 0),
            &deviation::early_departures(events, &index, 0),
            parameters.consecutive_threshold,
        );

        let active_staff: Vec<StaffDirectoryEntry> = snapshot
            .staff
            .iter()
            .filter(|entry| entry.is_active)
            .cloned()
            .collect();
        let branch_comparison =
            branch_comparison::compare_branches(&snapshot.branches, &active_staff, events, None);

        let summary = AnalyticsSummary {
            total_late_arrivals: late_arrivals.len(),
            total_early_departures: early_departures.len(),
            staff_with_overtime: overtime_report
                .values()
                .filter(|record| record.total_overtime_minutes > 0)
                .count(),
            total_overtime_hours: round2(
                overtime_report
                    .values()
                    .map(|record| record.total_overtime_hours)
                    .sum(),
            ),
            patterns_detected: patterns.len(),
            staff_exceeding_overtime_threshold: excessive_overtime.len(),
        };

        info!(
            organization_id,
            events = events.len(),
            late = summary.total_late_arrivals,
            early = summary.total_early_departures,
            patterns = summary.patterns_detected,
            "Attendance analytics computed"
        );

        Ok(AnalyticsReport {
            analytics: AnalyticsPayload {
                average_timings: aggregation::average_timings(events),
                hours_worked: aggregation::hours_worked(events, parameters.group_by),
                late_arrivals,
                early_departures,
                overtime_report,
                branch_comparison,
                excessive_overtime,
                patterns,
            },
            summary,
            date_range: *range,
            parameters,
            generated_at: Utc::now(),
        })
    }
}
