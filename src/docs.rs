use crate::analytics::aggregation::{DailyOvertime, HoursWorked, OvertimeRecord, PeriodHours, TimingAverage};
use crate::analytics::branch_comparison::{BranchComparison, BranchMetrics, BranchSummary};
use crate::analytics::deviation::DeviationRecord;
use crate::analytics::pattern::{ExcessiveOvertime, Pattern, PatternType, Severity};
use crate::analytics::service::{AnalyticsPayload, AnalyticsReport, AnalyticsSummary, ReportParameters};
use crate::models::{DateRange, GroupBy};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Staff Attendance Analytics API",
        version = "1.0.0",
        description = r#"
## Staff Time & Attendance Analytics

Read-only analytics over check-in/check-out events recorded for an organization's staff.

### 🔹 Reports
- **Timings**: average check-in and check-out time per staff member
- **Hours**: hours worked, bucketed by day, ISO week or month
- **Deviations**: late arrivals and early departures against each schedule
- **Overtime**: per-day overtime and staff over the excessive-overtime threshold
- **Branches**: per-staff normalized hours and peak check-in hour
- **Patterns**: runs of consecutive late or early days
- **Export**: one CSV row per staff member and day

### 📦 Request Format
Every endpoint takes `start_date` and `end_date` (`YYYY-MM-DD`, both inclusive).
Times of day are `HH:MM`; durations are hours rounded to two decimals.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::analytics::analytics_report,
        crate::api::analytics::average_timings,
        crate::api::analytics::hours_worked,
        crate::api::analytics::late_arrivals,
        crate::api::analytics::early_departures,
        crate::api::analytics::overtime_report,
        crate::api::analytics::excessive_overtime,
        crate::api::analytics::compare_branches,
        crate::api::analytics::detect_patterns,
        crate::api::analytics::export_report
    ),
    components(
        schemas(
            AnalyticsReport,
            AnalyticsPayload,
            AnalyticsSummary,
            ReportParameters,
            DateRange,
            GroupBy,
            TimingAverage,
            HoursWorked,
            PeriodHours,
            OvertimeRecord,
            DailyOvertime,
            DeviationRecord,
            BranchComparison,
            BranchMetrics,
            BranchSummary,
            ExcessiveOvertime,
            Pattern,
            PatternType,
            Severity
        )
    ),
    tags(
        (name = "Analytics", description = "Attendance analytics and export APIs"),
    )
)]
pub struct ApiDoc;
