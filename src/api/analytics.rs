use actix_web::http::header;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::analytics::error::AnalyticsError;
use crate::analytics::service::{AnalyticsSettings, AttendanceAnalytics, ReportParameters};
use crate::models::{DateRange, EventFilter, GroupBy};

/// Query string shared by every analytics endpoint. Parameters an endpoint
/// does not use are ignored; unset ones fall back to configured defaults.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// First day of the range, inclusive.
    #[param(value_type = String, example = "2024-01-01")]
    pub start_date: NaiveDate,

    /// Last day of the range, inclusive.
    #[param(value_type = String, example = "2024-01-31")]
    pub end_date: NaiveDate,

    /// `day`, `week` or `month`.
    #[param(value_type = Option<String>, example = "week")]
    pub group_by: Option<GroupBy>,

    /// Grace period before a deviation is flagged.
    #[param(example = 5)]
    pub threshold_minutes: Option<u32>,

    #[param(example = 8.0)]
    pub standard_hours: Option<f64>,

    #[param(example = 10.0)]
    pub overtime_threshold: Option<f64>,

    #[param(example = 3)]
    pub consecutive_threshold: Option<usize>,

    pub staff_id: Option<u64>,
    pub branch_id: Option<u64>,

    #[param(example = "nurse")]
    pub role: Option<String>,

    /// Export format, only `csv` is supported.
    #[param(example = "csv")]
    pub format: Option<String>,
}

impl AnalyticsQuery {
    fn range(&self) -> Result<DateRange, AnalyticsError> {
        DateRange::from_dates(self.start_date, self.end_date)
    }

    fn standard_hours(&self, settings: &AnalyticsSettings) -> Result<f64, AnalyticsError> {
        non_negative("standard_hours", self.standard_hours)
            .map(|hours| hours.unwrap_or(settings.standard_hours_per_day))
    }

    fn overtime_threshold(&self, settings: &AnalyticsSettings) -> Result<f64, AnalyticsError> {
        non_negative("overtime_threshold", self.overtime_threshold)
            .map(|hours| hours.unwrap_or(settings.overtime_threshold_hours))
    }
}

fn non_negative(name: &'static str, value: Option<f64>) -> Result<Option<f64>, AnalyticsError> {
    match value {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(AnalyticsError::InvalidParameter { name, value })
        }
        _ => Ok(value),
    }
}

#[utoipa::path(
    get,
    path = "/api/analytics/{org_id}",
    params(
        ("org_id" = u64, Path, description = "Organization ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Every analysis for the range, with a summary", body = crate::analytics::service::AnalyticsReport),
        (status = 400, description = "Invalid date range or query"),
        (status = 429, description = "Rate limited")
    ),
    tag = "Analytics"
)]
pub async fn analytics_report(
    analytics: web::Data<AttendanceAnalytics>,
    path: web::Path<u64>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    let organization_id = path.into_inner();
    let range = query.range()?;
    let settings = analytics.settings();

    let parameters = ReportParameters {
        group_by: query.group_by.unwrap_or_default(),
        standard_hours: query.standard_hours(settings)?,
        overtime_threshold: query.overtime_threshold(settings)?,
        consecutive_threshold: query.consecutive_threshold.unwrap_or(settings.consecutive_threshold),
        threshold_minutes: query.threshold_minutes.unwrap_or(settings.late_grace_minutes),
    };

    let report = analytics.full_report(organization_id, &range, parameters).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    get,
    path = "/api/analytics/{org_id}/timings",
    params(
        ("org_id" = u64, Path, description = "Organization ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Average check-in/check-out per staff member, keyed by staff ID"),
        (status = 400, description = "Invalid date range or query")
    ),
    tag = "Analytics"
)]
pub async fn average_timings(
    analytics: web::Data<AttendanceAnalytics>,
    path: web::Path<u64>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    let range = query.range()?;
    let filter = EventFilter {
        staff_id: query.staff_id,
        branch_id: query.branch_id,
        event_type: None,
    };

    let timings = analytics
        .average_timings(path.into_inner(), &range, filter)
        .await?;
    Ok(HttpResponse::Ok().json(timings))
}

#[utoipa::path(
    get,
    path = "/api/analytics/{org_id}/hours",
    params(
        ("org_id" = u64, Path, description = "Organization ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Hours worked per staff member and period, keyed by staff ID"),
        (status = 400, description = "Invalid date range or query")
    ),
    tag = "Analytics"
)]
pub async fn hours_worked(
    analytics: web::Data<AttendanceAnalytics>,
    path: web::Path<u64>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    let range = query.range()?;
    let hours = analytics
        .hours_worked(path.into_inner(), &range, query.group_by.unwrap_or_default())
        .await?;
    Ok(HttpResponse::Ok().json(hours))
}

#[utoipa::path(
    get,
    path = "/api/analytics/{org_id}/late-arrivals",
    params(
        ("org_id" = u64, Path, description = "Organization ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Check-ins after the scheduled start", body = [crate::analytics::deviation::DeviationRecord]),
        (status = 400, description = "Invalid date range or query")
    ),
    tag = "Analytics"
)]
pub async fn late_arrivals(
    analytics: web::Data<AttendanceAnalytics>,
    path: web::Path<u64>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    let range = query.range()?;
    let threshold = query
        .threshold_minutes
        .unwrap_or(analytics.settings().late_grace_minutes);

    let records = analytics
        .late_arrivals(path.into_inner(), &range, threshold)
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/analytics/{org_id}/early-departures",
    params(
        ("org_id" = u64, Path, description = "Organization ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Check-outs before the scheduled end", body = [crate::analytics::deviation::DeviationRecord]),
        (status = 400, description = "Invalid date range or query")
    ),
    tag = "Analytics"
)]
pub async fn early_departures(
    analytics: web::Data<AttendanceAnalytics>,
    path: web::Path<u64>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    let range = query.range()?;
    let threshold = query
        .threshold_minutes
        .unwrap_or(analytics.settings().late_grace_minutes);

    let records = analytics
        .early_departures(path.into_inner(), &range, threshold)
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/analytics/{org_id}/overtime",
    params(
        ("org_id" = u64, Path, description = "Organization ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Overtime per staff member, keyed by staff ID"),
        (status = 400, description = "Invalid date range or query")
    ),
    tag = "Analytics"
)]
pub async fn overtime_report(
    analytics: web::Data<AttendanceAnalytics>,
    path: web::Path<u64>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    let range = query.range()?;
    let standard_hours = query.standard_hours(analytics.settings())?;

    let report = analytics
        .overtime_report(path.into_inner(), &range, standard_hours)
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    get,
    path = "/api/analytics/{org_id}/excessive-overtime",
    params(
        ("org_id" = u64, Path, description = "Organization ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Staff at or over the overtime threshold, most overtime first", body = [crate::analytics::pattern::ExcessiveOvertime]),
        (status = 400, description = "Invalid date range or query")
    ),
    tag = "Analytics"
)]
pub async fn excessive_overtime(
    analytics: web::Data<AttendanceAnalytics>,
    path: web::Path<u64>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    let range = query.range()?;
    let settings = analytics.settings();
    let threshold = query.overtime_threshold(settings)?;
    let standard_hours = query.standard_hours(settings)?;

    let flagged = analytics
        .excessive_overtime(path.into_inner(), &range, threshold, standard_hours)
        .await?;
    Ok(HttpResponse::Ok().json(flagged))
}

#[utoipa::path(
    get,
    path = "/api/analytics/{org_id}/branches",
    params(
        ("org_id" = u64, Path, description = "Organization ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Active branches compared per staff member", body = crate::analytics::branch_comparison::BranchComparison),
        (status = 400, description = "Invalid date range or query")
    ),
    tag = "Analytics"
)]
pub async fn compare_branches(
    analytics: web::Data<AttendanceAnalytics>,
    path: web::Path<u64>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    let range = query.range()?;
    let comparison = analytics
        .compare_branches(path.into_inner(), &range, query.role.clone())
        .await?;
    Ok(HttpResponse::Ok().json(comparison))
}

#[utoipa::path(
    get,
    path = "/api/analytics/{org_id}/patterns",
    params(
        ("org_id" = u64, Path, description = "Organization ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Runs of consecutive late or early days", body = [crate::analytics::pattern::Pattern]),
        (status = 400, description = "Invalid date range or query")
    ),
    tag = "Analytics"
)]
pub async fn detect_patterns(
    analytics: web::Data<AttendanceAnalytics>,
    path: web::Path<u64>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    let range = query.range()?;
    let threshold = query
        .consecutive_threshold
        .unwrap_or(analytics.settings().consecutive_threshold);

    let patterns = analytics
        .detect_patterns(path.into_inner(), &range, threshold)
        .await?;
    Ok(HttpResponse::Ok().json(patterns))
}

#[utoipa::path(
    get,
    path = "/api/analytics/{org_id}/export",
    params(
        ("org_id" = u64, Path, description = "Organization ID"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "CSV attachment, one row per staff member and day", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid date range or unsupported format"),
        (status = 429, description = "Rate limited")
    ),
    tag = "Analytics"
)]
pub async fn export_report(
    analytics: web::Data<AttendanceAnalytics>,
    path: web::Path<u64>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    let format = query.format.as_deref().unwrap_or("csv");
    if !format.eq_ignore_ascii_case("csv") {
        return Err(AnalyticsError::UnsupportedFormat(format.to_string()).into());
    }

    let range = query.range()?;
    let body = analytics.export_csv(path.into_inner(), &range).await?;

    let filename = format!(
        "attendance_report_{}_to_{}.csv",
        query.start_date, query.end_date
    );
    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::service::AnalyticsSettings;
    use crate::config::Config;
    use crate::model::attendance_event::{AttendanceEvent, EventType};
    use crate::model::branch::Branch;
    use crate::model::staff::StaffDirectoryEntry;
    use crate::routes;
    use crate::store::memory::MemoryAttendanceStore;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use chrono::NaiveDateTime;
    use std::sync::Arc;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn event(id: u64, kind: EventType, ts: NaiveDateTime, shift: Option<i64>) -> AttendanceEvent {
        AttendanceEvent {
            id,
            staff_id: 7,
            organization_id: 1,
            branch_id: Some(3),
            event_type: kind,
            timestamp: ts,
            shift_duration_minutes: shift,
            custom_status: None,
        }
    }

    fn store() -> MemoryAttendanceStore {
        MemoryAttendanceStore {
            events: vec![
                event(1, EventType::CheckIn, at(1, 9, 15), None),
                event(2, EventType::CheckOut, at(1, 16, 30), Some(435)),
            ],
            staff: vec![StaffDirectoryEntry {
                staff_id: 7,
                name: "Rowan".into(),
                branch_id: Some(3),
                organization_id: 1,
                role: "nurse".into(),
                is_active: true,
                scheduled_start_time: Some("09:00".into()),
                scheduled_end_time: Some("17:00".into()),
            }],
            branches: vec![Branch {
                branch_id: 3,
                organization_id: 1,
                name: "Harbor".into(),
                is_active: true,
            }],
            unavailable: false,
        }
    }

    fn config(rate_export_per_min: &str) -> Config {
        let vars = [
            ("SERVER_ADDR", "127.0.0.1:8080"),
            ("DATABASE_URL", "mysql://localhost/attendance"),
            ("RATE_EXPORT_PER_MIN", rate_export_per_min),
        ];
        Config::from_vars(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    macro_rules! app {
        ($store:expr, $config:expr) => {{
            let config = $config;
            let analytics = AttendanceAnalytics::new(Arc::new($store), AnalyticsSettings::default());
            test::init_service(
                App::new()
                    .app_data(web::Data::new(analytics))
                    .configure(|cfg| routes::configure(cfg, config)),
            )
            .await
        }};
    }

    fn get(uri: &str) -> test::TestRequest {
        test::TestRequest::get()
            .uri(uri)
            .peer_addr("127.0.0.1:40000".parse().unwrap())
    }

    #[actix_web::test]
    async fn late_arrivals_endpoint_returns_records() {
        let app = app!(store(), config("30"));
        let req = get("/api/analytics/1/late-arrivals?start_date=2024-01-01&end_date=2024-01-31").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["deviation_minutes"], 15);
        assert_eq!(body[0]["actual_time"], "09:15");
    }

    #[actix_web::test]
    async fn grace_period_suppresses_small_deviations() {
        let app = app!(store(), config("30"));
        let req = get("/api/analytics/1/early-departures?start_date=2024-01-01&end_date=2024-01-31&threshold_minutes=30")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!([]));
    }

    #[actix_web::test]
    async fn full_report_includes_summary_and_parameters() {
        let app = app!(store(), config("30"));
        let req = get("/api/analytics/1?start_date=2024-01-01&end_date=2024-01-31&group_by=week").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["summary"]["total_late_arrivals"], 1);
        assert_eq!(body["summary"]["total_early_departures"], 1);
        assert_eq!(body["parameters"]["group_by"], "week");
        assert_eq!(body["parameters"]["standard_hours"], 8.0);
        assert_eq!(body["analytics"]["hours_worked"]["7"]["periods"][0]["period"], "2024-W01");
        assert!(body["generated_at"].is_string());
    }

    #[actix_web::test]
    async fn reversed_range_is_bad_request() {
        let app = app!(store(), config("30"));
        let req = get("/api/analytics/1/hours?start_date=2024-02-01&end_date=2024-01-01").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("before"));
    }

    #[actix_web::test]
    async fn missing_dates_are_bad_request() {
        let app = app!(store(), config("30"));
        let req = get("/api/analytics/1/timings?start_date=2024-01-01").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn negative_or_non_finite_hours_are_bad_request() {
        let app = app!(store(), config("30"));
        for uri in [
            "/api/analytics/1/overtime?start_date=2024-01-01&end_date=2024-01-31&standard_hours=-1",
            "/api/analytics/1/overtime?start_date=2024-01-01&end_date=2024-01-31&standard_hours=-1e300",
            "/api/analytics/1/overtime?start_date=2024-01-01&end_date=2024-01-31&standard_hours=inf",
            "/api/analytics/1/excessive-overtime?start_date=2024-01-01&end_date=2024-01-31&overtime_threshold=-2",
            "/api/analytics/1?start_date=2024-01-01&end_date=2024-01-31&standard_hours=-0.5",
        ] {
            let resp = test::call_service(&app, get(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");

            let body: serde_json::Value = test::read_body_json(resp).await;
            assert!(body["message"].as_str().unwrap().contains("non-negative"), "{uri}");
        }
    }

    #[actix_web::test]
    async fn overtime_never_exceeds_time_worked() {
        let app = app!(store(), config("30"));
        let req = get("/api/analytics/1/overtime?start_date=2024-01-01&end_date=2024-01-31&standard_hours=0")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let day = &body["7"]["daily_records"][0];
        assert_eq!(day["minutes_worked"], 435);
        assert_eq!(day["overtime_minutes"], 435);
    }

    #[actix_web::test]
    async fn store_failure_is_internal_error() {
        let failing = MemoryAttendanceStore {
            unavailable: true,
            ..store()
        };
        let app = app!(failing, config("30"));
        let req = get("/api/analytics/1/patterns?start_date=2024-01-01&end_date=2024-01-31").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn export_is_a_csv_attachment() {
        let app = app!(store(), config("30"));
        let req = get("/api/analytics/1/export?start_date=2024-01-01&end_date=2024-01-31&format=csv").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let headers = resp.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/csv");
        assert_eq!(
            headers.get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"attendance_report_2024-01-01_to_2024-01-31.csv\""
        );

        let body = test::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "Rowan,2024-01-01,09:15,16:30,7.25,,Yes,Yes,No");
    }

    #[actix_web::test]
    async fn unsupported_export_format_is_rejected() {
        let app = app!(store(), config("30"));
        let req = get("/api/analytics/1/export?start_date=2024-01-01&end_date=2024-01-31&format=xlsx").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn export_is_rate_limited() {
        let app = app!(store(), config("1"));
        let uri = "/api/analytics/1/export?start_date=2024-01-01&end_date=2024-01-31";

        let first = test::call_service(&app, get(uri).to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);
        let second = test::call_service(&app, get(uri).to_request()).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
