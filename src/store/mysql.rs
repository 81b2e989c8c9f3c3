use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::MySqlPool;

use crate::analytics::error::AnalyticsError;
use crate::model::attendance_event::{AttendanceEvent, AttendanceEventRow};
use crate::model::branch::Branch;
use crate::model::staff::StaffDirectoryEntry;
use crate::models::{DateRange, EventFilter, StaffFilter};
use crate::store::AttendanceStore;

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
    Bool(bool),
}

/// Appends optional `AND column = ?` clauses and remembers their binds.
#[derive(Default)]
struct WhereClause<'a> {
    sql: String,
    args: Vec<FilterValue<'a>>,
}

impl<'a> WhereClause<'a> {
    fn push(&mut self, column: &str, value: Option<FilterValue<'a>>) {
        if let Some(value) = value {
            self.sql.push_str(&format!(" AND {} = ?", column));
            self.args.push(value);
        }
    }
}

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn fetch_events(
        &self,
        organization_id: u64,
        range: &DateRange,
        filter: &EventFilter,
    ) -> Result<Vec<AttendanceEvent>, AnalyticsError> {
        let mut clause = WhereClause::default();
        clause.push("staff_id", filter.staff_id.map(FilterValue::U64));
        clause.push("branch_id", filter.branch_id.map(FilterValue::U64));
        clause.push(
            "event_type",
            filter.event_type.as_ref().map(|t| FilterValue::Str(t.as_ref())),
        );

        let sql = format!(
            r#"
            SELECT id, staff_id, organization_id, branch_id, event_type,
                   `timestamp`, shift_duration_minutes, custom_status
            FROM attendance_events
            WHERE organization_id = ?
            AND `timestamp` BETWEEN ? AND ?
            {}
            ORDER BY `timestamp` ASC, id ASC
            "#,
            clause.sql
        );

        let mut query = sqlx::query_as::<_, AttendanceEventRow>(&sql)
            .bind(organization_id)
            .bind(range.start())
            .bind(range.end());
        for arg in clause.args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
                FilterValue::Bool(b) => query.bind(b),
            };
        }

        let mut stream = query.fetch(&self.pool);
        let mut events = Vec::new();
        while let Some(row) = stream.try_next().await? {
            events.push(AttendanceEvent::try_from(row)?);
        }

        tracing::debug!(organization_id, count = events.len(), "Fetched attendance events");
        Ok(events)
    }

    async fn fetch_staff_directory(
        &self,
        organization_id: u64,
        filter: &StaffFilter,
    ) -> Result<Vec<StaffDirectoryEntry>, AnalyticsError> {
        let mut clause = WhereClause::default();
        clause.push("branch_id", filter.branch_id.map(FilterValue::U64));
        clause.push("role", filter.role.as_deref().map(FilterValue::Str));
        clause.push("is_active", filter.is_active.map(FilterValue::Bool));

        let sql = format!(
            r#"
            SELECT staff_id, name, branch_id, organization_id, role, is_active,
                   scheduled_start_time, scheduled_end_time
            FROM branch_staff
            WHERE organization_id = ?
            {}
            "#,
            clause.sql
        );

        let mut query = sqlx::query_as::<_, StaffDirectoryEntry>(&sql).bind(organization_id);
        for arg in clause.args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
                FilterValue::Bool(b) => query.bind(b),
            };
        }

        let staff = query.fetch_all(&self.pool).await?;
        tracing::debug!(organization_id, count = staff.len(), "Fetched staff directory");
        Ok(staff)
    }

    async fn fetch_active_branches(&self, organization_id: u64) -> Result<Vec<Branch>, AnalyticsError> {
        let branches = sqlx::query_as::<_, Branch>(
            r#"
            SELECT id AS branch_id, organization_id, branch_name AS name, is_active
            FROM hospital_branches
            WHERE organization_id = ?
            AND is_active = TRUE
            ORDER BY id ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(branches)
    }
}
