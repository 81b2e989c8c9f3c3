use async_trait::async_trait;

use crate::analytics::error::AnalyticsError;
use crate::model::attendance_event::AttendanceEvent;
use crate::model::branch::Branch;
use crate::model::staff::StaffDirectoryEntry;
use crate::models::{DateRange, EventFilter, StaffFilter};

#[cfg(test)]
pub mod memory;
pub mod mysql;

/// Read-only access to attendance facts and the staff/branch directory.
///
/// Check-out events must already carry their paired shift duration; the
/// analytics never pair events themselves.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Events of the organization inside `range`, oldest first.
    async fn fetch_events(
        &self,
        organization_id: u64,
        range: &DateRange,
        filter: &EventFilter,
    ) -> Result<Vec<AttendanceEvent>, AnalyticsError>;

    async fn fetch_staff_directory(
        &self,
        organization_id: u64,
        filter: &StaffFilter,
    ) -> Result<Vec<StaffDirectoryEntry>, AnalyticsError>;

    async fn fetch_active_branches(&self, organization_id: u64) -> Result<Vec<Branch>, AnalyticsError>;
}
