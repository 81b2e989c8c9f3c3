use async_trait::async_trait;

use crate::analytics::error::AnalyticsError;
use crate::model::attendance_event::AttendanceEvent;
use crate::model::branch::Branch;
use crate::model::staff::StaffDirectoryEntry;
use crate::models::{DateRange, EventFilter, StaffFilter};
use crate::store::AttendanceStore;

/// Fixed in-memory snapshot; `unavailable` makes every fetch fail.
#[derive(Debug, Default, Clone)]
pub struct MemoryAttendanceStore {
    pub events: Vec<AttendanceEvent>,
    pub staff: Vec<StaffDirectoryEntry>,
    pub branches: Vec<Branch>,
    pub unavailable: bool,
}

impl MemoryAttendanceStore {
    fn check_available(&self) -> Result<(), AnalyticsError> {
        if self.unavailable {
            return Err(AnalyticsError::Store(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn in_range(range: &DateRange, event: &AttendanceEvent) -> bool {
    range.start() <= event.timestamp && event.timestamp <= range.end()
}

fn matches(filter: &EventFilter, event: &AttendanceEvent) -> bool {
    filter.staff_id.is_none_or(|id| id == event.staff_id)
        && filter.branch_id.is_none_or(|id| event.branch_id == Some(id))
        && filter.event_type.is_none_or(|kind| kind == event.event_type)
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    async fn fetch_events(
        &self,
        organization_id: u64,
        range: &DateRange,
        filter: &EventFilter,
    ) -> Result<Vec<AttendanceEvent>, AnalyticsError> {
        self.check_available()?;
        let mut events: Vec<AttendanceEvent> = self
            .events
            .iter()
            .filter(|e| e.organization_id == organization_id && in_range(range, e))
            .filter(|e| matches(filter, e))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.timestamp, e.id));
        Ok(events)
    }

    async fn fetch_staff_directory(
        &self,
        organization_id: u64,
        filter: &StaffFilter,
    ) -> Result<Vec<StaffDirectoryEntry>, AnalyticsError> {
        self.check_available()?;
        Ok(self
            .staff
            .iter()
            .filter(|s| s.organization_id == organization_id)
            .filter(|s| filter.branch_id.is_none_or(|id| s.branch_id == Some(id)))
            .filter(|s| filter.role.as_deref().is_none_or(|role| s.role == role))
            .filter(|s| filter.is_active.is_none_or(|active| s.is_active == active))
            .cloned()
            .collect())
    }

    async fn fetch_active_branches(&self, organization_id: u64) -> Result<Vec<Branch>, AnalyticsError> {
        self.check_available()?;
        Ok(self
            .branches
            .iter()
            .filter(|b| b.organization_id == organization_id && b.is_active)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance_event::EventType;
    use chrono::NaiveDate;

    fn event(id: u64, branch_id: Option<u64>, kind: EventType, day: u32) -> AttendanceEvent {
        AttendanceEvent {
            id,
            staff_id: 1,
            organization_id: 1,
            branch_id,
            event_type: kind,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap(),
            shift_duration_minutes: None,
            custom_status: None,
        }
    }

    #[actix_web::test]
    async fn filters_by_range_and_optional_fields() {
        let store = MemoryAttendanceStore {
            events: vec![
                event(1, Some(3), EventType::CheckIn, 1),
                event(2, None, EventType::CheckIn, 1),
                event(3, Some(3), EventType::CheckOut, 1),
                event(4, Some(3), EventType::CheckIn, 2),
            ],
            ..MemoryAttendanceStore::default()
        };
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let range = DateRange::from_dates(day, day).unwrap();
        let filter = EventFilter {
            branch_id: Some(3),
            event_type: Some(EventType::CheckIn),
            ..EventFilter::default()
        };

        let events = store.fetch_events(1, &range, &filter).await.unwrap();
        let ids: Vec<u64> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1]);

        let all = store.fetch_events(1, &range, &EventFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
