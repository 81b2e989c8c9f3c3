use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::time::time_string_to_minutes;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StaffDirectoryEntry {
    pub staff_id: u64,
    pub name: String,
    pub branch_id: Option<u64>,
    pub organization_id: u64,
    pub role: String,
    pub is_active: bool,
    /// "HH:MM"
    pub scheduled_start_time: Option<String>,
    /// "HH:MM"
    pub scheduled_end_time: Option<String>,
}

impl StaffDirectoryEntry {
    pub fn scheduled_start_minutes(&self) -> Option<u32> {
        self.scheduled_start_time
            .as_deref()
            .and_then(time_string_to_minutes)
    }

    pub fn scheduled_end_minutes(&self) -> Option<u32> {
        self.scheduled_end_time
            .as_deref()
            .and_then(time_string_to_minutes)
    }
}

/// Directory lookup keyed by staff id.
pub type StaffIndex<'a> = HashMap<u64, &'a StaffDirectoryEntry>;

pub fn index_staff(directory: &[StaffDirectoryEntry]) -> StaffIndex<'_> {
    directory
        .iter()
        .map(|entry| (entry.staff_id, entry))
        .collect()
}
