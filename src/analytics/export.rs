//! Flat CSV export: one row per staff member and calendar day.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::analytics::error::AnalyticsError;
use crate::model::attendance_event::{AttendanceEvent, EventType};
use crate::model::staff::StaffIndex;
use crate::utils::time::{minutes_of_day, minutes_to_hours, minutes_to_time_string};

pub const EXPORT_HEADER: [&str; 9] = [
    "staffName",
    "date",
    "checkInTime",
    "checkOutTime",
    "shiftDuration",
    "customStatus",
    "isLate",
    "isEarly",
    "hasOvertime",
];

const UNKNOWN_STAFF: &str = "Unknown";

/// Event ids and staff ids the export flags, computed by the other analyses.
#[derive(Debug, Default)]
pub struct ExportFlags {
    pub late_event_ids: HashSet<u64>,
    pub early_event_ids: HashSet<u64>,
    pub overtime_staff_ids: HashSet<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub staff_name: String,
    pub date: String,
    pub check_in_time: String,
    pub check_out_time: String,
    pub shift_duration: String,
    pub custom_status: String,
    pub is_late: &'static str,
    pub is_early: &'static str,
    pub has_overtime: &'static str,
}

#[derive(Default)]
struct DayRecord<'a> {
    check_in: Option<&'a AttendanceEvent>,
    check_out: Option<&'a AttendanceEvent>,
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Pair each staff member's check-in and check-out per calendar day.
///
/// Rows come out in order of first appearance in the time-sorted events. The
/// last check-in and the last check-out of a day win.
pub fn build_rows(
    events: &[AttendanceEvent],
    staff: &StaffIndex<'_>,
    flags: &ExportFlags,
) -> Vec<ExportRow> {
    let mut sorted: Vec<&AttendanceEvent> = events.iter().collect();
    sorted.sort_by_key(|event| (event.timestamp, event.id));

    let mut order: Vec<(u64, NaiveDate)> = Vec::new();
    let mut days: HashMap<(u64, NaiveDate), DayRecord<'_>> = HashMap::new();
    for event in sorted {
        let key = (event.staff_id, event.date());
        let day = days.entry(key).or_insert_with(|| {
            order.push(key);
            DayRecord::default()
        });
        match event.event_type {
            EventType::CheckIn => day.check_in = Some(event),
            EventType::CheckOut => day.check_out = Some(event),
        }
    }

    order
        .into_iter()
        .filter_map(|key| days.remove(&key).map(|day| (key, day)))
        .map(|((staff_id, date), day)| {
            let clock = |event: Option<&AttendanceEvent>| {
                event
                    .map(|e| minutes_to_time_string(minutes_of_day(&e.timestamp)))
                    .unwrap_or_default()
            };
            let custom_status = day
                .check_in
                .and_then(|e| e.custom_status.clone())
                .or_else(|| day.check_out.and_then(|e| e.custom_status.clone()))
                .unwrap_or_default();
            let shift_duration = day
                .check_out
                .and_then(AttendanceEvent::recorded_shift_minutes)
                .filter(|minutes| *minutes > 0)
                .map(|minutes| minutes_to_hours(minutes).to_string())
                .unwrap_or_default();

            ExportRow {
                staff_name: staff
                    .get(&staff_id)
                    .map(|entry| entry.name.clone())
                    .unwrap_or_else(|| UNKNOWN_STAFF.to_string()),
                date: date.format("%Y-%m-%d").to_string(),
                check_in_time: clock(day.check_in),
                check_out_time: clock(day.check_out),
                shift_duration,
                custom_status,
                is_late: yes_no(day.check_in.is_some_and(|e| flags.late_event_ids.contains(&e.id))),
                is_early: yes_no(day.check_out.is_some_and(|e| flags.early_event_ids.contains(&e.id))),
                has_overtime: yes_no(flags.overtime_staff_ids.contains(&staff_id)),
            }
        })
        .collect()
}

/// Serialize rows under the fixed header.
///
/// Fields containing a comma, quote or line break are quoted, with inner
/// quotes doubled.
pub fn write_csv(rows: &[ExportRow]) -> Result<String, AnalyticsError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(EXPORT_HEADER)
        .map_err(|e| AnalyticsError::Export(e.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AnalyticsError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AnalyticsError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AnalyticsError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::staff::{StaffDirectoryEntry, index_staff};
    use chrono::NaiveDateTime;
    use proptest::prelude::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn event(id: u64, staff_id: u64, kind: EventType, ts: NaiveDateTime) -> AttendanceEvent {
        AttendanceEvent {
            id,
            staff_id,
            organization_id: 1,
            branch_id: None,
            event_type: kind,
            timestamp: ts,
            shift_duration_minutes: None,
            custom_status: None,
        }
    }

    fn member(staff_id: u64, name: &str) -> StaffDirectoryEntry {
        StaffDirectoryEntry {
            staff_id,
            name: name.to_string(),
            branch_id: None,
            organization_id: 1,
            role: "nurse".into(),
            is_active: true,
            scheduled_start_time: Some("09:00".into()),
            scheduled_end_time: Some("17:00".into()),
        }
    }

    fn parse(csv_text: &str) -> Vec<csv::StringRecord> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(csv_text.as_bytes())
            .records()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn empty_export_still_has_header() {
        let text = write_csv(&[]).unwrap();
        assert_eq!(
            text,
            "staffName,date,checkInTime,checkOutTime,shiftDuration,customStatus,isLate,isEarly,hasOvertime\n"
        );
    }

    #[test]
    fn pairs_check_in_and_check_out_per_day() {
        let directory = vec![member(1, "Dana")];
        let index = index_staff(&directory);
        let mut check_out = event(2, 1, EventType::CheckOut, at(4, 16, 30));
        check_out.shift_duration_minutes = Some(435);
        let mut check_in = event(1, 1, EventType::CheckIn, at(4, 9, 15));
        check_in.custom_status = Some("on call".into());

        let flags = ExportFlags {
            late_event_ids: HashSet::from([1]),
            early_event_ids: HashSet::from([2]),
            overtime_staff_ids: HashSet::new(),
        };
        let rows = build_rows(&[check_out, check_in], &index, &flags);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.staff_name, "Dana");
        assert_eq!(row.date, "2024-03-04");
        assert_eq!(row.check_in_time, "09:15");
        assert_eq!(row.check_out_time, "16:30");
        assert_eq!(row.shift_duration, "7.25");
        assert_eq!(row.custom_status, "on call");
        assert_eq!((row.is_late, row.is_early, row.has_overtime), ("Yes", "Yes", "No"));
    }

    #[test]
    fn check_in_without_check_out_leaves_fields_empty() {
        let directory = vec![member(1, "Dana")];
        let index = index_staff(&directory);
        let rows = build_rows(
            &[event(1, 1, EventType::CheckIn, at(4, 9, 0))],
            &index,
            &ExportFlags::default(),
        );

        assert_eq!(rows[0].check_out_time, "");
        assert_eq!(rows[0].shift_duration, "");
        let text = write_csv(&rows).unwrap();
        assert!(text.ends_with("Dana,2024-03-04,09:00,,,,No,No,No\n"));
    }

    #[test]
    fn zero_length_shift_exports_empty_duration() {
        let directory = vec![member(1, "Dana")];
        let index = index_staff(&directory);
        let mut check_out = event(2, 1, EventType::CheckOut, at(4, 9, 0));
        check_out.shift_duration_minutes = Some(0);
        let rows = build_rows(
            &[event(1, 1, EventType::CheckIn, at(4, 9, 0)), check_out],
            &index,
            &ExportFlags::default(),
        );

        assert_eq!(rows[0].check_out_time, "09:00");
        assert_eq!(rows[0].shift_duration, "");
    }

    #[test]
    fn unknown_staff_and_separate_days_get_own_rows() {
        let index = index_staff(&[]);
        let events = vec![
            event(1, 8, EventType::CheckIn, at(4, 9, 0)),
            event(2, 8, EventType::CheckIn, at(5, 9, 0)),
            event(3, 9, EventType::CheckIn, at(4, 10, 0)),
        ];
        let rows = build_rows(&events, &index, &ExportFlags::default());
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.staff_name.as_str(), r.date.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("Unknown", "2024-03-04"), ("Unknown", "2024-03-04"), ("Unknown", "2024-03-05")]
        );
    }

    #[test]
    fn fields_with_commas_and_quotes_are_escaped() {
        let directory = vec![member(1, "Doe, \"JD\" John")];
        let index = index_staff(&directory);
        let rows = build_rows(
            &[event(1, 1, EventType::CheckIn, at(4, 9, 0))],
            &index,
            &ExportFlags::default(),
        );
        let text = write_csv(&rows).unwrap();
        assert!(text.contains("\"Doe, \"\"JD\"\" John\",2024-03-04"));

        let records = parse(&text);
        assert_eq!(records[1].len(), 9);
        assert_eq!(&records[1][0], "Doe, \"JD\" John");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_every_row_has_nine_fields(
            names in prop::collection::vec("[a-zA-Z ,\"\n]{0,12}", 1..6),
            statuses in prop::collection::vec(prop::option::of("[a-z ,]{0,10}"), 1..6),
            hours in prop::collection::vec(6u32..20, 1..6),
        ) {
            let directory: Vec<StaffDirectoryEntry> = names
                .iter()
                .enumerate()
                .map(|(i, name)| member(i as u64, name))
                .collect();
            let index = index_staff(&directory);
            let events: Vec<AttendanceEvent> = hours
                .iter()
                .enumerate()
                .map(|(i, hour)| {
                    let mut e = event(i as u64, (i % names.len()) as u64, EventType::CheckIn, at(1 + i as u32, *hour, 0));
                    e.custom_status = statuses[i % statuses.len()].clone();
                    e
                })
                .collect();

            let rows = build_rows(&events, &index, &ExportFlags::default());
            let text = write_csv(&rows).unwrap();
            let records = parse(&text);

            prop_assert_eq!(records.len(), rows.len() + 1);
            prop_assert_eq!(records[0].iter().collect::<Vec<_>>(), EXPORT_HEADER.to_vec());
            for record in &records {
                prop_assert_eq!(record.len(), 9);
            }
            for (record, row) in records.iter().skip(1).zip(&rows) {
                prop_assert_eq!(&record[0], row.staff_name.as_str());
                if row.staff_name.contains(',') {
                    let quoted = format!("\"{}\"", row.staff_name.replace('"', "\"\""));
                    prop_assert!(text.contains(&quoted));
                }
            }
        }
    }
}
