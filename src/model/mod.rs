pub mod attendance_event;
pub mod branch;
pub mod staff;
