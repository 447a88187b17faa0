use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Kind of attendance record. Check-ins only ever produce `Present`.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum AttendanceStatus {
    #[serde(rename = "hadir")]
    #[strum(serialize = "hadir")]
    Present,
    #[serde(rename = "izin")]
    #[strum(serialize = "izin")]
    Excused,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 42,
    "user": 7,
    "waktu": "2025-06-01T02:05:00Z",
    "keterangan": "hadir"
}))]
pub struct AttendanceEntry {
    pub id: u64,

    /// Member the entry belongs to
    #[serde(rename = "user")]
    pub member_id: u64,

    /// Server instant of the check-in
    #[serde(rename = "waktu")]
    #[schema(value_type = String, format = DateTime)]
    pub recorded_at: DateTime<Utc>,

    #[serde(rename = "keterangan")]
    pub status: AttendanceStatus,
}

/// An entry about to be written; `day` is the local calendar day of
/// `recorded_at` and is what the store keys uniqueness on.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub member_id: u64,
    pub recorded_at: DateTime<Utc>,
    pub day: NaiveDate,
    pub status: AttendanceStatus,
}
