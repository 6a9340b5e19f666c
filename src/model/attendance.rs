use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::student::Student;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Present,
    Absent,
    Late,
}

impl Status {
    /// Present and late both count towards the attendance rate.
    pub fn attended(self) -> bool {
        matches!(self, Status::Present | Status::Late)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub student_id: Uuid,
    #[schema(example = "2026-07-14", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "09:15:00", value_type = Option<String>)]
    pub time_in: Option<NaiveTime>,
    #[schema(example = "16:30:00", value_type = Option<String>)]
    pub time_out: Option<NaiveTime>,
    pub status: Status,
    pub remarks: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    /// Embedded `students` row when the backend join is requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<Student>,
}

/// Insert payload for `attendance_records`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceInsert {
    pub user_id: Uuid,
    pub student_id: Uuid,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in: Option<NaiveTime>,
    pub status: Status,
}

/// Patch payload for `attendance_records`.
///
/// The nested options distinguish "leave as is" (`None`) from
/// "clear the column" (`Some(None)`, sent as JSON null).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in: Option<Option<NaiveTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_out: Option<Option<NaiveTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<Option<String>>,
}

impl AttendanceRecord {
    pub fn from_insert(id: Uuid, insert: &AttendanceInsert, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: insert.user_id,
            student_id: insert.student_id,
            date: insert.date,
            time_in: insert.time_in,
            time_out: None,
            status: insert.status,
            remarks: None,
            created_at: now,
            student: None,
        }
    }

    pub fn apply(&mut self, update: &AttendanceUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(time_in) = update.time_in {
            self.time_in = time_in;
        }
        if let Some(time_out) = update.time_out {
            self.time_out = time_out;
        }
        if let Some(remarks) = &update.remarks {
            self.remarks = remarks.clone();
        }
    }
}
