//! Attendance marking rules and the per-date attendance sheet.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::{
    attendance::{AttendanceRecord, Status},
    student::Student,
};
use crate::store::{SlotKey, SyncStatus, Workspace};

/// State of one (student, date) slot. Any state can move to any marked state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MarkState {
    Unmarked,
    Present,
    Absent,
    Late,
}

impl From<Status> for MarkState {
    fn from(status: Status) -> Self {
        match status {
            Status::Present => MarkState::Present,
            Status::Absent => MarkState::Absent,
            Status::Late => MarkState::Late,
        }
    }
}

/// Time-in stamped when a status is set: wall clock to the minute for
/// present/late, cleared for absent.
pub fn time_in_for(status: Status, now: NaiveTime) -> Option<NaiveTime> {
    if status.attended() {
        NaiveTime::from_hms_opt(now.hour(), now.minute(), 0)
    } else {
        None
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SheetRow {
    pub student: Student,
    pub state: MarkState,
    pub record: Option<AttendanceRecord>,
    pub sync: Option<SyncStatus>,
}

fn in_department(student: &Student, department: Option<&str>) -> bool {
    department.is_none_or(|d| student.department == d)
}

/// Students of `department` (all when `None`) with their record for `date`.
/// Each student appears once.
pub fn attendance_sheet(
    workspace: &Workspace,
    date: NaiveDate,
    department: Option<&str>,
) -> Vec<SheetRow> {
    let mut seen = HashSet::new();

    workspace
        .students()
        .filter(|s| in_department(&s.value, department))
        .filter(|s| seen.insert(s.value.id))
        .map(|s| {
            let tracked = workspace.record_for(SlotKey::new(s.value.id, date));
            SheetRow {
                student: s.value.clone(),
                state: tracked.map_or(MarkState::Unmarked, |r| r.value.status.into()),
                record: tracked.map(|r| r.value.clone()),
                sync: tracked.map(|r| r.sync),
            }
        })
        .collect()
}

/// Students a bulk action would mark: those in the filter with no record on
/// `date`. Students still being added are left out.
pub fn bulk_targets(workspace: &Workspace, date: NaiveDate, department: Option<&str>) -> Vec<Uuid> {
    attendance_sheet(workspace, date, department)
        .into_iter()
        .filter(|row| row.state == MarkState::Unmarked)
        .filter(|row| {
            workspace
                .student(row.student.id)
                .is_some_and(|s| s.sync != SyncStatus::Pending)
        })
        .map(|row| row.student.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::student::{NewStudent, Year};
    use chrono::Utc;

    fn student(name: &str, department: &str) -> Student {
        let draft = NewStudent {
            name: name.into(),
            roll_number: format!("R-{name}"),
            department: department.into(),
            email: format!("{name}@example.com"),
            phone: "9000000000".into(),
            year: Year::First,
        };
        Student::from_draft(Uuid::new_v4(), Uuid::nil(), &draft, Utc::now())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 14).unwrap()
    }

    #[test]
    fn time_in_is_minute_precision_and_cleared_for_absent() {
        let now = NaiveTime::from_hms_opt(9, 41, 27).unwrap();
        assert_eq!(time_in_for(Status::Present, now), NaiveTime::from_hms_opt(9, 41, 0));
        assert_eq!(time_in_for(Status::Late, now), NaiveTime::from_hms_opt(9, 41, 0));
        assert_eq!(time_in_for(Status::Absent, now), None);
    }

    #[test]
    fn sheet_is_exactly_the_department_without_duplicates() {
        let a = student("asha", "BCA");
        let b = student("bala", "BBA");
        let c = student("chitra", "BCA");
        let mut workspace = Workspace::default();
        // a duplicated row from the backend must not show twice
        workspace.load(vec![a.clone(), b.clone(), c.clone(), a.clone()], vec![]);

        let bca: Vec<Uuid> = attendance_sheet(&workspace, date(), Some("BCA"))
            .iter()
            .map(|r| r.student.id)
            .collect();
        assert_eq!(bca, vec![a.id, c.id]);

        let all = attendance_sheet(&workspace, date(), None);
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|r| r.state == MarkState::Unmarked));
    }

    #[test]
    fn bulk_targets_skip_marked_students() {
        let a = student("asha", "BCA");
        let c = student("chitra", "BCA");
        let mut workspace = Workspace::default();
        workspace.load(vec![a.clone(), c.clone()], vec![]);

        let now = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let (_ticket, write) = workspace
            .begin_mark(Uuid::nil(), SlotKey::new(a.id, date()), Status::Late, now)
            .unwrap();
        assert!(write.is_insert());

        assert_eq!(bulk_targets(&workspace, date(), Some("BCA")), vec![c.id]);
        let sheet = attendance_sheet(&workspace, date(), Some("BCA"));
        assert_eq!(sheet[0].state, MarkState::Late);
        assert_eq!(sheet[0].sync, Some(SyncStatus::Pending));
    }

    #[test]
    fn bulk_targets_leave_out_students_being_added() {
        let a = student("asha", "BCA");
        let mut workspace = Workspace::default();
        workspace.load(vec![a.clone()], vec![]);

        let draft = NewStudent {
            name: "bala".into(),
            roll_number: "R-bala".into(),
            department: "BCA".into(),
            email: "bala@example.com".into(),
            phone: "9000000000".into(),
            year: Year::Second,
        };
        let _ticket = workspace.begin_add_student(Uuid::nil(), &draft, Utc::now());

        assert_eq!(attendance_sheet(&workspace, date(), Some("BCA")).len(), 2);
        assert_eq!(bulk_targets(&workspace, date(), Some("BCA")), vec![a.id]);
    }
}
