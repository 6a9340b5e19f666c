//! Landing-page numbers and the department overview.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use strum::IntoEnumIterator;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::{
    attendance::{AttendanceRecord, Status},
    department,
    student::{Student, Year},
};

const RECENT_ACTIVITY: usize = 5;
const STUDENT_PREVIEW: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentToday {
    pub name: String,
    pub total: usize,
    pub present: usize,
    pub rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Activity {
    #[schema(value_type = String, format = "uuid")]
    pub record_id: Uuid,
    pub student_name: Option<String>,
    pub roll_number: Option<String>,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Dashboard {
    #[schema(example = "2026-07-14", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub total_students: usize,
    pub present_today: usize,
    pub attendance_rate: u32,
    pub active_departments: usize,
    pub departments: Vec<DepartmentToday>,
    pub recent_activity: Vec<Activity>,
}

fn percent_of(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Today's headline figures. Only `present` counts towards the daily rate.
pub fn dashboard(students: &[Student], records: &[AttendanceRecord], today: NaiveDate) -> Dashboard {
    let by_id: HashMap<Uuid, &Student> = students.iter().map(|s| (s.id, s)).collect();
    let todays: Vec<&AttendanceRecord> = records.iter().filter(|r| r.date == today).collect();
    let present: Vec<&AttendanceRecord> = todays
        .iter()
        .copied()
        .filter(|r| r.status == Status::Present)
        .collect();

    let departments = department::DEPARTMENTS
        .iter()
        .map(|name| {
            let total = students.iter().filter(|s| s.department == *name).count();
            let present = present
                .iter()
                .filter(|r| by_id.get(&r.student_id).is_some_and(|s| s.department == *name))
                .count();
            DepartmentToday {
                name: name.to_string(),
                total,
                present,
                rate: percent_of(present, total),
            }
        })
        .collect();

    let recent_activity = todays
        .iter()
        .take(RECENT_ACTIVITY)
        .map(|r| {
            let student = by_id.get(&r.student_id).copied().or(r.student.as_ref());
            Activity {
                record_id: r.id,
                student_name: student.map(|s| s.name.clone()),
                roll_number: student.map(|s| s.roll_number.clone()),
                status: r.status,
            }
        })
        .collect();

    Dashboard {
        date: today,
        total_students: students.len(),
        present_today: present.len(),
        attendance_rate: percent_of(present.len(), students.len()),
        active_departments: department::DEPARTMENTS.len(),
        departments,
        recent_activity,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct YearCount {
    pub year: Year,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentCard {
    pub name: String,
    pub total: usize,
    pub years: Vec<YearCount>,
    /// Last few students listed for the department.
    pub recent_students: Vec<String>,
    pub more_students: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentOverview {
    pub total_departments: usize,
    pub departments_with_students: usize,
    pub total_students: usize,
    pub average_per_department: usize,
    pub departments: Vec<DepartmentCard>,
}

pub fn department_overview(students: &[Student]) -> DepartmentOverview {
    let departments: Vec<DepartmentCard> = department::DEPARTMENTS
        .iter()
        .map(|name| {
            let members: Vec<&Student> = students.iter().filter(|s| s.department == *name).collect();
            let years = Year::iter()
                .map(|year| YearCount {
                    year,
                    count: members.iter().filter(|s| s.year == year).count(),
                })
                .collect();
            let preview_from = members.len().saturating_sub(STUDENT_PREVIEW);

            DepartmentCard {
                name: name.to_string(),
                total: members.len(),
                years,
                recent_students: members[preview_from..].iter().map(|s| s.name.clone()).collect(),
                more_students: preview_from,
            }
        })
        .collect();

    let total_departments = departments.len();
    let average_per_department = if students.is_empty() || total_departments == 0 {
        0
    } else {
        (students.len() as f64 / total_departments as f64).round() as usize
    };

    DepartmentOverview {
        total_departments,
        departments_with_students: departments.iter().filter(|d| d.total > 0).count(),
        total_students: students.len(),
        average_per_department,
        departments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::fixtures::{day, record, student};

    #[test]
    fn dashboard_counts_only_today_and_present() {
        let a = student("asha", "BCA");
        let b = student("bala", "BCA");
        let c = student("chitra", "BBA");
        let records = vec![
            record(&a, day(14), Status::Present),
            record(&b, day(14), Status::Late),
            record(&c, day(14), Status::Present),
            record(&b, day(13), Status::Present),
        ];
        let board = dashboard(&[a, b, c], &records, day(14));

        assert_eq!(board.total_students, 3);
        assert_eq!(board.present_today, 2);
        assert_eq!(board.attendance_rate, 67);
        assert_eq!(board.recent_activity.len(), 3);
        assert_eq!(board.recent_activity[1].status, Status::Late);

        let bca = board.departments.iter().find(|d| d.name == "BCA").unwrap();
        assert_eq!((bca.total, bca.present, bca.rate), (2, 1, 50));
        let tamil = board.departments.iter().find(|d| d.name == "B.A. Tamil").unwrap();
        assert_eq!(tamil.rate, 0);
    }

    #[test]
    fn empty_roster_has_zero_rate() {
        let board = dashboard(&[], &[], day(14));
        assert_eq!(board.attendance_rate, 0);
        assert!(board.recent_activity.is_empty());
    }

    #[test]
    fn overview_breaks_down_years_and_previews_last_three() {
        let roster: Vec<Student> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|n| student(n, "BCA"))
            .collect();
        let overview = department_overview(&roster);

        let bca = overview.departments.iter().find(|d| d.name == "BCA").unwrap();
        assert_eq!(bca.total, 5);
        assert_eq!(bca.recent_students, vec!["c", "d", "e"]);
        assert_eq!(bca.more_students, 2);
        let second = bca.years.iter().find(|y| y.year == Year::Second).unwrap();
        assert_eq!(second.count, 5);

        assert_eq!(overview.departments_with_students, 1);
        assert_eq!(overview.average_per_department, 0);
    }
}
