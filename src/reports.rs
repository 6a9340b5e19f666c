//! Attendance reports: pure reductions over the roster and the records that
//! pass a date/department filter.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::model::{
    attendance::{AttendanceRecord, Status},
    department,
    student::{Student, Year},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportKind {
    Summary,
    Student,
    /// Department-wise breakdown.
    Detailed,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportFilter {
    /// First day included (inclusive)
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    /// Last day included (inclusive)
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    /// Restrict to one department; empty means all
    pub department: Option<String>,
}

impl ReportFilter {
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref().filter(|d| !d.is_empty())
    }

    fn includes_date(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SummaryReport {
    pub total_classes: usize,
    pub total_students: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub attendance_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StudentReportRow {
    #[schema(value_type = String, format = "uuid")]
    pub student_id: Uuid,
    pub name: String,
    pub roll_number: String,
    pub department: String,
    pub year: Year,
    pub total_classes: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub attendance_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DepartmentReportRow {
    pub department: String,
    pub total_students: usize,
    pub total_classes: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub attendance_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Report {
    Summary(SummaryReport),
    Student(Vec<StudentReportRow>),
    Detailed(Vec<DepartmentReportRow>),
}

/// Share of attendable slots (students × classes) that were attended,
/// as a whole percentage. Zero when there is nothing to attend.
pub fn attendance_rate(attended: usize, students: usize, classes: usize) -> u32 {
    let slots = students * classes;
    if slots == 0 {
        return 0;
    }
    ((attended as f64 / slots as f64) * 100.0).round() as u32
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    present: usize,
    absent: usize,
    late: usize,
}

impl Tally {
    fn add(&mut self, status: Status) {
        match status {
            Status::Present => self.present += 1,
            Status::Absent => self.absent += 1,
            Status::Late => self.late += 1,
        }
    }

    fn attended(&self) -> usize {
        self.present + self.late
    }
}

/// Filtered view shared by the three reports.
struct Scope<'a> {
    students: Vec<&'a Student>,
    records: Vec<&'a AttendanceRecord>,
    departments: HashMap<Uuid, &'a str>,
    total_classes: usize,
}

impl<'a> Scope<'a> {
    fn new(filter: &ReportFilter, students: &'a [Student], records: &'a [AttendanceRecord]) -> Self {
        let department = filter.department();

        let mut departments: HashMap<Uuid, &str> = HashMap::new();
        for record in records {
            if let Some(student) = &record.student {
                departments.insert(student.id, student.department.as_str());
            }
        }
        // the live roster wins over a possibly stale embedded copy
        for student in students {
            departments.insert(student.id, student.department.as_str());
        }

        let students: Vec<&Student> = students
            .iter()
            .filter(|s| department.is_none_or(|d| s.department == d))
            .collect();

        let records: Vec<&AttendanceRecord> = records
            .iter()
            .filter(|r| filter.includes_date(r.date))
            .filter(|r| {
                department.is_none_or(|d| departments.get(&r.student_id).is_some_and(|rd| *rd == d))
            })
            .collect();

        let total_classes = records.iter().map(|r| r.date).collect::<BTreeSet<_>>().len();

        Self {
            students,
            records,
            departments,
            total_classes,
        }
    }

    fn tally_where(&self, keep: impl Fn(&AttendanceRecord) -> bool) -> Tally {
        let mut tally = Tally::default();
        for record in &self.records {
            if keep(*record) {
                tally.add(record.status);
            }
        }
        tally
    }
}

pub fn summary_report(
    filter: &ReportFilter,
    students: &[Student],
    records: &[AttendanceRecord],
) -> SummaryReport {
    let scope = Scope::new(filter, students, records);
    let tally = scope.tally_where(|_| true);
    let total_students = scope.students.len();

    SummaryReport {
        total_classes: scope.total_classes,
        total_students,
        present: tally.present,
        absent: tally.absent,
        late: tally.late,
        attendance_rate: attendance_rate(tally.attended(), total_students, scope.total_classes),
    }
}

pub fn student_report(
    filter: &ReportFilter,
    students: &[Student],
    records: &[AttendanceRecord],
) -> Vec<StudentReportRow> {
    let scope = Scope::new(filter, students, records);

    let mut tallies: HashMap<Uuid, Tally> = HashMap::new();
    for record in &scope.records {
        tallies.entry(record.student_id).or_default().add(record.status);
    }

    scope
        .students
        .iter()
        .map(|student| {
            let tally = tallies.get(&student.id).copied().unwrap_or_default();
            StudentReportRow {
                student_id: student.id,
                name: student.name.clone(),
                roll_number: student.roll_number.clone(),
                department: student.department.clone(),
                year: student.year,
                total_classes: scope.total_classes,
                present: tally.present,
                absent: tally.absent,
                late: tally.late,
                attendance_rate: attendance_rate(tally.attended(), 1, scope.total_classes),
            }
        })
        .collect()
}

/// One row per department that has at least one student in scope.
pub fn department_report(
    filter: &ReportFilter,
    students: &[Student],
    records: &[AttendanceRecord],
) -> Vec<DepartmentReportRow> {
    let scope = Scope::new(filter, students, records);

    department::with_extras(scope.students.iter().map(|s| s.department.as_str()))
        .into_iter()
        .filter_map(|name| {
            let total_students = scope.students.iter().filter(|s| s.department == name).count();
            if total_students == 0 {
                return None;
            }

            let tally = scope.tally_where(|r| {
                scope
                    .departments
                    .get(&r.student_id)
                    .is_some_and(|d| *d == name)
            });

            Some(DepartmentReportRow {
                attendance_rate: attendance_rate(tally.attended(), total_students, scope.total_classes),
                department: name,
                total_students,
                total_classes: scope.total_classes,
                present: tally.present,
                absent: tally.absent,
                late: tally.late,
            })
        })
        .collect()
}

pub fn build(
    kind: ReportKind,
    filter: &ReportFilter,
    students: &[Student],
    records: &[AttendanceRecord],
) -> Report {
    match kind {
        ReportKind::Summary => Report::Summary(summary_report(filter, students, records)),
        ReportKind::Student => Report::Student(student_report(filter, students, records)),
        ReportKind::Detailed => Report::Detailed(department_report(filter, students, records)),
    }
}
