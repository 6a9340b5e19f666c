use chrono::NaiveDate;
use csv::Writer;

use crate::reports::Report;

pub fn export_filename(today: NaiveDate) -> String {
    format!("GASC_Attendance_Report_{}.csv", today.format("%Y-%m-%d"))
}

fn percent(rate: u32) -> String {
    format!("{rate}%")
}

/// Serializes a report as CSV with a header row per report kind.
pub fn report_csv(report: &Report) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = Writer::from_writer(Vec::new());

    match report {
        Report::Summary(summary) => {
            wtr.write_record(["Metric", "Value"])?;
            wtr.write_record(["Total Classes", summary.total_classes.to_string().as_str()])?;
            wtr.write_record(["Total Students", summary.total_students.to_string().as_str()])?;
            wtr.write_record(["Present", summary.present.to_string().as_str()])?;
            wtr.write_record(["Absent", summary.absent.to_string().as_str()])?;
            wtr.write_record(["Late", summary.late.to_string().as_str()])?;
            wtr.write_record(["Attendance Rate", percent(summary.attendance_rate).as_str()])?;
        }
        Report::Student(rows) => {
            wtr.write_record([
                "Name",
                "Roll Number",
                "Department",
                "Year",
                "Total Classes",
                "Present",
                "Absent",
                "Late",
                "Attendance Rate",
            ])?;
            for row in rows {
                wtr.write_record([
                    row.name.clone(),
                    row.roll_number.clone(),
                    row.department.clone(),
                    row.year.to_string(),
                    row.total_classes.to_string(),
                    row.present.to_string(),
                    row.absent.to_string(),
                    row.late.to_string(),
                    percent(row.attendance_rate),
                ])?;
            }
        }
        Report::Detailed(rows) => {
            wtr.write_record([
                "Department",
                "Total Students",
                "Total Classes",
                "Present",
                "Absent",
                "Late",
                "Attendance Rate",
            ])?;
            for row in rows {
                wtr.write_record([
                    row.department.clone(),
                    row.total_students.to_string(),
                    row.total_classes.to_string(),
                    row.present.to_string(),
                    row.absent.to_string(),
                    row.late.to_string(),
                    percent(row.attendance_rate),
                ])?;
            }
        }
    }

    wtr.into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::Status;
    use crate::reports::fixtures::{day, record, student};
    use crate::reports::{ReportFilter, ReportKind, build};

    fn lines(bytes: &[u8]) -> Vec<String> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn filename_carries_the_date() {
        assert_eq!(export_filename(day(14)), "GASC_Attendance_Report_2026-07-14.csv");
    }

    #[test]
    fn summary_csv_lists_metrics() {
        let a = student("asha", "BCA");
        let records = vec![record(&a, day(1), Status::Late)];
        let report = build(ReportKind::Summary, &ReportFilter::default(), &[a], &records);

        let out = lines(&report_csv(&report).unwrap());
        assert_eq!(
            out,
            vec![
                "Metric,Value",
                "Total Classes,1",
                "Total Students,1",
                "Present,0",
                "Absent,0",
                "Late,1",
                "Attendance Rate,100%",
            ]
        );
    }

    #[test]
    fn student_csv_has_one_row_of_nine_fields_per_student() {
        let a = student("asha", "BCA");
        let b = student("bala", "BCA");
        let c = student("chitra", "BBA");
        let records = vec![
            record(&a, day(1), Status::Present),
            record(&b, day(1), Status::Absent),
        ];
        let filter = ReportFilter {
            department: Some("BCA".into()),
            ..Default::default()
        };
        let report = build(ReportKind::Student, &filter, &[a, b, c], &records);
        let bytes = report_csv(&report).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(
            headers,
            vec![
                "Name",
                "Roll Number",
                "Department",
                "Year",
                "Total Classes",
                "Present",
                "Absent",
                "Late",
                "Attendance Rate",
            ]
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.len() == 9));
        assert_eq!(&rows[0][0], "asha");
        assert_eq!(&rows[0][3], "II Year");
        assert_eq!(&rows[0][8], "100%");
        assert_eq!(&rows[1][6], "1");
    }

    #[test]
    fn commas_in_names_are_quoted() {
        let a = student("Kumar, Arun", "BCA");
        let report = build(ReportKind::Student, &ReportFilter::default(), &[a], &[]);
        let out = lines(&report_csv(&report).unwrap());
        assert!(out[1].starts_with("\"Kumar, Arun\",\"R-Kumar, Arun\",BCA,"));
    }

    #[test]
    fn detailed_csv_has_department_header() {
        let a = student("asha", "BCA");
        let report = build(ReportKind::Detailed, &ReportFilter::default(), &[a], &[]);
        let out = lines(&report_csv(&report).unwrap());
        assert_eq!(out[0], "Department,Total Students,Total Classes,Present,Absent,Late,Attendance Rate");
        assert_eq!(out[1], "BCA,1,0,0,0,0,0%");
    }
}
