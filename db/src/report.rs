//! Tabular export of section attendance reports.
//!
//! Thin collaborator-facing rendering: the rows come straight from
//! [`crate::summary::compute_section_report`] and are serialized as CSV for
//! download. No layout or styling concerns live here.

use crate::summary::SectionReportRow;

pub const CSV_HEADER: &str =
    "student_number,name,email,total_sessions,attended,excused,absent,percentage,status,flagged\n";

/// Renders a section report as CSV, one row per student, percentage with
/// one decimal.
pub fn render_csv(rows: &[SectionReportRow]) -> String {
    let mut csv = String::from(CSV_HEADER);

    for row in rows {
        let s = &row.summary;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{:.1},{},{}\n",
            esc(&row.student.username),
            esc(&row.student.name),
            esc(&row.student.email),
            s.total_sessions,
            s.attended_sessions,
            s.excused_sessions,
            s.absent_sessions,
            s.attendance_percentage,
            s.status,
            s.flagged_count,
        ));
    }

    csv
}

fn esc(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{AttendanceSummary, SummaryStatus};
    use chrono::Utc;

    fn row(username: &str, name: &str, pct: f64, status: SummaryStatus) -> SectionReportRow {
        let now = Utc::now();
        SectionReportRow {
            student: crate::models::user::Model {
                id: 1,
                username: username.into(),
                name: name.into(),
                email: format!("{username}@test.com"),
                admin: false,
                created_at: now,
                updated_at: now,
            },
            summary: AttendanceSummary {
                section_id: 1,
                student_id: 1,
                total_sessions: 10,
                attended_sessions: 8,
                excused_sessions: 1,
                absent_sessions: 2,
                attendance_percentage: pct,
                status,
                flagged_count: 1,
            },
        }
    }

    #[test]
    fn renders_header_and_rows_with_one_decimal() {
        let rows = vec![row("u04250001", "Student A", 80.0, SummaryStatus::Ok)];
        let csv = render_csv(&rows);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER.trim_end()));
        assert_eq!(
            lines.next(),
            Some("u04250001,Student A,u04250001@test.com,10,8,1,2,80.0,ok,1")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn escapes_fields_containing_commas_and_quotes() {
        let rows = vec![row("u1", "Doe, Jane \"JJ\"", 66.7, SummaryStatus::Critical)];
        let csv = render_csv(&rows);
        assert!(csv.contains("\"Doe, Jane \"\"JJ\"\"\""));
        assert!(csv.contains(",66.7,critical,"));
    }
}
