//! Derived attendance statistics.
//!
//! A summary is never stored: it is recomputed from raw sessions, check-ins
//! and excuse approvals on every call. Class sizes are small, and a stale
//! cached percentage after an excuse review would be worse than the extra
//! reads.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::HashSet;
use strum::Display;

use crate::error::Result;
use crate::models::attendance_session::{Model as Session, SessionStatus};
use crate::models::check_in::{self, CheckInOutcome};
use crate::models::excuse_request::{self, ExcuseStatus};
use crate::models::{user, user_section_role};

/// Percentage at or above which attendance is considered in good standing.
pub const OK_THRESHOLD_PCT: f64 = 80.0;
/// Percentage at or above which attendance is a warning rather than critical.
pub const WARNING_THRESHOLD_PCT: f64 = 70.0;

/// Per-student, per-section attendance statistics. Derived only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub section_id: i64,
    pub student_id: i64,
    /// Sessions that can already be judged (closed or expired).
    pub total_sessions: u32,
    /// Accepted check-ins plus approved excuses.
    pub attended_sessions: u32,
    /// Approved excuses without an accepted check-in.
    pub excused_sessions: u32,
    pub absent_sessions: u32,
    /// In [0, 100]; defined as 0 when there are no judged sessions.
    pub attendance_percentage: f64,
    pub status: SummaryStatus,
    /// Flagged check-ins with no approved excuse.
    pub flagged_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum SummaryStatus {
    Ok,
    Warning,
    Critical,
}

impl SummaryStatus {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= OK_THRESHOLD_PCT {
            Self::Ok
        } else if pct >= WARNING_THRESHOLD_PCT {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

/// One row of a section-wide report.
#[derive(Debug, Clone, Serialize)]
pub struct SectionReportRow {
    pub student: user::Model,
    pub summary: AttendanceSummary,
}

/// Computes the attendance summary for one student in one section.
///
/// Sessions still active are excluded: attendance cannot be judged before a
/// session is over. A storage failure on any constituent read fails the
/// whole computation; a silently-incomplete percentage is never returned.
pub async fn compute_summary(
    db: &DatabaseConnection,
    section_id: i64,
    student_id: i64,
    now: DateTime<Utc>,
    grace: Duration,
) -> Result<AttendanceSummary> {
    let sessions = Session::list_for_section(db, section_id).await?;
    let session_ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();

    let check_ins = check_in::Entity::find()
        .filter(check_in::Column::SessionId.is_in(session_ids.clone()))
        .filter(check_in::Column::StudentId.eq(student_id))
        .all(db)
        .await?;

    let approved_excuses = excuse_request::Entity::find()
        .filter(excuse_request::Column::SessionId.is_in(session_ids))
        .filter(excuse_request::Column::StudentId.eq(student_id))
        .filter(excuse_request::Column::Status.eq(ExcuseStatus::Approved))
        .all(db)
        .await?;

    let accepted: HashSet<i64> = check_ins
        .iter()
        .filter(|c| c.outcome == CheckInOutcome::Accepted)
        .map(|c| c.session_id)
        .collect();
    let excused: HashSet<i64> = approved_excuses.iter().map(|e| e.session_id).collect();

    let mut total = 0u32;
    let mut attended = 0u32;
    let mut excused_count = 0u32;
    let mut absent = 0u32;

    for session in &sessions {
        if session.effective_status(now, grace) == SessionStatus::Active {
            continue;
        }
        total += 1;
        let has_accepted = accepted.contains(&session.id);
        let has_excuse = excused.contains(&session.id);
        if has_accepted || has_excuse {
            attended += 1;
            if has_excuse && !has_accepted {
                excused_count += 1;
            }
        } else {
            // includes a flagged, non-excused check-in
            absent += 1;
        }
    }

    let flagged_count = check_ins
        .iter()
        .filter(|c| c.outcome == CheckInOutcome::Flagged && !excused.contains(&c.session_id))
        .count() as u32;

    let attendance_percentage = if total == 0 {
        0.0
    } else {
        f64::from(attended) / f64::from(total) * 100.0
    };

    Ok(AttendanceSummary {
        section_id,
        student_id,
        total_sessions: total,
        attended_sessions: attended,
        excused_sessions: excused_count,
        absent_sessions: absent,
        attendance_percentage,
        status: SummaryStatus::from_percentage(attendance_percentage),
        flagged_count,
    })
}

/// Computes summaries for every enrolled student of a section, ordered by
/// student number. Recomputed in full on each call.
pub async fn compute_section_report(
    db: &DatabaseConnection,
    section_id: i64,
    now: DateTime<Utc>,
    grace: Duration,
) -> Result<Vec<SectionReportRow>> {
    let students = user_section_role::Model::students_of_section(db, section_id).await?;

    let mut rows = Vec::with_capacity(students.len());
    for student in students {
        let summary = compute_summary(db, section_id, student.id, now, grace).await?;
        rows.push(SectionReportRow { student, summary });
    }
    Ok(rows)
}
