use axum::{Json, http::StatusCode};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::guards::Empty;
use crate::response::ApiResponse;
use db::error::AttendanceError;
use db::models::attendance_session::Model as SessionModel;
use db::models::check_in::Model as CheckInModel;
use db::models::excuse_request::{ExcuseStatus, Model as ExcuseModel, ReviewDecision};

pub type ErrorReply = (StatusCode, Json<ApiResponse<Empty>>);

/// Maps a domain error onto the HTTP status it is reported with.
pub fn error_reply(err: AttendanceError) -> ErrorReply {
    let status = match &err {
        AttendanceError::Validation(_) => StatusCode::BAD_REQUEST,
        AttendanceError::NotFound(_) => StatusCode::NOT_FOUND,
        AttendanceError::Conflict(_) => StatusCode::CONFLICT,
        AttendanceError::Permission(_) => StatusCode::FORBIDDEN,
        AttendanceError::SessionUnavailable(_) => StatusCode::GONE,
        AttendanceError::Db(e) => {
            tracing::error!(error = %e, "database error while handling request");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ApiResponse::error(err.to_string())))
}

pub fn validation_reply(errors: validator::ValidationErrors) -> ErrorReply {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::error(errors.to_string())),
    )
}

/// Session as returned to staff and faculty. `status` is the *effective*
/// status at response time, so an overdue session reads `expired` without
/// any stored-state change.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub section_id: i64,
    pub created_by: i64,
    pub title: String,
    pub session_date: NaiveDate,
    pub starts_at: String,
    pub ends_at: String,
    pub status: String,
    pub geofence_radius_m: f64,
    pub anchor_lat: f64,
    pub anchor_lon: f64,
    pub backup_code: String,
    pub created_at: String,
    pub updated_at: String,
}

impl SessionResponse {
    pub fn from_model(m: SessionModel, now: DateTime<Utc>, grace: Duration) -> Self {
        let status = m.effective_status(now, grace).to_string();
        Self {
            id: m.id,
            section_id: m.section_id,
            created_by: m.created_by,
            title: m.title,
            session_date: m.session_date,
            starts_at: m.starts_at.to_rfc3339(),
            ends_at: m.ends_at.to_rfc3339(),
            status,
            geofence_radius_m: m.geofence_radius_m,
            anchor_lat: m.anchor_lat,
            anchor_lon: m.anchor_lon,
            backup_code: m.backup_code,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

/// Session as shown to students: no backup code, no anchor coordinates.
#[derive(Debug, Serialize)]
pub struct StudentSessionResponse {
    pub id: i64,
    pub section_id: i64,
    pub title: String,
    pub session_date: NaiveDate,
    pub starts_at: String,
    pub ends_at: String,
    pub status: String,
    pub geofence_radius_m: f64,
}

impl StudentSessionResponse {
    pub fn from_model(m: SessionModel, now: DateTime<Utc>, grace: Duration) -> Self {
        let status = m.effective_status(now, grace).to_string();
        Self {
            id: m.id,
            section_id: m.section_id,
            title: m.title,
            session_date: m.session_date,
            starts_at: m.starts_at.to_rfc3339(),
            ends_at: m.ends_at.to_rfc3339(),
            status,
            geofence_radius_m: m.geofence_radius_m,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct OpenSessionReq {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub session_date: NaiveDate,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub anchor_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub anchor_lon: f64,
    pub geofence_radius_m: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckInReq {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub accuracy_m: f64,
}

#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub session_id: i64,
    pub student_id: i64,
    pub submitted_at: String,
    pub distance_m: f64,
    pub outcome: String,
}

impl From<CheckInModel> for CheckInResponse {
    fn from(m: CheckInModel) -> Self {
        Self {
            session_id: m.session_id,
            student_id: m.student_id,
            submitted_at: m.submitted_at.to_rfc3339(),
            distance_m: m.distance_m,
            outcome: m.outcome.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExcuseReq {
    #[validate(length(min = 10, max = 2000))]
    pub reason: String,
    pub document_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewExcuseReq {
    pub decision: ReviewDecision,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExcuseListQuery {
    pub status: Option<ExcuseStatus>,
}

#[derive(Debug, Serialize)]
pub struct ExcuseResponse {
    pub id: i64,
    pub student_id: i64,
    pub session_id: i64,
    pub reason: String,
    pub document_ref: Option<String>,
    pub status: String,
    pub reviewed_by: Option<i64>,
    pub review_notes: Option<String>,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

impl From<ExcuseModel> for ExcuseResponse {
    fn from(m: ExcuseModel) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            session_id: m.session_id,
            reason: m.reason,
            document_ref: m.document_ref,
            status: m.status.to_string(),
            reviewed_by: m.reviewed_by,
            review_notes: m.review_notes,
            created_at: m.created_at.to_rfc3339(),
            reviewed_at: m.reviewed_at.map(|t| t.to_rfc3339()),
        }
    }
}
