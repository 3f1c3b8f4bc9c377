use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use chrono::Utc;

use crate::{auth::AuthUser, response::ApiResponse};
use util::{config, state::AppState};

use super::common::{
    ErrorReply, ExcuseListQuery, ExcuseResponse, SessionResponse, error_reply,
};
use db::error::AttendanceError;
use db::models::attendance_session::Model as SessionModel;
use db::models::excuse_request::Model as ExcuseModel;
use db::models::user::Model as UserModel;
use db::models::user_section_role::Role;
use db::report::render_csv;
use db::summary::{self, AttendanceSummary, SectionReportRow};

/// GET /api/sections/{section_id}/attendance/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(section_id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<SessionResponse>>>), ErrorReply> {
    let now = Utc::now();
    let grace = config::attendance_grace_period();

    let sessions = SessionModel::list_for_section(state.db(), section_id)
        .await
        .map_err(error_reply)?
        .into_iter()
        .map(|s| SessionResponse::from_model(s, now, grace))
        .collect();

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(sessions, "Sessions retrieved")),
    ))
}

/// GET /api/sections/{section_id}/attendance/sessions/{session_id}
pub async fn get_session(
    State(state): State<AppState>,
    Path((section_id, session_id)): Path<(i64, i64)>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ErrorReply> {
    let session = SessionModel::get(state.db(), session_id)
        .await
        .map_err(error_reply)?;
    if session.section_id != section_id {
        return Err(error_reply(AttendanceError::not_found(format!(
            "Session {session_id} not found in this section"
        ))));
    }

    let now = Utc::now();
    let grace = config::attendance_grace_period();
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            SessionResponse::from_model(session, now, grace),
            "Session retrieved",
        )),
    ))
}

/// GET /api/sections/{section_id}/attendance/excuses?status=pending
pub async fn list_excuses(
    State(state): State<AppState>,
    Path(section_id): Path<i64>,
    Query(query): Query<ExcuseListQuery>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ExcuseResponse>>>), ErrorReply> {
    let rows = ExcuseModel::list_for_section(state.db(), section_id, query.status)
        .await
        .map_err(error_reply)?
        .into_iter()
        .map(ExcuseResponse::from)
        .collect();

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(rows, "Excuse requests retrieved")),
    ))
}

/// GET /api/sections/{section_id}/attendance/students/{student_id}/summary
///
/// Staff and faculty may read any student's summary; a student may only
/// read their own.
pub async fn student_summary(
    State(state): State<AppState>,
    Path((section_id, student_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ApiResponse<AttendanceSummary>>), ErrorReply> {
    let db = state.db();

    if claims.sub != student_id && !claims.admin {
        let is_staff = UserModel::is_in_role(db, claims.sub, section_id, Role::Staff)
            .await
            .unwrap_or(false)
            || UserModel::is_in_role(db, claims.sub, section_id, Role::Faculty)
                .await
                .unwrap_or(false);
        if !is_staff {
            return Err(error_reply(AttendanceError::permission(
                "Students may only view their own attendance summary",
            )));
        }
    }

    let now = Utc::now();
    let grace = config::attendance_grace_period();
    let summary = summary::compute_summary(db, section_id, student_id, now, grace)
        .await
        .map_err(error_reply)?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(summary, "Attendance summary computed")),
    ))
}

/// GET /api/sections/{section_id}/attendance/report
pub async fn section_report(
    State(state): State<AppState>,
    Path(section_id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<SectionReportRow>>>), ErrorReply> {
    let now = Utc::now();
    let grace = config::attendance_grace_period();

    let rows = summary::compute_section_report(state.db(), section_id, now, grace)
        .await
        .map_err(error_reply)?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(rows, "Section report computed")),
    ))
}

/// GET /api/sections/{section_id}/attendance/report/export
///
/// Same rows as the JSON report, rendered as a CSV attachment.
pub async fn export_report_csv(
    State(state): State<AppState>,
    Path(section_id): Path<i64>,
) -> Result<(StatusCode, HeaderMap, String), ErrorReply> {
    let now = Utc::now();
    let grace = config::attendance_grace_period();

    let rows = summary::compute_section_report(state.db(), section_id, now, grace)
        .await
        .map_err(error_reply)?;

    let csv = render_csv(&rows);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    let disposition = format!("attachment; filename=\"attendance_section_{section_id}.csv\"");
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((StatusCode::OK, headers, csv))
}
