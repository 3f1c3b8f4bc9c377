use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use validator::Validate;

use crate::{auth::AuthUser, response::ApiResponse};
use util::{config, geo::Coordinate, state::AppState};

use super::common::{
    CheckInReq, CheckInResponse, CreateExcuseReq, ErrorReply, ExcuseResponse, OpenSessionReq,
    SessionResponse, error_reply, validation_reply,
};
use db::error::AttendanceError;
use db::models::attendance_session::Model as SessionModel;
use db::models::check_in::Model as CheckInModel;
use db::models::excuse_request::Model as ExcuseModel;
use db::models::user::Model as UserModel;
use db::models::user_section_role::Role;

/// POST /api/sections/{section_id}/attendance/sessions
///
/// Opens a new geofenced session. Route guard has already established the
/// caller is faculty of this section (or an admin).
pub async fn open_session(
    State(state): State<AppState>,
    Path(section_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<OpenSessionReq>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ErrorReply> {
    body.validate().map_err(validation_reply)?;

    let session = SessionModel::open(
        state.db(),
        section_id,
        claims.sub,
        &body.title,
        body.session_date,
        body.starts_at,
        body.ends_at,
        Coordinate::new(body.anchor_lat, body.anchor_lon),
        body.geofence_radius_m,
    )
    .await
    .map_err(error_reply)?;

    let now = Utc::now();
    let grace = config::attendance_grace_period();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            SessionResponse::from_model(session, now, grace),
            "Attendance session opened",
        )),
    ))
}

/// POST /api/sections/{section_id}/attendance/sessions/{session_id}/check-in
///
/// Records the caller's presence. Out-of-fence submissions are stored as
/// `flagged` rather than rejected, so the 201 reply carries the outcome the
/// client should surface.
pub async fn submit_check_in(
    State(state): State<AppState>,
    Path((section_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<CheckInReq>,
) -> Result<(StatusCode, Json<ApiResponse<CheckInResponse>>), ErrorReply> {
    body.validate().map_err(validation_reply)?;

    let db = state.db();
    let now = Utc::now();
    let grace = config::attendance_grace_period();

    // Only students of the section may check in; staff presence is not
    // attendance.
    let is_student = UserModel::is_in_role(db, claims.sub, section_id, Role::Student)
        .await
        .unwrap_or(false);
    if !is_student {
        return Err(error_reply(AttendanceError::permission(
            "Only enrolled students may check in",
        )));
    }

    let session = SessionModel::get(db, session_id).await.map_err(error_reply)?;
    if session.section_id != section_id {
        return Err(error_reply(AttendanceError::not_found(format!(
            "Session {session_id} not found in this section"
        ))));
    }

    let row = CheckInModel::submit(
        db,
        &session,
        claims.sub,
        Coordinate::new(body.latitude, body.longitude),
        body.accuracy_m,
        now,
        grace,
    )
    .await
    .map_err(error_reply)?;

    let message = match row.outcome {
        db::models::check_in::CheckInOutcome::Accepted => "Check-in accepted",
        db::models::check_in::CheckInOutcome::Flagged => {
            "Check-in recorded outside the geofence and flagged for review"
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CheckInResponse::from(row), message)),
    ))
}

/// POST /api/sections/{section_id}/attendance/sessions/{session_id}/excuses
///
/// Files an excuse request against a session. A prior check-in is not
/// required; the request may contest a flagged check-in or a plain absence.
pub async fn create_excuse(
    State(state): State<AppState>,
    Path((section_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<CreateExcuseReq>,
) -> Result<(StatusCode, Json<ApiResponse<ExcuseResponse>>), ErrorReply> {
    body.validate().map_err(validation_reply)?;

    let db = state.db();

    let is_student = UserModel::is_in_role(db, claims.sub, section_id, Role::Student)
        .await
        .unwrap_or(false);
    if !is_student {
        return Err(error_reply(AttendanceError::permission(
            "Only enrolled students may file excuse requests",
        )));
    }

    let session = SessionModel::get(db, session_id).await.map_err(error_reply)?;
    if session.section_id != section_id {
        return Err(error_reply(AttendanceError::not_found(format!(
            "Session {session_id} not found in this section"
        ))));
    }

    let row = ExcuseModel::create(
        db,
        claims.sub,
        session_id,
        &body.reason,
        body.document_ref.as_deref(),
    )
    .await
    .map_err(error_reply)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            ExcuseResponse::from(row),
            "Excuse request submitted",
        )),
    ))
}
