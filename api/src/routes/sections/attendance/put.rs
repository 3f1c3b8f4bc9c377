use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{auth::AuthUser, response::ApiResponse};
use util::{config, state::AppState};

use super::common::{ErrorReply, ExcuseResponse, ReviewExcuseReq, SessionResponse, error_reply};
use db::error::AttendanceError;
use db::models::attendance_session::Model as SessionModel;
use db::models::excuse_request::Model as ExcuseModel;

/// PUT /api/sections/{section_id}/attendance/sessions/{session_id}/close
///
/// Explicitly closes an active session. Creator-or-admin ownership is
/// enforced in the model; the route guard only establishes the caller is
/// faculty of the section.
pub async fn close_session(
    State(state): State<AppState>,
    Path((section_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ErrorReply> {
    let db = state.db();
    let now = Utc::now();
    let grace = config::attendance_grace_period();

    let session = SessionModel::get(db, session_id).await.map_err(error_reply)?;
    if session.section_id != section_id {
        return Err(error_reply(AttendanceError::not_found(format!(
            "Session {session_id} not found in this section"
        ))));
    }

    let closed = SessionModel::close(db, session_id, claims.sub, claims.admin, now, grace)
        .await
        .map_err(error_reply)?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            SessionResponse::from_model(closed, now, grace),
            "Session closed",
        )),
    ))
}

/// PUT /api/sections/{section_id}/attendance/excuses/{request_id}/review
pub async fn review_excuse(
    State(state): State<AppState>,
    Path((_section_id, request_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<ReviewExcuseReq>,
) -> Result<(StatusCode, Json<ApiResponse<ExcuseResponse>>), ErrorReply> {
    let now = Utc::now();

    let reviewed = ExcuseModel::review(
        state.db(),
        request_id,
        claims.sub,
        claims.admin,
        body.decision,
        body.notes.as_deref(),
        now,
    )
    .await
    .map_err(error_reply)?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            ExcuseResponse::from(reviewed),
            "Excuse request reviewed",
        )),
    ))
}
