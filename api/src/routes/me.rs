//! Endpoints scoped to the authenticated user.

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::get,
};
use chrono::Utc;

use crate::auth::AuthUser;
use crate::auth::guards::allow_authenticated;
use crate::response::ApiResponse;
use crate::routes::sections::attendance::common::StudentSessionResponse;
use db::models::attendance_session::Model as SessionModel;
use util::{config, state::AppState};

pub fn me_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/attendance/sessions", get(list_my_active_sessions))
        .route_layer(from_fn(allow_authenticated))
        .with_state(app_state)
}

/// GET /api/me/attendance/sessions
///
/// Sessions the authenticated student can currently check into, across all
/// sections they are enrolled in. Expiry is evaluated against the request
/// time, so a session past its window never appears here even though its
/// stored status is untouched.
async fn list_my_active_sessions(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<Vec<StudentSessionResponse>>>) {
    let now = Utc::now();
    let grace = config::attendance_grace_period();

    match SessionModel::list_active_for_student(state.db(), claims.sub, now, grace).await {
        Ok(rows) => {
            let sessions = rows
                .into_iter()
                .map(|s| StudentSessionResponse::from_model(s, now, grace))
                .collect();
            (
                StatusCode::OK,
                Json(ApiResponse::success(sessions, "Active sessions retrieved")),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!(
                "Failed to list active sessions: {e}"
            ))),
        ),
    }
}
