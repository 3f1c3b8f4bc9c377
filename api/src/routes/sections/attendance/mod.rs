use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use util::state::AppState;

pub mod common;
mod get;
mod post;
mod put;

pub use get::{
    export_report_csv, get_session, list_excuses, list_sessions, section_report, student_summary,
};
pub use post::{create_excuse, open_session, submit_check_in};
pub use put::{close_session, review_excuse};

use crate::auth::guards::{allow_faculty, allow_staff, allow_student};

pub fn attendance_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sessions", post(open_session).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/sessions", get(list_sessions).route_layer(from_fn_with_state(app_state.clone(), allow_staff)))
        .route("/sessions/{session_id}", get(get_session).route_layer(from_fn_with_state(app_state.clone(), allow_staff)))
        .route("/sessions/{session_id}/close", put(close_session).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/sessions/{session_id}/check-in", post(submit_check_in).route_layer(from_fn_with_state(app_state.clone(), allow_student)))
        .route("/sessions/{session_id}/excuses", post(create_excuse).route_layer(from_fn_with_state(app_state.clone(), allow_student)))
        .route("/excuses", get(list_excuses).route_layer(from_fn_with_state(app_state.clone(), allow_staff)))
        .route("/excuses/{request_id}/review", put(review_excuse).route_layer(from_fn_with_state(app_state.clone(), allow_faculty)))
        .route("/students/{student_id}/summary", get(student_summary).route_layer(from_fn_with_state(app_state.clone(), allow_student)))
        .route("/report", get(section_report).route_layer(from_fn_with_state(app_state.clone(), allow_staff)))
        .route("/report/export", get(export_report_csv).route_layer(from_fn_with_state(app_state.clone(), allow_staff)))
        .with_state(app_state)
}
