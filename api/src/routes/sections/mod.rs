use axum::Router;
use util::state::AppState;

pub mod attendance;

use attendance::attendance_routes;

/// Section-scoped route groups. Role guards are applied per route inside
/// each group, keyed on the `section_id` path parameter.
pub fn sections_routes(app_state: AppState) -> Router {
    Router::new().nest(
        "/{section_id}/attendance",
        attendance_routes(app_state),
    )
}
