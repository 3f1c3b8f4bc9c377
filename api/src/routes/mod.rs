//! HTTP route entry point for `/api/...`.
//!
//! Routes are organized by domain, each group protected via the appropriate
//! access control middleware:
//! - `/health` → liveness probe (public)
//! - `/sections/{section_id}/attendance` → session, check-in, excuse and
//!   report endpoints (role-guarded per route)
//! - `/me` → endpoints scoped to the authenticated user

use crate::routes::{health::health_routes, me::me_routes, sections::sections_routes};
use axum::Router;
use util::state::AppState;

pub mod health;
pub mod me;
pub mod sections;

/// Builds the complete application router for all HTTP endpoints.
///
/// All route registration happens here so `main` stays focused on server
/// startup and the integration tests can mount the exact production router.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/sections", sections_routes(app_state.clone()))
        .nest("/me", me_routes(app_state))
}
