use api::routes::routes;
use axum::{Router, body::Body, http::Request, response::Response};
use db::test_utils::setup_test_db;
use std::convert::Infallible;
use tower::ServiceExt;
use tower::util::BoxCloneService;
use util::{config::AppConfig, state::AppState};

pub type TestApp = BoxCloneService<Request<Body>, Response, Infallible>;

/// Builds the production router over a fresh in-memory database.
///
/// Each call gets its own database, so tests are isolated without any
/// cleanup ordering concerns.
pub async fn make_test_app() -> (TestApp, AppState) {
    AppConfig::set_jwt_secret("integration-test-secret");

    let db = setup_test_db().await;
    let app_state = AppState::new(db);

    let router = Router::new().nest("/api", routes(app_state.clone()));
    (router.into_service().boxed_clone(), app_state)
}

/// Builds a JSON request carrying a bearer token.
pub fn auth_req(
    method: &str,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json");
    match body {
        Some(b) => builder.body(Body::from(b.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
