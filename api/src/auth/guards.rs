use crate::auth::claims::AuthUser;
use crate::response::ApiResponse;
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::{user, user_section_role::Role};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use util::state::AppState;

// --- Role Based Access Guards ---

#[derive(serde::Serialize, Default)]
pub struct Empty;

/// Helper to extract, validate user from request extensions and insert them back into the request
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), (StatusCode, Json<ApiResponse<Empty>>)> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )
        })?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Helper to check if user has any of the specified roles
async fn user_has_any_role(
    db: &DatabaseConnection,
    user_id: i64,
    section_id: i64,
    roles: &[Role],
) -> bool {
    if roles.is_empty() {
        // No roles specified -> deny (fail-safe)
        return false;
    }

    for role in roles {
        match user::Model::is_in_role(db, user_id, section_id, *role).await {
            Ok(true) => return true,
            Ok(false) => continue,
            Err(e) => {
                // Log and deny on DB error (fail-safe)
                tracing::warn!(
                    error = %e,
                    user_id, section_id, role = %role,
                    "DB error while checking role; denying access"
                );
                return false;
            }
        }
    }
    false
}

/// Basic guard to ensure the request is authenticated.
pub async fn allow_authenticated(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, _user) = extract_and_insert_authuser(req).await?;

    Ok(next.run(req).await)
}

/// Admin-only guard.
pub async fn allow_admin(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    if !user.0.admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Admin access required")),
        ));
    }

    Ok(next.run(req).await)
}

/// Base role-based access guard that other guards build upon
async fn allow_role_base(
    State(app_state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
    required_roles: &[Role],
    failure_msg: &str,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let db: &DatabaseConnection = app_state.db();

    let (req, user) = extract_and_insert_authuser(req).await?;

    let section_id = params
        .get("section_id")
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Missing or invalid section_id")),
        ))?;

    if user.0.admin {
        return Ok(next.run(req).await);
    }

    if user_has_any_role(db, user.0.sub, section_id, required_roles).await {
        Ok(next.run(req).await)
    } else {
        Err((StatusCode::FORBIDDEN, Json(ApiResponse::error(failure_msg))))
    }
}

/// Compute the set of roles that are considered "higher or equal" in privilege to the provided role.
///
/// Hierarchy (high -> low): Faculty > Staff > Student
/// If you allow a role you implicitly allow all roles ABOVE it.
/// Example: allowing `Staff` permits Staff and Faculty; not Students.
fn roles_higher_or_equal(role: Role) -> &'static [Role] {
    match role {
        Role::Faculty => &[Role::Faculty],
        Role::Staff => &[Role::Faculty, Role::Staff],
        Role::Student => &[Role::Faculty, Role::Staff, Role::Student],
    }
}

/// Guard for allowing faculty of the section (or admins) only.
pub async fn allow_faculty(
    state: State<AppState>,
    params: Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    allow_role_base(
        state,
        params,
        req,
        next,
        roles_higher_or_equal(Role::Faculty),
        "Faculty access required for this section",
    )
    .await
}

/// Guard for allowing staff and higher (staff, faculty) of the section.
pub async fn allow_staff(
    state: State<AppState>,
    params: Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    allow_role_base(
        state,
        params,
        req,
        next,
        roles_higher_or_equal(Role::Staff),
        "Staff access required for this section",
    )
    .await
}

/// Guard for allowing anyone enrolled in the section, in any role.
pub async fn allow_student(
    state: State<AppState>,
    params: Path<HashMap<String, String>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    allow_role_base(
        state,
        params,
        req,
        next,
        roles_higher_or_equal(Role::Student),
        "Section enrollment required",
    )
    .await
}
