mod helpers;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use api::auth::generate_jwt;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    use db::models::{
        attendance_session::Model as SessionModel,
        section::Model as SectionModel,
        user::Model as UserModel,
        user_section_role::{Model as RoleModel, Role},
    };
    use util::geo::Coordinate;

    use crate::helpers::app::{auth_req, make_test_app};

    #[tokio::test]
    async fn active_sessions_across_enrolled_sections() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let now = Utc::now();

        let enrolled = SectionModel::create(db, "COS332-A", "Networks", 2026).await.unwrap();
        let not_enrolled = SectionModel::create(db, "COS332-B", "Networks", 2026).await.unwrap();
        let faculty = UserModel::create(db, "f4001", "Prof Net", "f4001@test.com", false)
            .await
            .unwrap();
        let student = UserModel::create(db, "u04250006", "Student F", "u04250006@test.com", false)
            .await
            .unwrap();

        RoleModel::assign_user_to_section(db, faculty.id, enrolled.id, Role::Faculty)
            .await
            .unwrap();
        RoleModel::assign_user_to_section(db, faculty.id, not_enrolled.id, Role::Faculty)
            .await
            .unwrap();
        RoleModel::assign_user_to_section(db, student.id, enrolled.id, Role::Student)
            .await
            .unwrap();

        let anchor = Coordinate::new(-25.7545, 28.2314);
        let open = |section_id, title: &str, ends_in_minutes: i64| {
            let title = title.to_string();
            async move {
                SessionModel::open(
                    db,
                    section_id,
                    faculty.id,
                    &title,
                    now.date_naive(),
                    now - Duration::minutes(90),
                    now + Duration::minutes(ends_in_minutes),
                    anchor,
                    None,
                )
                .await
                .unwrap()
            }
        };

        open(enrolled.id, "Visible", 30).await;
        open(enrolled.id, "Already Over", -60).await;
        open(not_enrolled.id, "Other Section", 30).await;
        let to_close = open(enrolled.id, "Closed Early", 30).await;
        SessionModel::close(db, to_close.id, faculty.id, false, now, Duration::zero())
            .await
            .unwrap();

        let (token, _) = generate_jwt(student.id, false);
        let resp = app
            .oneshot(auth_req("GET", "/api/me/attendance/sessions", &token, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        let sessions = json["data"].as_array().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0]["title"], "Visible");
        // the student payload never leaks the backup code or the anchor
        assert!(sessions[0].get("backup_code").is_none());
        assert!(sessions[0].get("anchor_lat").is_none());
    }

    #[tokio::test]
    async fn requires_authentication() {
        let (app, _state) = make_test_app().await;

        let req = axum::http::Request::builder()
            .method("GET")
            .uri("/api/me/attendance/sessions")
            .body(axum::body::Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
