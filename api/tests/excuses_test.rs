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

    struct TestCtx {
        faculty: UserModel,
        staff: UserModel,
        student: UserModel,
        section: SectionModel,
        session: SessionModel,
    }

    async fn setup(db: &sea_orm::DatabaseConnection) -> TestCtx {
        let now = Utc::now();
        let section = SectionModel::create(db, "STK110", "Statistics", 2026)
            .await
            .unwrap();
        let faculty = UserModel::create(db, "f2001", "Prof Stats", "f2001@test.com", false)
            .await
            .unwrap();
        let staff = UserModel::create(db, "s2001", "Tutor Stats", "s2001@test.com", false)
            .await
            .unwrap();
        let student = UserModel::create(db, "u04250003", "Student C", "u04250003@test.com", false)
            .await
            .unwrap();

        RoleModel::assign_user_to_section(db, faculty.id, section.id, Role::Faculty)
            .await
            .unwrap();
        RoleModel::assign_user_to_section(db, staff.id, section.id, Role::Staff)
            .await
            .unwrap();
        RoleModel::assign_user_to_section(db, student.id, section.id, Role::Student)
            .await
            .unwrap();

        // session already over; excuses typically contest a past session
        let session = SessionModel::open(
            db,
            section.id,
            faculty.id,
            "Missed Lecture",
            now.date_naive(),
            now - Duration::hours(2),
            now - Duration::hours(1),
            Coordinate::new(-25.7545, 28.2314),
            None,
        )
        .await
        .unwrap();

        TestCtx {
            faculty,
            staff,
            student,
            section,
            session,
        }
    }

    fn excuses_uri(ctx: &TestCtx) -> String {
        format!(
            "/api/sections/{}/attendance/sessions/{}/excuses",
            ctx.section.id, ctx.session.id
        )
    }

    async fn file_excuse(app: &crate::helpers::app::TestApp, ctx: &TestCtx) -> i64 {
        let (token, _) = generate_jwt(ctx.student.id, false);
        let body = serde_json::json!({
            "reason": "I was at a medical appointment during the session.",
        });
        let resp = app
            .clone()
            .oneshot(auth_req("POST", &excuses_uri(ctx), &token, Some(body)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"]["status"], "pending");
        json["data"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn student_files_excuse_request() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        file_excuse(&app, &ctx).await;
    }

    #[tokio::test]
    async fn short_reason_is_rejected() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;

        let (token, _) = generate_jwt(ctx.student.id, false);
        let body = serde_json::json!({ "reason": "was sick" });
        let resp = app
            .oneshot(auth_req("POST", &excuses_uri(&ctx), &token, Some(body)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn second_pending_request_conflicts() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        file_excuse(&app, &ctx).await;

        let (token, _) = generate_jwt(ctx.student.id, false);
        let body = serde_json::json!({
            "reason": "Filing again while the first request is still pending.",
        });
        let resp = app
            .oneshot(auth_req("POST", &excuses_uri(&ctx), &token, Some(body)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn faculty_approves_with_attribution() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let request_id = file_excuse(&app, &ctx).await;

        let (token, _) = generate_jwt(ctx.faculty.id, false);
        let uri = format!(
            "/api/sections/{}/attendance/excuses/{}/review",
            ctx.section.id, request_id
        );
        let body = serde_json::json!({
            "decision": "approve",
            "notes": "Doctor's note verified.",
        });
        let resp = app
            .clone()
            .oneshot(auth_req("PUT", &uri, &token, Some(body)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"]["status"], "approved");
        assert_eq!(json["data"]["reviewed_by"], ctx.faculty.id);
        assert_eq!(json["data"]["review_notes"], "Doctor's note verified.");

        // a decided request cannot be reviewed again
        let (token, _) = generate_jwt(ctx.faculty.id, false);
        let body = serde_json::json!({ "decision": "reject" });
        let resp = app.oneshot(auth_req("PUT", &uri, &token, Some(body))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn staff_cannot_review() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        let request_id = file_excuse(&app, &ctx).await;

        let (token, _) = generate_jwt(ctx.staff.id, false);
        let uri = format!(
            "/api/sections/{}/attendance/excuses/{}/review",
            ctx.section.id, request_id
        );
        let body = serde_json::json!({ "decision": "approve" });
        let resp = app.oneshot(auth_req("PUT", &uri, &token, Some(body))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn staff_list_filters_by_status() {
        let (app, state) = make_test_app().await;
        let ctx = setup(state.db()).await;
        file_excuse(&app, &ctx).await;

        let (token, _) = generate_jwt(ctx.staff.id, false);
        let uri = format!(
            "/api/sections/{}/attendance/excuses?status=pending",
            ctx.section.id
        );
        let resp = app
            .clone()
            .oneshot(auth_req("GET", &uri, &token, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"].as_array().unwrap().len(), 1);

        let uri = format!(
            "/api/sections/{}/attendance/excuses?status=approved",
            ctx.section.id
        );
        let resp = app.oneshot(auth_req("GET", &uri, &token, None)).await.unwrap();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["data"].as_array().unwrap().is_empty());
    }
}
