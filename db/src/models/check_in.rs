//! Student check-ins against an attendance session.
//!
//! A check-in is written exactly once per (session, student) pair and never
//! mutated afterwards; the composite primary key makes the at-most-once
//! guarantee a storage-layer fact, so concurrent retries cannot double
//! count. An out-of-geofence submission is recorded and *flagged* rather
//! than rejected: GPS is noisy, and a present student must keep a review
//! path instead of being silently penalized.

use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, Set, SqlErr};
use serde::Serialize;
use strum::Display;

// `crate::error::Result` is deliberately not imported here: the entity
// derive expands impls against the std `Result` prelude name.
use crate::error::{AttendanceError, Result as AttendanceResult};
use crate::models::attendance_session::Model as Session;
use util::geo::{self, Coordinate};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "check_ins")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,

    pub submitted_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Device-reported accuracy radius. Stored for audit only; it never
    /// influences the accept/flag decision.
    pub accuracy_m: f64,
    /// Anchor-to-report great-circle distance, fixed at submission time.
    pub distance_m: f64,
    pub outcome: CheckInOutcome,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "check_in_outcome")]
#[strum(serialize_all = "lowercase")]
pub enum CheckInOutcome {
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "flagged")]
    Flagged,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_session::Entity",
        from = "Column::SessionId",
        to = "super::attendance_session::Column::Id"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Validates and records a student's check-in against `session`.
    ///
    /// Single-shot: the outcome is decided from the anchor distance at
    /// submission time and never revisited. Duplicate submissions fail with
    /// [`AttendanceError::Conflict`] and leave the original untouched; a
    /// submission racing an explicit close fails with
    /// [`AttendanceError::SessionUnavailable`].
    pub async fn submit(
        db: &DatabaseConnection,
        session: &Session,
        student_id: i64,
        reported: Coordinate,
        accuracy_m: f64,
        now: DateTime<Utc>,
        grace: Duration,
    ) -> AttendanceResult<Self> {
        if !reported.is_valid() {
            return Err(AttendanceError::validation(
                "Reported coordinates are out of range",
            ));
        }

        if !session.is_open(now, grace) {
            return Err(AttendanceError::session_unavailable(format!(
                "Session is {} and no longer accepts check-ins",
                session.effective_status(now, grace)
            )));
        }

        // Cheap pre-check for a friendly error; the composite primary key
        // below is what actually guarantees at-most-once under races.
        if Self::find_one(db, session.id, student_id).await?.is_some() {
            return Err(AttendanceError::conflict(
                "Attendance already recorded for this session",
            ));
        }

        let distance_m = geo::distance_meters(session.anchor(), reported);
        let outcome = if distance_m <= session.geofence_radius_m {
            CheckInOutcome::Accepted
        } else {
            CheckInOutcome::Flagged
        };

        let insert = ActiveModel {
            session_id: Set(session.id),
            student_id: Set(student_id),
            submitted_at: Set(now),
            latitude: Set(reported.latitude),
            longitude: Set(reported.longitude),
            accuracy_m: Set(accuracy_m),
            distance_m: Set(distance_m),
            outcome: Set(outcome),
        }
        .insert(db)
        .await;

        match insert {
            Ok(row) => Ok(row),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(AttendanceError::conflict(
                    "Attendance already recorded for this session",
                )),
                _ => Err(err.into()),
            },
        }
    }

    pub async fn find_one(
        db: &DatabaseConnection,
        session_id: i64,
        student_id: i64,
    ) -> AttendanceResult<Option<Self>> {
        Ok(Entity::find_by_id((session_id, student_id)).one(db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{attendance_session, section, user, user_section_role};
    use crate::test_utils::setup_test_db;
    use chrono::{NaiveDate, TimeZone};

    /// Meters of northward displacement per degree of latitude.
    const METERS_PER_DEG_LAT: f64 = geo::EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

    fn north_of(anchor: Coordinate, meters: f64) -> Coordinate {
        Coordinate::new(anchor.latitude + meters / METERS_PER_DEG_LAT, anchor.longitude)
    }

    struct Ctx {
        db: DatabaseConnection,
        lecturer: user::Model,
        student: user::Model,
        session: attendance_session::Model,
        mid_session: DateTime<Utc>,
    }

    async fn setup() -> Ctx {
        let db = setup_test_db().await;
        let lecturer = user::Model::create(&db, "u00000001", "Lecturer", "l@test.com", false)
            .await
            .unwrap();
        let student = user::Model::create(&db, "u04254321", "Student A", "a@test.com", false)
            .await
            .unwrap();
        let section = section::Model::create(&db, "COS212-A", "Data Structures", 2026)
            .await
            .unwrap();
        for (uid, role) in [
            (lecturer.id, user_section_role::Role::Faculty),
            (student.id, user_section_role::Role::Student),
        ] {
            user_section_role::Model::assign_user_to_section(&db, uid, section.id, role)
                .await
                .unwrap();
        }

        let starts = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let ends = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let session = attendance_session::Model::open(
            &db,
            section.id,
            lecturer.id,
            "Lecture 1",
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            starts,
            ends,
            Coordinate::new(39.0, 35.0),
            Some(15.0),
        )
        .await
        .unwrap();

        Ctx {
            db,
            lecturer,
            student,
            session,
            mid_session: starts + Duration::minutes(20),
        }
    }

    #[tokio::test]
    async fn inside_geofence_is_accepted() {
        let ctx = setup().await;
        let point = north_of(ctx.session.anchor(), 10.0);

        let rec = Model::submit(
            &ctx.db,
            &ctx.session,
            ctx.student.id,
            point,
            8.0,
            ctx.mid_session,
            Duration::zero(),
        )
        .await
        .unwrap();

        assert_eq!(rec.outcome, CheckInOutcome::Accepted);
        assert!((rec.distance_m - 10.0).abs() < 0.1);
        assert_eq!(rec.accuracy_m, 8.0);
    }

    #[tokio::test]
    async fn outside_geofence_is_flagged_not_rejected() {
        let ctx = setup().await;
        let point = north_of(ctx.session.anchor(), 40.0);

        let rec = Model::submit(
            &ctx.db,
            &ctx.session,
            ctx.student.id,
            point,
            5.0,
            ctx.mid_session,
            Duration::zero(),
        )
        .await
        .unwrap();

        assert_eq!(rec.outcome, CheckInOutcome::Flagged);
        assert!((rec.distance_m - 40.0).abs() < 0.1);
    }

    #[tokio::test]
    async fn boundary_distance_is_accepted_epsilon_beyond_is_flagged() {
        let ctx = setup().await;

        // Open a session whose radius is the *exact* haversine distance to the
        // submission point, so the stored distance lands on the boundary and
        // the <= comparison is what decides the outcome.
        let point = north_of(ctx.session.anchor(), 15.0);
        let exact = geo::distance_meters(ctx.session.anchor(), point);
        let session = attendance_session::Model::open(
            &ctx.db,
            ctx.session.section_id,
            ctx.lecturer.id,
            "Lecture 2",
            ctx.session.session_date,
            ctx.session.starts_at,
            ctx.session.ends_at,
            ctx.session.anchor(),
            Some(exact),
        )
        .await
        .unwrap();

        let at_radius = Model::submit(
            &ctx.db,
            &session,
            ctx.student.id,
            point,
            0.0,
            ctx.mid_session,
            Duration::zero(),
        )
        .await
        .unwrap();
        assert_eq!(at_radius.distance_m, session.geofence_radius_m);
        assert_eq!(at_radius.outcome, CheckInOutcome::Accepted);

        let other = user::Model::create(&ctx.db, "u04259999", "Student B", "b@test.com", false)
            .await
            .unwrap();
        let beyond = Model::submit(
            &ctx.db,
            &session,
            other.id,
            north_of(ctx.session.anchor(), 15.5),
            0.0,
            ctx.mid_session,
            Duration::zero(),
        )
        .await
        .unwrap();
        assert!(beyond.distance_m > session.geofence_radius_m);
        assert_eq!(beyond.outcome, CheckInOutcome::Flagged);
    }

    #[tokio::test]
    async fn resubmission_is_conflict_and_preserves_original() {
        let ctx = setup().await;

        let first = Model::submit(
            &ctx.db,
            &ctx.session,
            ctx.student.id,
            north_of(ctx.session.anchor(), 5.0),
            3.0,
            ctx.mid_session,
            Duration::zero(),
        )
        .await
        .unwrap();

        let err = Model::submit(
            &ctx.db,
            &ctx.session,
            ctx.student.id,
            north_of(ctx.session.anchor(), 60.0),
            3.0,
            ctx.mid_session + Duration::minutes(1),
            Duration::zero(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict(_)));

        let stored = Model::find_one(&ctx.db, ctx.session.id, ctx.student.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn closed_session_rejects_check_in() {
        let ctx = setup().await;
        let closed = attendance_session::Model::close(
            &ctx.db,
            ctx.session.id,
            ctx.lecturer.id,
            false,
            ctx.mid_session,
            Duration::zero(),
        )
        .await
        .unwrap();

        let err = Model::submit(
            &ctx.db,
            &closed,
            ctx.student.id,
            north_of(closed.anchor(), 2.0),
            3.0,
            ctx.mid_session + Duration::minutes(1),
            Duration::zero(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::SessionUnavailable(_)));
    }

    #[tokio::test]
    async fn expired_session_rejects_check_in() {
        let ctx = setup().await;
        let after_end = ctx.session.ends_at + Duration::minutes(1);

        let err = Model::submit(
            &ctx.db,
            &ctx.session,
            ctx.student.id,
            north_of(ctx.session.anchor(), 2.0),
            3.0,
            after_end,
            Duration::zero(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::SessionUnavailable(_)));

        // the configured grace period keeps the window open
        let rec = Model::submit(
            &ctx.db,
            &ctx.session,
            ctx.student.id,
            north_of(ctx.session.anchor(), 2.0),
            3.0,
            after_end,
            Duration::minutes(5),
        )
        .await
        .unwrap();
        assert_eq!(rec.outcome, CheckInOutcome::Accepted);
    }

    #[tokio::test]
    async fn malformed_coordinates_are_rejected() {
        let ctx = setup().await;
        let err = Model::submit(
            &ctx.db,
            &ctx.session,
            ctx.student.id,
            Coordinate::new(95.0, 35.0),
            3.0,
            ctx.mid_session,
            Duration::zero(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::Validation(_)));
    }

    #[tokio::test]
    async fn zero_or_negative_accuracy_is_stored_but_ignored() {
        let ctx = setup().await;
        let rec = Model::submit(
            &ctx.db,
            &ctx.session,
            ctx.student.id,
            north_of(ctx.session.anchor(), 10.0),
            -1.0,
            ctx.mid_session,
            Duration::zero(),
        )
        .await
        .unwrap();
        assert_eq!(rec.accuracy_m, -1.0);
        assert_eq!(rec.outcome, CheckInOutcome::Accepted);
    }
}
