//! Attendance sessions: the time-boxed, location-bound windows students
//! check into.
//!
//! A session's stored status only ever moves `active -> closed` (explicit
//! instructor action). Expiry is never written: it is derived lazily from
//! the wall clock via [`Model::effective_status`], so there is no timer to
//! drift or tick to miss.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::Serialize;
use strum::Display;

// `crate::error::Result` is deliberately not imported here: the entity
// derive expands impls against the std `Result` prelude name.
use crate::error::{AttendanceError, Result as AttendanceResult};
use crate::models::user_section_role::{Column as RoleColumn, Entity as RoleEntity, Role};
use util::geo::Coordinate;

/// Smallest geofence radius a session may be opened with, in meters.
pub const MIN_GEOFENCE_RADIUS_M: f64 = 5.0;
/// Largest geofence radius a session may be opened with, in meters.
pub const MAX_GEOFENCE_RADIUS_M: f64 = 100.0;
/// Radius used when the instructor does not specify one.
pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 15.0;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub section_id: i64,
    pub created_by: i64,
    pub title: String,
    /// Calendar date the session belongs to on the timetable.
    pub session_date: NaiveDate,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Stored status; `expired` is only ever derived, never written.
    pub status: SessionStatus,
    pub geofence_radius_m: f64,
    /// Fixed classroom location the geofence is centered on.
    pub anchor_lat: f64,
    pub anchor_lon: f64,
    /// Opaque token for manual fallback check-in at the instructor's desk.
    /// Passive identifier only; not cryptographically verified.
    pub backup_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_session_status")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "closed")]
    Closed,
    #[sea_orm(string_value = "expired")]
    Expired,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::section::Entity",
        from = "Column::SectionId",
        to = "super::section::Column::Id"
    )]
    Section,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::check_in::Entity")]
    CheckIns,
    #[sea_orm(has_many = "super::excuse_request::Entity")]
    ExcuseRequests,
}

impl Related<super::section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Section.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::check_in::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckIns.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Opens a new session for a section.
    ///
    /// Fails with [`AttendanceError::Validation`] when the time window is
    /// inverted or empty, when the radius falls outside
    /// [`MIN_GEOFENCE_RADIUS_M`]..=[`MAX_GEOFENCE_RADIUS_M`], or when the
    /// anchor coordinates are out of numeric range.
    #[allow(clippy::too_many_arguments)]
    pub async fn open(
        db: &DatabaseConnection,
        section_id: i64,
        created_by: i64,
        title: &str,
        session_date: NaiveDate,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        anchor: Coordinate,
        geofence_radius_m: Option<f64>,
    ) -> AttendanceResult<Self> {
        if ends_at <= starts_at {
            return Err(AttendanceError::validation(
                "Session end time must be after start time",
            ));
        }

        let radius = geofence_radius_m.unwrap_or(DEFAULT_GEOFENCE_RADIUS_M);
        if !(MIN_GEOFENCE_RADIUS_M..=MAX_GEOFENCE_RADIUS_M).contains(&radius) {
            return Err(AttendanceError::validation(format!(
                "Geofence radius must be between {MIN_GEOFENCE_RADIUS_M} and {MAX_GEOFENCE_RADIUS_M} meters"
            )));
        }

        if !anchor.is_valid() {
            return Err(AttendanceError::validation(
                "Anchor coordinates are out of range",
            ));
        }

        let now = Utc::now();
        let row = ActiveModel {
            section_id: Set(section_id),
            created_by: Set(created_by),
            title: Set(title.to_owned()),
            session_date: Set(session_date),
            starts_at: Set(starts_at),
            ends_at: Set(ends_at),
            status: Set(SessionStatus::Active),
            geofence_radius_m: Set(radius),
            anchor_lat: Set(anchor.latitude),
            anchor_lon: Set(anchor.longitude),
            backup_code: Set(generate_backup_code()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(row)
    }

    /// Loads a session by id, failing with [`AttendanceError::NotFound`] on
    /// an unknown id. The returned row carries the *stored* status; use
    /// [`Model::effective_status`] to account for expiry.
    pub async fn get(db: &DatabaseConnection, session_id: i64) -> AttendanceResult<Self> {
        Entity::find_by_id(session_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                AttendanceError::not_found(format!("Attendance session {session_id} not found"))
            })
    }

    /// The status the session has *now*, with expiry derived from the wall
    /// clock rather than stored. A session whose end time (plus the
    /// configured grace period) has passed reads as expired without any
    /// write having happened.
    pub fn effective_status(&self, now: DateTime<Utc>, grace: Duration) -> SessionStatus {
        match self.status {
            SessionStatus::Active if now > self.ends_at + grace => SessionStatus::Expired,
            stored => stored,
        }
    }

    /// True when check-ins are currently accepted.
    pub fn is_open(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.effective_status(now, grace) == SessionStatus::Active
    }

    /// The classroom anchor as a coordinate pair.
    pub fn anchor(&self) -> Coordinate {
        Coordinate::new(self.anchor_lat, self.anchor_lon)
    }

    /// Explicitly closes an active session.
    ///
    /// Only the creator or an admin may close. Closing a session that is
    /// already closed, or that has already expired, is a conflict; the
    /// expired case in particular is *not* papered over into a close, so
    /// the audit trail keeps the distinction.
    pub async fn close(
        db: &DatabaseConnection,
        session_id: i64,
        actor_id: i64,
        actor_is_admin: bool,
        now: DateTime<Utc>,
        grace: Duration,
    ) -> AttendanceResult<Self> {
        let session = Self::get(db, session_id).await?;

        if session.created_by != actor_id && !actor_is_admin {
            return Err(AttendanceError::permission(
                "Only the session creator or an admin may close a session",
            ));
        }

        match session.effective_status(now, grace) {
            SessionStatus::Closed => {
                Err(AttendanceError::conflict("Session is already closed"))
            }
            SessionStatus::Expired => {
                Err(AttendanceError::conflict("Session has already expired"))
            }
            SessionStatus::Active => {
                let mut am: ActiveModel = session.into();
                am.status = Set(SessionStatus::Closed);
                am.updated_at = Set(now);
                Ok(am.update(db).await?)
            }
        }
    }

    /// All sessions of a section, oldest first.
    pub async fn list_for_section(
        db: &DatabaseConnection,
        section_id: i64,
    ) -> AttendanceResult<Vec<Self>> {
        Ok(Entity::find()
            .filter(Column::SectionId.eq(section_id))
            .order_by_asc(Column::StartsAt)
            .all(db)
            .await?)
    }

    /// Sessions the student can currently check into: sections they are
    /// enrolled in, stored status active, and not yet past expiry.
    /// Recomputed on every call; nothing is cached.
    pub async fn list_active_for_student(
        db: &DatabaseConnection,
        student_id: i64,
        now: DateTime<Utc>,
        grace: Duration,
    ) -> AttendanceResult<Vec<Self>> {
        let enrolled_section_ids = RoleEntity::find()
            .select_only()
            .column(RoleColumn::SectionId)
            .filter(RoleColumn::UserId.eq(student_id))
            .filter(RoleColumn::Role.eq(Role::Student))
            .into_tuple::<i64>()
            .all(db)
            .await?;

        let rows = Entity::find()
            .filter(Column::SectionId.is_in(enrolled_section_ids))
            .filter(Column::Status.eq(SessionStatus::Active))
            .order_by_asc(Column::EndsAt)
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .filter(|s| s.is_open(now, grace))
            .collect())
    }
}

/// Opaque manual-fallback token, 8 random bytes hex-encoded.
fn generate_backup_code() -> String {
    use rand::RngCore;
    let mut buf = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}
