//! Excuse requests: a student's contest of an absence or flagged check-in.
//!
//! The workflow is a small state machine: `pending -> approved` and
//! `pending -> rejected`, with `approved` terminal. Resubmission after a
//! rejection creates a *new* row; the rejected one stays behind as audit
//! trail. Approval never mutates any check-in; the aggregator consumes the
//! approval as additional evidence at read time.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use strum::Display;

// `crate::error::Result` is deliberately not imported here: the entity
// derive expands impls against the std `Result` prelude name.
use crate::error::{AttendanceError, Result as AttendanceResult};
use crate::models::attendance_session::Model as Session;
use crate::models::user_section_role::Role;

/// Shortest reason a student may submit, in characters.
pub const MIN_REASON_CHARS: usize = 10;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "excuse_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub session_id: i64,
    pub reason: String,
    /// Opaque reference to an externally stored supporting document.
    pub document_ref: Option<String>,
    pub status: ExcuseStatus,
    pub reviewed_by: Option<i64>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "excuse_request_status")]
#[strum(serialize_all = "lowercase")]
pub enum ExcuseStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Reviewer verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
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

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Files a new excuse request for a session.
    ///
    /// A prior check-in is not required: the request may contest a flagged
    /// check-in or a plain absence. At most one pending request may exist
    /// per (student, session), and an approved one blocks further requests;
    /// the partial unique index on pending rows backs the application check.
    pub async fn create(
        db: &DatabaseConnection,
        student_id: i64,
        session_id: i64,
        reason: &str,
        document_ref: Option<&str>,
    ) -> AttendanceResult<Self> {
        if reason.trim().chars().count() < MIN_REASON_CHARS {
            return Err(AttendanceError::validation(format!(
                "Reason must be at least {MIN_REASON_CHARS} characters"
            )));
        }

        // Session must exist before a request can contest it.
        Session::get(db, session_id).await?;

        let existing = Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Status.is_in([ExcuseStatus::Pending, ExcuseStatus::Approved]))
            .all(db)
            .await?;
        if existing.iter().any(|r| r.status == ExcuseStatus::Approved) {
            return Err(AttendanceError::conflict(
                "An approved excuse already exists for this session",
            ));
        }
        if !existing.is_empty() {
            return Err(AttendanceError::conflict(
                "A pending excuse request already exists for this session",
            ));
        }

        let insert = ActiveModel {
            student_id: Set(student_id),
            session_id: Set(session_id),
            reason: Set(reason.to_owned()),
            document_ref: Set(document_ref.map(|s| s.to_owned())),
            status: Set(ExcuseStatus::Pending),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await;

        match insert {
            Ok(row) => Ok(row),
            Err(err) => match err.sql_err() {
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                    Err(AttendanceError::conflict(
                        "A pending excuse request already exists for this session",
                    ))
                }
                _ => Err(err.into()),
            },
        }
    }

    /// Reviews a pending request.
    ///
    /// The reviewer must be faculty of the session's section or an admin.
    /// Only pending requests can transition; reviewing one twice is a
    /// conflict. Rows are never deleted.
    pub async fn review(
        db: &DatabaseConnection,
        request_id: i64,
        actor_id: i64,
        actor_is_admin: bool,
        decision: ReviewDecision,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> AttendanceResult<Self> {
        let request = Entity::find_by_id(request_id).one(db).await?.ok_or_else(|| {
            AttendanceError::not_found(format!("Excuse request {request_id} not found"))
        })?;

        let session = Session::get(db, request.session_id).await?;
        let is_faculty = super::user::Model::is_in_role(
            db,
            actor_id,
            session.section_id,
            Role::Faculty,
        )
        .await?;
        if !is_faculty && !actor_is_admin {
            return Err(AttendanceError::permission(
                "Faculty or admin access is required to review excuse requests",
            ));
        }

        if request.status != ExcuseStatus::Pending {
            return Err(AttendanceError::conflict(format!(
                "Excuse request has already been {}",
                request.status
            )));
        }

        let mut am: ActiveModel = request.into();
        am.status = Set(match decision {
            ReviewDecision::Approve => ExcuseStatus::Approved,
            ReviewDecision::Reject => ExcuseStatus::Rejected,
        });
        am.reviewed_by = Set(Some(actor_id));
        am.review_notes = Set(notes.map(|s| s.to_owned()));
        am.reviewed_at = Set(Some(now));
        Ok(am.update(db).await?)
    }

    /// Requests filed against any session of a section, newest first,
    /// optionally narrowed to one status.
    pub async fn list_for_section(
        db: &DatabaseConnection,
        section_id: i64,
        status: Option<ExcuseStatus>,
    ) -> AttendanceResult<Vec<Self>> {
        let session_ids = super::attendance_session::Entity::find()
            .select_only()
            .column(super::attendance_session::Column::Id)
            .filter(super::attendance_session::Column::SectionId.eq(section_id))
            .into_tuple::<i64>()
            .all(db)
            .await?;

        let mut sel = Entity::find().filter(Column::SessionId.is_in(session_ids));
        if let Some(status) = status {
            sel = sel.filter(Column::Status.eq(status));
        }
        Ok(sel.order_by_desc(Column::CreatedAt).all(db).await?)
    }
}
