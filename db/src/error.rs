//! Domain error kinds for the attendance engine.
//!
//! Every fallible operation in this crate returns one of these kinds so the
//! caller can render a precise user-facing message. Nothing is retried or
//! swallowed here; retry policy belongs to the caller.

use sea_orm::DbErr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AttendanceError>;

#[derive(Debug, Error)]
pub enum AttendanceError {
    /// Malformed input: bad coordinates, too-short reason, invalid radius or
    /// time window.
    #[error("{0}")]
    Validation(String),

    /// Unknown session/request/section id.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate check-in, duplicate pending excuse, re-closing a closed
    /// session, reviewing a non-pending request.
    #[error("{0}")]
    Conflict(String),

    /// Actor lacks the required role or ownership.
    #[error("{0}")]
    Permission(String),

    /// The session is not active (closed or expired) at check-in time.
    #[error("{0}")]
    SessionUnavailable(String),

    /// Storage-layer failure. Always fails the whole operation; a silently
    /// incomplete result is worse than a visible error.
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

impl AttendanceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn session_unavailable(msg: impl Into<String>) -> Self {
        Self::SessionUnavailable(msg.into())
    }
}
