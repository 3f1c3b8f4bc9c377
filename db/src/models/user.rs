use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, QueryFilter, Set};
use serde::Serialize;

use crate::models::user_section_role::{
    Column as RoleColumn, Entity as RoleEntity, Role,
};

/// Represents a user in the `users` table.
///
/// Authentication and credential storage live with the external identity
/// service; this table only carries the facts the attendance engine and its
/// reports need.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Primary key ID (auto-incremented).
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique student/staff number.
    pub username: String,
    /// Display name used in reports.
    pub name: String,
    /// User's unique email address.
    pub email: String,
    /// Whether the user has admin privileges.
    pub admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_section_role::Entity")]
    SectionRoles,
}

impl Related<super::user_section_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SectionRoles.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DatabaseConnection,
        username: &str,
        name: &str,
        email: &str,
        admin: bool,
    ) -> Result<Self, DbErr> {
        let now = Utc::now();
        ActiveModel {
            username: Set(username.to_owned()),
            name: Set(name.to_owned()),
            email: Set(email.to_owned()),
            admin: Set(admin),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Checks whether `user_id` holds `role` in `section_id`.
    ///
    /// These enrollment/ownership facts come from the surrounding campus
    /// system; the attendance engine trusts them as given.
    pub async fn is_in_role(
        db: &DatabaseConnection,
        user_id: i64,
        section_id: i64,
        role: Role,
    ) -> Result<bool, DbErr> {
        let found = RoleEntity::find()
            .filter(RoleColumn::UserId.eq(user_id))
            .filter(RoleColumn::SectionId.eq(section_id))
            .filter(RoleColumn::Role.eq(role))
            .one(db)
            .await?;
        Ok(found.is_some())
    }
}
