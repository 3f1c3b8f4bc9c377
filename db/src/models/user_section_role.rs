use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The central table for user-section-role relationships: who teaches,
/// supports and attends which course section.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_section_roles")]
pub struct Model {
    /// User ID (foreign key to `users`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    /// Section ID (foreign key to `sections`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub section_id: i64,

    /// Role type: Faculty, Staff or Student
    pub role: Role,
}

/// Enum representing user roles within a course section.
/// Backed by a `user_section_role_type` enum in the database.
#[derive(
    Debug, Clone, Copy, PartialEq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_section_role_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "faculty")]
    Faculty,

    #[sea_orm(string_value = "staff")]
    Staff,

    #[sea_orm(string_value = "student")]
    Student,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::section::Entity",
        from = "Column::SectionId",
        to = "super::section::Column::Id"
    )]
    Section,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Section.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn assign_user_to_section(
        db: &DatabaseConnection,
        user_id: i64,
        section_id: i64,
        role: Role,
    ) -> Result<Self, DbErr> {
        ActiveModel {
            user_id: Set(user_id),
            section_id: Set(section_id),
            role: Set(role),
        }
        .insert(db)
        .await
    }

    /// All enrolled students of a section, ordered by student number.
    pub async fn students_of_section(
        db: &DatabaseConnection,
        section_id: i64,
    ) -> Result<Vec<super::user::Model>, DbErr> {
        let student_ids = Entity::find()
            .select_only()
            .column(Column::UserId)
            .filter(Column::SectionId.eq(section_id))
            .filter(Column::Role.eq(Role::Student))
            .into_tuple::<i64>()
            .all(db)
            .await?;

        super::user::Entity::find()
            .filter(super::user::Column::Id.is_in(student_ids))
            .order_by_asc(super::user::Column::Username)
            .all(db)
            .await
    }
}
