//! Student profile entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning user account
    #[sea_orm(unique)]
    pub user_id: i32,

    /// Student registration number (NIM)
    #[sea_orm(unique)]
    pub nim: String,

    pub name: String,

    /// Dormitory room, if assigned
    #[sea_orm(nullable)]
    pub room: Option<String>,

    #[sea_orm(nullable)]
    pub phone: Option<String>,

    /// KIP-K subsidy flag; waives the base clearance fee
    #[sea_orm(default_value = false)]
    pub is_kipk: bool,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::clearance_request::Entity")]
    ClearanceRequest,

    #[sea_orm(has_many = "super::exit_permit::Entity")]
    ExitPermit,

    #[sea_orm(has_many = "super::damage_report::Entity")]
    DamageReport,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::clearance_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClearanceRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
