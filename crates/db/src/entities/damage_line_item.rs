//! Facility damage charge recorded during facility verification.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "damage_line_item")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub clearance_request_id: i32,

    pub facility_name: String,

    /// Repair cost, never negative
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub cost: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clearance_request::Entity",
        from = "Column::ClearanceRequestId",
        to = "super::clearance_request::Column::Id",
        on_delete = "Cascade"
    )]
    ClearanceRequest,
}

impl Related<super::clearance_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClearanceRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
