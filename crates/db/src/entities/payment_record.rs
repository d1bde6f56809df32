//! Clearance payment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Verification state of an uploaded proof of payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProofStatus {
    #[sea_orm(string_value = "UNVERIFIED")]
    Unverified,
    #[sea_orm(string_value = "VALID")]
    Valid,
    #[sea_orm(string_value = "INVALID")]
    Invalid,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_record")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(nullable)]
    pub clearance_request_id: Option<i32>,

    pub student_id: i32,

    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub amount: Decimal,

    /// Path of the uploaded proof; empty until the student uploads one
    #[sea_orm(nullable)]
    pub proof_path: Option<String>,

    pub proof_status: ProofStatus,

    /// Time of the latest proof upload
    #[sea_orm(nullable)]
    pub paid_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
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

    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::clearance_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClearanceRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
