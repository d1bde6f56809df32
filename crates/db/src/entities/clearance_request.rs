//! Dormitory clearance ("bebas asrama") request entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a clearance request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClearanceStatus {
    #[sea_orm(string_value = "FACILITY_VERIFICATION")]
    FacilityVerification,
    #[sea_orm(string_value = "AWAITING_PAYMENT")]
    AwaitingPayment,
    #[sea_orm(string_value = "PAYMENT_VERIFICATION")]
    PaymentVerification,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

impl ClearanceStatus {
    /// Whether the request still blocks a new submission by the same student.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Completed)
    }

    /// Human-readable label used in notifications.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FacilityVerification => "Verifikasi Fasilitas",
            Self::AwaitingPayment => "Menunggu Pembayaran",
            Self::PaymentVerification => "Verifikasi Pembayaran",
            Self::Completed => "Selesai",
        }
    }
}

/// Outcome of the manager's facility inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FacilityStatus {
    #[sea_orm(string_value = "COMPLETE")]
    Complete,
    #[sea_orm(string_value = "INCOMPLETE")]
    Incomplete,
}

impl std::str::FromStr for FacilityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETE" => Ok(Self::Complete),
            "INCOMPLETE" => Ok(Self::Incomplete),
            other => Err(format!("Status fasilitas tidak valid: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clearance_request")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub student_id: i32,

    /// Manager who verified the facilities
    #[sea_orm(nullable)]
    pub manager_id: Option<i32>,

    #[sea_orm(unique)]
    pub submission_number: String,

    /// Base fee plus any damage charges
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_fee: Decimal,

    #[sea_orm(nullable)]
    pub facility_status: Option<FacilityStatus>,

    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub additional_fee: Decimal,

    pub status: ClearanceStatus,

    pub submitted_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Fee charged before any damage was recorded.
    #[must_use]
    pub fn base_fee(&self) -> Decimal {
        self.total_fee - self.additional_fee
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,

    #[sea_orm(
        belongs_to = "super::manager::Entity",
        from = "Column::ManagerId",
        to = "super::manager::Column::Id",
        on_delete = "SetNull"
    )]
    Manager,

    #[sea_orm(has_many = "super::damage_line_item::Entity")]
    DamageLineItem,

    #[sea_orm(has_many = "super::payment_record::Entity")]
    PaymentRecord,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::damage_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DamageLineItem.def()
    }
}

impl Related<super::payment_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
