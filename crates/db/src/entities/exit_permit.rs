//! Exit permit ("izin keluar") entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Exit permit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PermitStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl PermitStatus {
    /// Indonesian label shown to students.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "menunggu",
            Self::Approved => "disetujui",
            Self::Rejected => "ditolak",
        }
    }
}

impl std::str::FromStr for PermitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("Status izin tidak valid: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exit_permit")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub student_id: i32,

    /// Manager who approved or rejected the permit
    #[sea_orm(nullable)]
    pub manager_id: Option<i32>,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    pub requested_at: DateTimeUtc,

    pub out_at: DateTimeUtc,

    pub return_at: DateTimeUtc,

    pub document_path: String,

    pub status: PermitStatus,

    /// Rejection notes
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub updated_at: DateTimeUtc,
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
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
