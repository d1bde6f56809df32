//! Damage report ("pelaporan kerusakan") entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Handling status of a damage report. Any value may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ReportStatus {
    /// Under review
    #[sea_orm(string_value = "ditinjau")]
    #[serde(rename = "ditinjau")]
    UnderReview,
    /// Being handled
    #[sea_orm(string_value = "ditangani")]
    #[serde(rename = "ditangani")]
    InProgress,
    /// Done
    #[sea_orm(string_value = "selesai")]
    #[serde(rename = "selesai")]
    Done,
}

impl ReportStatus {
    /// Stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnderReview => "ditinjau",
            Self::InProgress => "ditangani",
            Self::Done => "selesai",
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ditinjau" => Ok(Self::UnderReview),
            "ditangani" => Ok(Self::InProgress),
            "selesai" => Ok(Self::Done),
            other => Err(format!("Status laporan tidak valid: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "damage_report")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub student_id: i32,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub location: String,

    pub category: String,

    pub photo_path: String,

    pub status: ReportStatus,

    pub created_at: DateTimeUtc,

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
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
