//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum NotificationType {
    #[sea_orm(string_value = "surat_bebas_asrama")]
    #[serde(rename = "surat_bebas_asrama")]
    Clearance,
    #[sea_orm(string_value = "izin_keluar")]
    #[serde(rename = "izin_keluar")]
    ExitPermit,
    #[sea_orm(string_value = "pelaporan")]
    #[serde(rename = "pelaporan")]
    DamageReport,
    #[sea_orm(string_value = "pengumuman")]
    #[serde(rename = "pengumuman")]
    Announcement,
}

impl NotificationType {
    /// Type tag as stored and sent to clients.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clearance => "surat_bebas_asrama",
            Self::ExitPermit => "izin_keluar",
            Self::DamageReport => "pelaporan",
            Self::Announcement => "pengumuman",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// The user receiving the notification
    pub user_id: i32,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    /// Id of the entity the notification is about, as a string
    #[sea_orm(nullable)]
    pub reference_id: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_read: bool,

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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
