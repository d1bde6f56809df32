//! Create damage report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DamageReport::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DamageReport::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DamageReport::StudentId).integer().not_null())
                    .col(ColumnDef::new(DamageReport::Description).text().not_null())
                    .col(ColumnDef::new(DamageReport::Location).string_len(256).not_null())
                    .col(ColumnDef::new(DamageReport::Category).string_len(128).not_null())
                    .col(
                        ColumnDef::new(DamageReport::PhotoPath)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DamageReport::Status)
                            .string_len(16)
                            .not_null()
                            .default("ditinjau"),
                    )
                    .col(
                        ColumnDef::new(DamageReport::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DamageReport::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_damage_report_student")
                            .from(DamageReport::Table, DamageReport::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_damage_report_student")
                    .table(DamageReport::Table)
                    .col(DamageReport::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DamageReport::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DamageReport {
    Table,
    Id,
    StudentId,
    Description,
    Location,
    Category,
    PhotoPath,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}
