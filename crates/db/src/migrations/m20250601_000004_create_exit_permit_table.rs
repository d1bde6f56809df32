//! Create exit permit table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ExitPermit::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExitPermit::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExitPermit::StudentId).integer().not_null())
                    .col(ColumnDef::new(ExitPermit::ManagerId).integer())
                    .col(ColumnDef::new(ExitPermit::Reason).text().not_null())
                    .col(
                        ColumnDef::new(ExitPermit::RequestedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ExitPermit::OutAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExitPermit::ReturnAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExitPermit::DocumentPath)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExitPermit::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(ExitPermit::Notes).text())
                    .col(
                        ColumnDef::new(ExitPermit::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_exit_permit_student")
                            .from(ExitPermit::Table, ExitPermit::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_exit_permit_manager")
                            .from(ExitPermit::Table, ExitPermit::ManagerId)
                            .to(Manager::Table, Manager::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_exit_permit_student")
                    .table(ExitPermit::Table)
                    .col(ExitPermit::StudentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_exit_permit_status")
                    .table(ExitPermit::Table)
                    .col(ExitPermit::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExitPermit::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ExitPermit {
    Table,
    Id,
    StudentId,
    ManagerId,
    Reason,
    RequestedAt,
    OutAt,
    ReturnAt,
    DocumentPath,
    Status,
    Notes,
    UpdatedAt,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}

#[derive(Iden)]
enum Manager {
    Table,
    Id,
}
