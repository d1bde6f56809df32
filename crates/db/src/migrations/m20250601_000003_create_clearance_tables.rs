//! Create clearance request, damage line item and payment record tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// One request per student may be outside `COMPLETED` at any time.
const ACTIVE_REQUEST_INDEX_SQL: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_clearance_request_one_active
    ON clearance_request (student_id)
    WHERE status <> 'COMPLETED';
";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClearanceRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClearanceRequest::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClearanceRequest::StudentId).integer().not_null())
                    .col(ColumnDef::new(ClearanceRequest::ManagerId).integer())
                    .col(
                        ColumnDef::new(ClearanceRequest::SubmissionNumber)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ClearanceRequest::TotalFee)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ClearanceRequest::FacilityStatus).string_len(16))
                    .col(
                        ColumnDef::new(ClearanceRequest::AdditionalFee)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ClearanceRequest::Status)
                            .string_len(32)
                            .not_null()
                            .default("FACILITY_VERIFICATION"),
                    )
                    .col(
                        ColumnDef::new(ClearanceRequest::SubmittedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ClearanceRequest::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_clearance_request_student")
                            .from(ClearanceRequest::Table, ClearanceRequest::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_clearance_request_manager")
                            .from(ClearanceRequest::Table, ClearanceRequest::ManagerId)
                            .to(Manager::Table, Manager::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_clearance_request_status")
                    .table(ClearanceRequest::Table)
                    .col(ClearanceRequest::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(ACTIVE_REQUEST_INDEX_SQL)
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DamageLineItem::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DamageLineItem::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DamageLineItem::ClearanceRequestId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DamageLineItem::FacilityName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DamageLineItem::Cost)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_damage_line_item_request")
                            .from(DamageLineItem::Table, DamageLineItem::ClearanceRequestId)
                            .to(ClearanceRequest::Table, ClearanceRequest::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_damage_line_item_request")
                    .table(DamageLineItem::Table)
                    .col(DamageLineItem::ClearanceRequestId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentRecord::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentRecord::ClearanceRequestId).integer())
                    .col(ColumnDef::new(PaymentRecord::StudentId).integer().not_null())
                    .col(
                        ColumnDef::new(PaymentRecord::Amount)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentRecord::ProofPath).string_len(1024))
                    .col(
                        ColumnDef::new(PaymentRecord::ProofStatus)
                            .string_len(16)
                            .not_null()
                            .default("UNVERIFIED"),
                    )
                    .col(ColumnDef::new(PaymentRecord::PaidAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PaymentRecord::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PaymentRecord::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_record_request")
                            .from(PaymentRecord::Table, PaymentRecord::ClearanceRequestId)
                            .to(ClearanceRequest::Table, ClearanceRequest::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_record_student")
                            .from(PaymentRecord::Table, PaymentRecord::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_record_request")
                    .table(PaymentRecord::Table)
                    .col(PaymentRecord::ClearanceRequestId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentRecord::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DamageLineItem::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClearanceRequest::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ClearanceRequest {
    Table,
    Id,
    StudentId,
    ManagerId,
    SubmissionNumber,
    TotalFee,
    FacilityStatus,
    AdditionalFee,
    Status,
    SubmittedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum DamageLineItem {
    Table,
    Id,
    ClearanceRequestId,
    FacilityName,
    Cost,
}

#[derive(Iden)]
enum PaymentRecord {
    Table,
    Id,
    ClearanceRequestId,
    StudentId,
    Amount,
    ProofPath,
    ProofStatus,
    PaidAt,
    CreatedAt,
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
