//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_account_tables;
mod m20250601_000002_create_notification_table;
mod m20250601_000003_create_clearance_tables;
mod m20250601_000004_create_exit_permit_table;
mod m20250601_000005_create_damage_report_table;
mod m20250601_000006_create_announcement_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_account_tables::Migration),
            Box::new(m20250601_000002_create_notification_table::Migration),
            Box::new(m20250601_000003_create_clearance_tables::Migration),
            Box::new(m20250601_000004_create_exit_permit_table::Migration),
            Box::new(m20250601_000005_create_damage_report_table::Migration),
            Box::new(m20250601_000006_create_announcement_table::Migration),
        ]
    }
}
