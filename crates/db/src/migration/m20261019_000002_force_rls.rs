//! Forces row level security on the compensation tables.
//!
//! Without `FORCE`, the table owner skips the `tenant_isolation` policies.
//! Roles with `BYPASSRLS` (and superusers) still skip them.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(FORCE_RLS_SQL)
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(NO_FORCE_RLS_SQL)
            .await?;
        Ok(())
    }
}

const FORCE_RLS_SQL: &str = r"
ALTER TABLE invoices FORCE ROW LEVEL SECURITY;
ALTER TABLE payment_documents FORCE ROW LEVEL SECURITY;
ALTER TABLE payment_items FORCE ROW LEVEL SECURITY;
ALTER TABLE credit_note_applications FORCE ROW LEVEL SECURITY;
";

const NO_FORCE_RLS_SQL: &str = r"
ALTER TABLE invoices NO FORCE ROW LEVEL SECURITY;
ALTER TABLE payment_documents NO FORCE ROW LEVEL SECURITY;
ALTER TABLE payment_items NO FORCE ROW LEVEL SECURITY;
ALTER TABLE credit_note_applications NO FORCE ROW LEVEL SECURITY;
";
