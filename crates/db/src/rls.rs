//! Row-Level Security (RLS) context management.
//!
//! Every tenant table carries a `tenant_isolation` policy keyed on the
//! `app.current_company_id` setting. Compensation transactions set it with
//! `SET LOCAL`, so it never outlives the transaction.

use sea_orm::{ConnectionTrait, DatabaseTransaction, DbErr};

use offset_shared::types::CompanyId;

/// SQL that scopes the current transaction to one company.
#[must_use]
pub fn tenant_context_sql(company_id: CompanyId) -> String {
    format!("SET LOCAL app.current_company_id = '{company_id}'")
}

/// Sets the tenant context on an existing transaction.
///
/// # Errors
///
/// Returns an error if the setting cannot be applied.
pub async fn set_tenant_context(
    txn: &DatabaseTransaction,
    company_id: CompanyId,
) -> Result<(), DbErr> {
    txn.execute_unprepared(&tenant_context_sql(company_id))
        .await?;
    Ok(())
}
