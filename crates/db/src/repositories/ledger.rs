//! `LedgerAdapter` over a database transaction.
//!
//! One adapter serves both sides of the ledger: every query is scoped by the
//! bound company and `document_class`. Eligible invoices are read with
//! `SELECT ... FOR UPDATE` so concurrent runs against the same debtor queue
//! behind each other instead of computing from the same stale balance.

use std::borrow::Cow;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, RuntimeErr, Set, SqlErr,
};
use uuid::Uuid;

use offset_core::compensation::{
    CompensationError, CreditNote, DirectPayment, DocumentClass, InvoiceSnapshot, InvoiceStatus,
    LedgerAdapter, LinkedNote, NewApplication, RecordedApplication,
};
use offset_shared::types::{ApplicationId, CompanyId, DebtorId, InvoiceId};

use crate::entities::{
    credit_note_applications, invoices, payment_documents, payment_items,
    sea_orm_active_enums::{
        DocumentClass as DbDocumentClass, InvoiceStatus as DbInvoiceStatus,
        PaymentDocumentStatus, VoucherTypeClass as DbVoucherTypeClass,
    },
};

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Maps a database error to the engine's error type.
///
/// Serialization failures, deadlocks, lock timeouts and unique violations
/// (a concurrent run wrote the same row first) become
/// [`CompensationError::TransactionConflict`]; everything else is a
/// [`CompensationError::Persistence`] failure.
pub fn map_db_err(err: DbErr) -> CompensationError {
    if is_conflict(&err) {
        CompensationError::TransactionConflict(err.to_string())
    } else {
        CompensationError::Persistence(err.to_string())
    }
}

fn is_conflict(err: &DbErr) -> bool {
    if let Some(code) = sqlstate(err) {
        return matches!(
            code.as_str(),
            SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE
        );
    }
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }

    // Errors that lost their SQLSTATE on the way (e.g. wrapped by a commit).
    let message = err.to_string();
    message.contains("could not serialize access")
        || message.contains("deadlock detected")
        || message.contains("could not obtain lock")
}

fn sqlstate(err: &DbErr) -> Option<String> {
    let (DbErr::Exec(RuntimeErr::SqlxError(e))
    | DbErr::Query(RuntimeErr::SqlxError(e))
    | DbErr::Conn(RuntimeErr::SqlxError(e))) = err
    else {
        return None;
    };
    e.as_database_error()
        .and_then(|db| db.code())
        .map(Cow::into_owned)
}

fn to_i32(sequence: u32) -> Result<i32, CompensationError> {
    i32::try_from(sequence)
        .map_err(|_| CompensationError::Persistence(format!("sequence {sequence} out of range")))
}

fn to_u32(sequence: i32) -> Result<u32, CompensationError> {
    u32::try_from(sequence)
        .map_err(|_| CompensationError::Persistence(format!("negative sequence {sequence}")))
}

fn uuids(ids: &[InvoiceId]) -> Vec<Uuid> {
    ids.iter().map(|id| id.into_inner()).collect()
}

impl From<invoices::Model> for InvoiceSnapshot {
    fn from(model: invoices::Model) -> Self {
        Self {
            id: InvoiceId::from(model.id),
            issue_date: model.issue_date,
            total: model.total,
            status: model.status.into(),
            voucher_type: model.voucher_type.into(),
        }
    }
}

impl From<invoices::Model> for CreditNote {
    fn from(model: invoices::Model) -> Self {
        Self {
            id: InvoiceId::from(model.id),
            company_id: CompanyId::from(model.company_id),
            debtor_id: DebtorId::from(model.debtor_id),
            document_class: model.document_class.into(),
            voucher_type: model.voucher_type.into(),
            total: model.total,
            status: model.status.into(),
            original_invoice_id: model.original_invoice_id.map(InvoiceId::from),
        }
    }
}

impl TryFrom<credit_note_applications::Model> for RecordedApplication {
    type Error = CompensationError;

    fn try_from(model: credit_note_applications::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ApplicationId::from(model.id),
            credit_note_id: InvoiceId::from(model.credit_note_id),
            invoice_id: InvoiceId::from(model.invoice_id),
            amount: model.amount,
            sequence: to_u32(model.sequence)?,
            reverses: model.reverses_application_id.map(ApplicationId::from),
        })
    }
}

/// Ledger adapter bound to one transaction, company and ledger side.
#[derive(Debug, Clone, Copy)]
pub struct SeaOrmLedger<'a> {
    txn: &'a DatabaseTransaction,
    company_id: CompanyId,
    document_class: DocumentClass,
}

impl<'a> SeaOrmLedger<'a> {
    /// Creates an adapter over an open transaction.
    #[must_use]
    pub const fn new(
        txn: &'a DatabaseTransaction,
        company_id: CompanyId,
        document_class: DocumentClass,
    ) -> Self {
        Self {
            txn,
            company_id,
            document_class,
        }
    }

    /// Loads and locks a document by id. Tenant filtering is left to RLS.
    pub async fn lock_document(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Option<invoices::Model>, CompensationError> {
        invoices::Entity::find_by_id(invoice_id.into_inner())
            .lock_exclusive()
            .one(self.txn)
            .await
            .map_err(map_db_err)
    }

    fn class(&self) -> DbDocumentClass {
        self.document_class.into()
    }

    fn company(&self) -> Uuid {
        self.company_id.into_inner()
    }
}

#[async_trait]
impl LedgerAdapter for SeaOrmLedger<'_> {
    fn company_id(&self) -> CompanyId {
        self.company_id
    }

    fn document_class(&self) -> DocumentClass {
        self.document_class
    }

    async fn fetch_eligible_invoices(
        &self,
        debtor_id: DebtorId,
    ) -> Result<Vec<InvoiceSnapshot>, CompensationError> {
        let rows = invoices::Entity::find()
            .filter(invoices::Column::CompanyId.eq(self.company()))
            .filter(invoices::Column::DocumentClass.eq(self.class()))
            .filter(invoices::Column::DebtorId.eq(debtor_id.into_inner()))
            .filter(invoices::Column::VoucherType.eq(DbVoucherTypeClass::Ordinary))
            .filter(
                invoices::Column::Status
                    .is_in([DbInvoiceStatus::Confirmed, DbInvoiceStatus::PartialPaid]),
            )
            .order_by_asc(invoices::Column::IssueDate)
            .order_by_asc(invoices::Column::Id)
            .lock_exclusive()
            .all(self.txn)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(InvoiceSnapshot::from).collect())
    }

    async fn fetch_invoices(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<InvoiceSnapshot>, CompensationError> {
        let rows = invoices::Entity::find()
            .filter(invoices::Column::CompanyId.eq(self.company()))
            .filter(invoices::Column::DocumentClass.eq(self.class()))
            .filter(invoices::Column::Id.is_in(uuids(invoice_ids)))
            .lock_exclusive()
            .all(self.txn)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(InvoiceSnapshot::from).collect())
    }

    async fn fetch_direct_payments(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<DirectPayment>, CompensationError> {
        let rows = payment_items::Entity::find()
            .find_also_related(payment_documents::Entity)
            .filter(payment_items::Column::CompanyId.eq(self.company()))
            .filter(payment_items::Column::InvoiceId.is_in(uuids(invoice_ids)))
            .filter(payment_documents::Column::DocumentClass.eq(self.class()))
            .all(self.txn)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|(item, document)| DirectPayment {
                invoice_id: InvoiceId::from(item.invoice_id),
                amount: item.amount,
                confirmed: document
                    .is_some_and(|d| d.status == PaymentDocumentStatus::Confirmed),
            })
            .collect())
    }

    async fn fetch_applications(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<RecordedApplication>, CompensationError> {
        credit_note_applications::Entity::find()
            .filter(credit_note_applications::Column::CompanyId.eq(self.company()))
            .filter(credit_note_applications::Column::InvoiceId.is_in(uuids(invoice_ids)))
            .all(self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(RecordedApplication::try_from)
            .collect()
    }

    async fn fetch_note_applications(
        &self,
        credit_note_id: InvoiceId,
    ) -> Result<Vec<RecordedApplication>, CompensationError> {
        credit_note_applications::Entity::find()
            .filter(credit_note_applications::Column::CompanyId.eq(self.company()))
            .filter(credit_note_applications::Column::CreditNoteId.eq(credit_note_id.into_inner()))
            .order_by_asc(credit_note_applications::Column::Sequence)
            .all(self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(RecordedApplication::try_from)
            .collect()
    }

    async fn fetch_linked_notes(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<LinkedNote>, CompensationError> {
        let rows = invoices::Entity::find()
            .filter(invoices::Column::CompanyId.eq(self.company()))
            .filter(invoices::Column::DocumentClass.eq(self.class()))
            .filter(invoices::Column::OriginalInvoiceId.is_in(uuids(invoice_ids)))
            .filter(
                invoices::Column::VoucherType
                    .is_in([DbVoucherTypeClass::CreditNote, DbVoucherTypeClass::DebitNote]),
            )
            .filter(invoices::Column::Status.is_in([
                DbInvoiceStatus::Confirmed,
                DbInvoiceStatus::PartialPaid,
                DbInvoiceStatus::Paid,
            ]))
            .all(self.txn)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some(LinkedNote {
                    note_id: InvoiceId::from(row.id),
                    original_invoice_id: InvoiceId::from(row.original_invoice_id?),
                    total: row.total,
                })
            })
            .collect())
    }

    async fn fetch_applied_notes(
        &self,
        note_ids: &[InvoiceId],
    ) -> Result<Vec<InvoiceId>, CompensationError> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = credit_note_applications::Entity::find()
            .select_only()
            .column(credit_note_applications::Column::CreditNoteId)
            .distinct()
            .filter(credit_note_applications::Column::CompanyId.eq(self.company()))
            .filter(credit_note_applications::Column::CreditNoteId.is_in(uuids(note_ids)))
            .into_tuple()
            .all(self.txn)
            .await
            .map_err(map_db_err)?;

        Ok(ids.into_iter().map(InvoiceId::from).collect())
    }

    async fn write_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApplicationId, CompensationError> {
        let id = ApplicationId::new();
        credit_note_applications::ActiveModel {
            id: Set(id.into_inner()),
            company_id: Set(self.company()),
            credit_note_id: Set(application.credit_note_id.into_inner()),
            invoice_id: Set(application.invoice_id.into_inner()),
            amount: Set(application.amount),
            sequence: Set(to_i32(application.sequence)?),
            reverses_application_id: Set(application.reverses.map(ApplicationId::into_inner)),
            ..Default::default()
        }
        .insert(self.txn)
        .await
        .map_err(map_db_err)?;

        Ok(id)
    }

    async fn update_invoice_status(
        &self,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<(), CompensationError> {
        let result = invoices::Entity::update_many()
            .set(invoices::ActiveModel {
                status: Set(status.into()),
                ..Default::default()
            })
            .filter(invoices::Column::Id.eq(invoice_id.into_inner()))
            .filter(invoices::Column::CompanyId.eq(self.company()))
            .exec(self.txn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(CompensationError::InvoiceNotFound(invoice_id));
        }
        Ok(())
    }
}
