//! Ledger adapter: the capability set the engine reads and writes through.
//!
//! One implementation serves both sides of the business; an adapter is bound
//! to a single company and [`DocumentClass`] and runs inside whatever
//! transaction its owner opened. The engine never opens or commits
//! transactions itself.

use async_trait::async_trait;

use offset_shared::types::{ApplicationId, CompanyId, DebtorId, InvoiceId};

use super::error::CompensationError;
use super::types::{
    DirectPayment, DocumentClass, InvoiceSnapshot, InvoiceStatus, LinkedNote, NewApplication,
    RecordedApplication,
};

/// Data access required by the compensation engine.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Company every query is scoped to.
    fn company_id(&self) -> CompanyId;

    /// Sales or purchase side.
    fn document_class(&self) -> DocumentClass;

    /// Ordinary invoices of the debtor in `CONFIRMED` or `PARTIAL_PAID`.
    ///
    /// Implementations backed by a database must lock the returned rows for
    /// the rest of the transaction.
    async fn fetch_eligible_invoices(
        &self,
        debtor_id: DebtorId,
    ) -> Result<Vec<InvoiceSnapshot>, CompensationError>;

    /// Invoices by id, whatever their status. Locks like
    /// [`fetch_eligible_invoices`](Self::fetch_eligible_invoices).
    async fn fetch_invoices(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<InvoiceSnapshot>, CompensationError>;

    /// Receipt or payment order items against the invoices.
    async fn fetch_direct_payments(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<DirectPayment>, CompensationError>;

    /// Recorded applications against the invoices.
    async fn fetch_applications(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<RecordedApplication>, CompensationError>;

    /// Recorded applications made by one note, ordered by sequence.
    async fn fetch_note_applications(
        &self,
        credit_note_id: InvoiceId,
    ) -> Result<Vec<RecordedApplication>, CompensationError>;

    /// Confirmed notes whose original invoice is one of the ids.
    async fn fetch_linked_notes(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<LinkedNote>, CompensationError>;

    /// Those of the given notes that have at least one application row,
    /// against any invoice.
    async fn fetch_applied_notes(
        &self,
        note_ids: &[InvoiceId],
    ) -> Result<Vec<InvoiceId>, CompensationError>;

    /// Persists one application row.
    async fn write_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApplicationId, CompensationError>;

    /// Writes the status of an invoice or credit note.
    async fn update_invoice_status(
        &self,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<(), CompensationError>;
}
