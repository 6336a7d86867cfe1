//! In-memory ledger used by the engine tests.
//!
//! `MemoryLedger` holds committed state; `MemoryTxn` stages writes on a copy
//! and only publishes them on `commit`, so dropping a transaction after a
//! failure leaves the ledger untouched.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use offset_shared::types::{ApplicationId, CompanyId, DebtorId, InvoiceId};

use super::adapter::LedgerAdapter;
use super::error::CompensationError;
use super::types::{
    CreditNote, DirectPayment, DocumentClass, InvoiceSnapshot, InvoiceStatus, LinkedNote,
    NewApplication, RecordedApplication, VoucherTypeClass,
};

/// A stored invoice or note.
#[derive(Debug, Clone)]
pub struct StoredInvoice {
    pub snapshot: InvoiceSnapshot,
    pub company_id: CompanyId,
    pub debtor_id: DebtorId,
    pub document_class: DocumentClass,
    pub original_invoice_id: Option<InvoiceId>,
}

/// Whole ledger state.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub invoices: Vec<StoredInvoice>,
    pub payments: Vec<DirectPayment>,
    pub applications: Vec<RecordedApplication>,
}

impl LedgerState {
    /// Status of a stored document.
    pub fn status(&self, id: InvoiceId) -> Option<InvoiceStatus> {
        self.invoices
            .iter()
            .find(|i| i.snapshot.id == id)
            .map(|i| i.snapshot.status)
    }

    /// Applications written by one note, in sequence order.
    pub fn applications_of(&self, credit_note_id: InvoiceId) -> Vec<RecordedApplication> {
        let mut rows: Vec<_> = self
            .applications
            .iter()
            .filter(|a| a.credit_note_id == credit_note_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.sequence);
        rows
    }
}

/// Committed ledger plus fixture helpers.
#[derive(Debug)]
pub struct MemoryLedger {
    pub company_id: CompanyId,
    pub debtor_id: DebtorId,
    pub document_class: DocumentClass,
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new(document_class: DocumentClass) -> Self {
        Self {
            company_id: CompanyId::new(),
            debtor_id: DebtorId::new(),
            document_class,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Copy of the committed state.
    pub fn snapshot(&self) -> LedgerState {
        self.state.lock().unwrap().clone()
    }

    /// Adds a confirmed ordinary invoice for the ledger's debtor.
    pub fn add_invoice(&self, issue_date: NaiveDate, total: Decimal) -> InvoiceId {
        self.add_document(
            issue_date,
            total,
            InvoiceStatus::Confirmed,
            VoucherTypeClass::Ordinary,
            None,
        )
    }

    /// Adds a document with full control over its fields.
    pub fn add_document(
        &self,
        issue_date: NaiveDate,
        total: Decimal,
        status: InvoiceStatus,
        voucher_type: VoucherTypeClass,
        original_invoice_id: Option<InvoiceId>,
    ) -> InvoiceId {
        let id = InvoiceId::new();
        self.state.lock().unwrap().invoices.push(StoredInvoice {
            snapshot: InvoiceSnapshot {
                id,
                issue_date,
                total,
                status,
                voucher_type,
            },
            company_id: self.company_id,
            debtor_id: self.debtor_id,
            document_class: self.document_class,
            original_invoice_id,
        });
        id
    }

    /// Adds a confirmed note and returns it resolved for the engine.
    pub fn add_credit_note(
        &self,
        total: Decimal,
        original_invoice_id: Option<InvoiceId>,
    ) -> CreditNote {
        let voucher_type = match self.document_class {
            DocumentClass::Sales => VoucherTypeClass::CreditNote,
            DocumentClass::Purchase => VoucherTypeClass::DebitNote,
        };
        let id = self.add_document(
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            total,
            InvoiceStatus::Confirmed,
            voucher_type,
            original_invoice_id,
        );
        CreditNote {
            id,
            company_id: self.company_id,
            debtor_id: self.debtor_id,
            document_class: self.document_class,
            voucher_type,
            total,
            status: InvoiceStatus::Confirmed,
            original_invoice_id,
        }
    }

    /// Adds a direct payment against an invoice.
    pub fn add_payment(&self, invoice_id: InvoiceId, amount: Decimal, confirmed: bool) {
        self.state.lock().unwrap().payments.push(DirectPayment {
            invoice_id,
            amount,
            confirmed,
        });
    }

    /// Re-reads a note as the caller would before invoking the engine.
    pub fn reload(&self, note: &CreditNote) -> CreditNote {
        let status = self.snapshot().status(note.id).unwrap();
        CreditNote {
            status,
            ..note.clone()
        }
    }

    /// Starts a transaction bound to the ledger's company and class.
    pub fn begin(&self) -> MemoryTxn<'_> {
        MemoryTxn {
            ledger: self,
            company_id: self.company_id,
            document_class: self.document_class,
            staged: Mutex::new(self.snapshot()),
            writes: AtomicUsize::new(0),
            fail_on_write: None,
        }
    }
}

/// A staged transaction over a [`MemoryLedger`].
#[derive(Debug)]
pub struct MemoryTxn<'a> {
    ledger: &'a MemoryLedger,
    company_id: CompanyId,
    document_class: DocumentClass,
    staged: Mutex<LedgerState>,
    writes: AtomicUsize,
    fail_on_write: Option<usize>,
}

impl MemoryTxn<'_> {
    /// Makes the n-th write (1-based) fail with a persistence error.
    pub fn failing_on_write(mut self, n: usize) -> Self {
        self.fail_on_write = Some(n);
        self
    }

    /// Rebinds the transaction to another company.
    pub fn with_company(mut self, company_id: CompanyId) -> Self {
        self.company_id = company_id;
        self
    }

    /// Publishes staged writes.
    pub fn commit(self) {
        let staged = self.staged.into_inner().unwrap();
        *self.ledger.state.lock().unwrap() = staged;
    }

    fn record_write(&self) -> Result<(), CompensationError> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_write == Some(n) {
            return Err(CompensationError::Persistence(format!(
                "injected failure on write {n}"
            )));
        }
        Ok(())
    }

    fn in_scope(&self, invoice: &StoredInvoice) -> bool {
        invoice.company_id == self.company_id && invoice.document_class == self.document_class
    }
}

#[async_trait]
impl LedgerAdapter for MemoryTxn<'_> {
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
        let state = self.staged.lock().unwrap();
        Ok(state
            .invoices
            .iter()
            .filter(|i| self.in_scope(i) && i.debtor_id == debtor_id)
            .filter(|i| !i.snapshot.voucher_type.is_note() && i.snapshot.status.is_open())
            .map(|i| i.snapshot.clone())
            .collect())
    }

    async fn fetch_invoices(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<InvoiceSnapshot>, CompensationError> {
        let state = self.staged.lock().unwrap();
        Ok(state
            .invoices
            .iter()
            .filter(|i| self.in_scope(i) && invoice_ids.contains(&i.snapshot.id))
            .map(|i| i.snapshot.clone())
            .collect())
    }

    async fn fetch_direct_payments(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<DirectPayment>, CompensationError> {
        let state = self.staged.lock().unwrap();
        Ok(state
            .payments
            .iter()
            .filter(|p| invoice_ids.contains(&p.invoice_id))
            .cloned()
            .collect())
    }

    async fn fetch_applications(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<RecordedApplication>, CompensationError> {
        let state = self.staged.lock().unwrap();
        Ok(state
            .applications
            .iter()
            .filter(|a| invoice_ids.contains(&a.invoice_id))
            .cloned()
            .collect())
    }

    async fn fetch_note_applications(
        &self,
        credit_note_id: InvoiceId,
    ) -> Result<Vec<RecordedApplication>, CompensationError> {
        Ok(self.staged.lock().unwrap().applications_of(credit_note_id))
    }

    async fn fetch_linked_notes(
        &self,
        invoice_ids: &[InvoiceId],
    ) -> Result<Vec<LinkedNote>, CompensationError> {
        let state = self.staged.lock().unwrap();
        Ok(state
            .invoices
            .iter()
            .filter(|i| self.in_scope(i) && i.snapshot.voucher_type.is_note())
            .filter(|i| i.snapshot.status.is_effective())
            .filter_map(|i| {
                let original = i.original_invoice_id?;
                invoice_ids.contains(&original).then(|| LinkedNote {
                    note_id: i.snapshot.id,
                    original_invoice_id: original,
                    total: i.snapshot.total,
                })
            })
            .collect())
    }

    async fn fetch_applied_notes(
        &self,
        note_ids: &[InvoiceId],
    ) -> Result<Vec<InvoiceId>, CompensationError> {
        let state = self.staged.lock().unwrap();
        let mut applied: Vec<InvoiceId> = state
            .applications
            .iter()
            .map(|a| a.credit_note_id)
            .filter(|id| note_ids.contains(id))
            .collect();
        applied.sort_unstable();
        applied.dedup();
        Ok(applied)
    }

    async fn write_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApplicationId, CompensationError> {
        self.record_write()?;
        let id = ApplicationId::new();
        self.staged
            .lock()
            .unwrap()
            .applications
            .push(RecordedApplication {
                id,
                credit_note_id: application.credit_note_id,
                invoice_id: application.invoice_id,
                amount: application.amount,
                sequence: application.sequence,
                reverses: application.reverses,
            });
        Ok(id)
    }

    async fn update_invoice_status(
        &self,
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    ) -> Result<(), CompensationError> {
        self.record_write()?;
        let mut state = self.staged.lock().unwrap();
        let invoice = state
            .invoices
            .iter_mut()
            .find(|i| i.snapshot.id == invoice_id)
            .ok_or(CompensationError::InvoiceNotFound(invoice_id))?;
        invoice.snapshot.status = status;
        Ok(())
    }
}
