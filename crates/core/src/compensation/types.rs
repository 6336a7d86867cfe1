//! Domain types for credit-note compensation.
//!
//! These types describe the invoices, payments and applications the engine
//! reads through a [`LedgerAdapter`](super::adapter::LedgerAdapter), and the
//! plans and outcomes it produces.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use offset_shared::types::{ApplicationId, CompanyId, DebtorId, InvoiceId};

/// Which side of the business a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentClass {
    /// Sales invoices, settled by customer receipts.
    Sales,
    /// Purchase invoices, settled by supplier payment orders.
    Purchase,
}

impl DocumentClass {
    /// Returns the name of the debtor role on this side.
    #[must_use]
    pub const fn debtor_role(self) -> &'static str {
        match self {
            Self::Sales => "customer",
            Self::Purchase => "supplier",
        }
    }
}

impl std::fmt::Display for DocumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sales => write!(f, "sales"),
            Self::Purchase => write!(f, "purchase"),
        }
    }
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// Not yet confirmed.
    Draft,
    /// Confirmed, nothing paid yet.
    Confirmed,
    /// Confirmed and partially paid.
    PartialPaid,
    /// Fully paid.
    Paid,
    /// Cancelled.
    Cancelled,
}

impl InvoiceStatus {
    /// Returns true if the invoice still has an outstanding balance to offset.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Confirmed | Self::PartialPaid)
    }

    /// Returns true if a credit note in this status has been confirmed
    /// and therefore carries value, applied or not.
    #[must_use]
    pub const fn is_effective(self) -> bool {
        matches!(self, Self::Confirmed | Self::PartialPaid | Self::Paid)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "DRAFT"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::PartialPaid => write!(f, "PARTIAL_PAID"),
            Self::Paid => write!(f, "PAID"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Voucher class of an invoice document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherTypeClass {
    /// Ordinary invoice.
    Ordinary,
    /// Credit note (reduces what the debtor owes).
    CreditNote,
    /// Debit note (purchase-side counterpart of a credit note).
    DebitNote,
}

impl VoucherTypeClass {
    /// Returns true for credit and debit notes.
    #[must_use]
    pub const fn is_note(self) -> bool {
        matches!(self, Self::CreditNote | Self::DebitNote)
    }
}

/// A confirmed credit or debit note, resolved by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditNote {
    /// The note's invoice id.
    pub id: InvoiceId,
    /// Tenant scope.
    pub company_id: CompanyId,
    /// Customer or supplier the note was issued to.
    pub debtor_id: DebtorId,
    /// Sales or purchase side.
    pub document_class: DocumentClass,
    /// Must be `CreditNote` or `DebitNote`.
    pub voucher_type: VoucherTypeClass,
    /// Value available to offset.
    pub total: Decimal,
    /// Current lifecycle status.
    pub status: InvoiceStatus,
    /// The invoice this note was issued to correct, if any.
    pub original_invoice_id: Option<InvoiceId>,
}

/// Persisted state of an invoice as read by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSnapshot {
    /// Invoice id.
    pub id: InvoiceId,
    /// Issue date, used for FIFO ordering.
    pub issue_date: NaiveDate,
    /// Invoice total.
    pub total: Decimal,
    /// Current lifecycle status.
    pub status: InvoiceStatus,
    /// Voucher class.
    pub voucher_type: VoucherTypeClass,
}

/// A receipt item (sales) or payment order item (purchase) against an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectPayment {
    /// The invoice being paid.
    pub invoice_id: InvoiceId,
    /// Amount paid.
    pub amount: Decimal,
    /// Whether the parent receipt/payment order is confirmed.
    pub confirmed: bool,
}

/// A credit-note application already persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedApplication {
    /// Row id.
    pub id: ApplicationId,
    /// The applied note.
    pub credit_note_id: InvoiceId,
    /// The invoice it was applied to.
    pub invoice_id: InvoiceId,
    /// Applied amount; negative for reversal rows.
    pub amount: Decimal,
    /// Position within the run that wrote it.
    pub sequence: u32,
    /// Set on reversal rows: the application this row cancels out.
    pub reverses: Option<ApplicationId>,
}

/// A credit/debit note that names an invoice as its original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedNote {
    /// The note's invoice id.
    pub note_id: InvoiceId,
    /// The invoice the note was issued against.
    pub original_invoice_id: InvoiceId,
    /// The note total.
    pub total: Decimal,
}

/// An application row about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    /// The applied note.
    pub credit_note_id: InvoiceId,
    /// Target invoice.
    pub invoice_id: InvoiceId,
    /// Amount; negative for reversal rows.
    pub amount: Decimal,
    /// Position within this run, starting at 1.
    pub sequence: u32,
    /// For reversal rows, the application being cancelled.
    pub reverses: Option<ApplicationId>,
}

/// An invoice with its computed outstanding amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInvoice {
    /// Invoice id.
    pub invoice_id: InvoiceId,
    /// Issue date.
    pub issue_date: NaiveDate,
    /// Outstanding amount after every known reduction.
    pub pending_amount: Decimal,
}

/// One planned or applied allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Target invoice.
    pub invoice_id: InvoiceId,
    /// Amount, rounded to cents.
    pub amount: Decimal,
}

/// Status change of one invoice touched by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTransition {
    /// Invoice id.
    pub invoice_id: InvoiceId,
    /// Pending amount before the run.
    pub previous_pending: Decimal,
    /// Pending amount after the run.
    pub new_pending: Decimal,
    /// Status written by the run.
    pub status: InvoiceStatus,
}

/// Result of a compensation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationOutcome {
    /// The compensated note.
    pub credit_note_id: InvoiceId,
    /// Applications in persisted order.
    pub applications: Vec<Allocation>,
    /// Value of the note left unapplied.
    pub unapplied: Decimal,
    /// Per-invoice status changes, in application order.
    pub invoice_transitions: Vec<InvoiceTransition>,
    /// Status of the note after the run.
    pub credit_note_status: InvoiceStatus,
}

impl CompensationOutcome {
    /// Sum of all applications made.
    #[must_use]
    pub fn total_applied(&self) -> Decimal {
        self.applications.iter().map(|a| a.amount).sum()
    }
}

/// Result of reversing a note's applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalOutcome {
    /// The reversed note.
    pub credit_note_id: InvoiceId,
    /// Inverse rows written, as (invoice, negative amount) pairs.
    pub reversals: Vec<Allocation>,
    /// Per-invoice status changes.
    pub invoice_transitions: Vec<InvoiceTransition>,
    /// Status of the note after the reversal.
    pub credit_note_status: InvoiceStatus,
}
