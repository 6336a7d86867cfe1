//! Compensation error types.
//!
//! Every failure surfaces to the caller as a typed error. An empty set of
//! eligible invoices is not an error: the run succeeds with the whole note
//! value left unapplied.

use rust_decimal::Decimal;
use thiserror::Error;

use offset_shared::types::InvoiceId;

use super::types::{DocumentClass, InvoiceStatus, VoucherTypeClass};

/// Errors that can occur while compensating or reversing a credit note.
#[derive(Debug, Error)]
pub enum CompensationError {
    // ========== Precondition Errors ==========
    /// The note is not in a status that allows the requested operation.
    #[error("Credit note {credit_note_id} is {status}, expected {expected}")]
    InvalidCreditNoteState {
        /// The note.
        credit_note_id: InvoiceId,
        /// Its current status.
        status: InvoiceStatus,
        /// What the operation requires.
        expected: &'static str,
    },

    /// The note carries no value to offset.
    #[error("Credit note {credit_note_id} has non-positive total {total}")]
    NonPositiveTotal {
        /// The note.
        credit_note_id: InvoiceId,
        /// Its total.
        total: Decimal,
    },

    /// The document is not a credit or debit note.
    #[error("Invoice {invoice_id} is {voucher_type:?}, not a credit or debit note")]
    NotACreditNote {
        /// The document.
        invoice_id: InvoiceId,
        /// Its voucher class.
        voucher_type: VoucherTypeClass,
    },

    /// The note belongs to the other side of the ledger than the adapter.
    #[error("Credit note is a {actual} document but the ledger is bound to {expected}")]
    DocumentClassMismatch {
        /// The adapter's class.
        expected: DocumentClass,
        /// The note's class.
        actual: DocumentClass,
    },

    /// The note belongs to another company than the adapter.
    #[error("Credit note {0} does not belong to the ledger's company")]
    TenantMismatch(InvoiceId),

    /// The note already has recorded applications.
    #[error("Credit note {0} has already been compensated")]
    AlreadyCompensated(InvoiceId),

    /// The note has no live applications to reverse.
    #[error("Credit note {0} has no applications to reverse")]
    NothingToReverse(InvoiceId),

    // ========== Lookup Errors ==========
    /// The credit note does not exist in the company.
    #[error("Credit note not found: {0}")]
    CreditNoteNotFound(InvoiceId),

    /// An invoice referenced by an application does not exist.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    // ========== Persistence Errors ==========
    /// A concurrent writer touched the same rows; the whole run may be retried.
    #[error("Transaction conflict, please retry: {0}")]
    TransactionConflict(String),

    /// A read or write failed; nothing from this run was persisted.
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl CompensationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCreditNoteState { .. } => "INVALID_CREDIT_NOTE_STATE",
            Self::NonPositiveTotal { .. } => "NON_POSITIVE_TOTAL",
            Self::NotACreditNote { .. } => "NOT_A_CREDIT_NOTE",
            Self::DocumentClassMismatch { .. } => "DOCUMENT_CLASS_MISMATCH",
            Self::TenantMismatch(_) => "TENANT_MISMATCH",
            Self::AlreadyCompensated(_) => "ALREADY_COMPENSATED",
            Self::NothingToReverse(_) => "NOTHING_TO_REVERSE",
            Self::CreditNoteNotFound(_) => "CREDIT_NOTE_NOT_FOUND",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::TransactionConflict(_) => "TRANSACTION_CONFLICT",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict(_))
    }

    /// Returns true if the caller invoked the engine with a note it must not process.
    #[must_use]
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidCreditNoteState { .. }
                | Self::NonPositiveTotal { .. }
                | Self::NotACreditNote { .. }
                | Self::DocumentClassMismatch { .. }
                | Self::TenantMismatch(_)
                | Self::AlreadyCompensated(_)
                | Self::NothingToReverse(_)
        )
    }
}
