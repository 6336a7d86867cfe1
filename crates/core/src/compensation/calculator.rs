//! Outstanding-balance calculation.
//!
//! `pending = total - confirmed direct payments - explicit applications - implicit links`
//!
//! An implicit link is a note naming the invoice as its original that has no
//! application row at all. Such legacy notes never went through the engine
//! and are treated as fully consumed by their original invoice. A note with
//! rows against any invoice is accounted for by those rows alone.

use std::collections::HashSet;

use rust_decimal::Decimal;

use offset_shared::types::{InvoiceId, is_settled};

use super::types::{DirectPayment, InvoiceSnapshot, LinkedNote, PendingInvoice, RecordedApplication};

/// Reductions read for a set of invoices.
#[derive(Debug, Clone, Copy)]
pub struct BalanceSources<'a> {
    /// Receipt or payment order items.
    pub payments: &'a [DirectPayment],
    /// Recorded credit-note applications.
    pub applications: &'a [RecordedApplication],
    /// Notes naming one of the invoices as original.
    pub linked_notes: &'a [LinkedNote],
    /// Linked notes with application rows against any invoice.
    pub applied_notes: &'a [InvoiceId],
}

/// How an invoice's pending amount was derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceBreakdown {
    /// Invoice total.
    pub total: Decimal,
    /// Sum of confirmed direct payments.
    pub paid: Decimal,
    /// Sum of recorded applications.
    pub explicitly_applied: Decimal,
    /// Sum of implicitly linked note totals.
    pub implicitly_applied: Decimal,
    /// What is still owed.
    pub pending: Decimal,
}

/// Stateless outstanding-balance calculator.
pub struct OutstandingBalanceCalculator;

impl OutstandingBalanceCalculator {
    /// Derives the pending amount of one invoice.
    ///
    /// `exclude_note` is the note currently being processed; it never counts
    /// as an implicit link of its own original invoice.
    #[must_use]
    pub fn breakdown(
        invoice: &InvoiceSnapshot,
        sources: &BalanceSources<'_>,
        exclude_note: Option<InvoiceId>,
    ) -> BalanceBreakdown {
        let paid: Decimal = sources
            .payments
            .iter()
            .filter(|p| p.invoice_id == invoice.id && p.confirmed)
            .map(|p| p.amount)
            .sum();

        let mut explicit_notes: HashSet<InvoiceId> =
            sources.applied_notes.iter().copied().collect();
        let mut explicitly_applied = Decimal::ZERO;
        for application in sources
            .applications
            .iter()
            .filter(|a| a.invoice_id == invoice.id)
        {
            explicitly_applied += application.amount;
            explicit_notes.insert(application.credit_note_id);
        }

        let implicitly_applied: Decimal = sources
            .linked_notes
            .iter()
            .filter(|n| n.original_invoice_id == invoice.id)
            .filter(|n| Some(n.note_id) != exclude_note)
            .filter(|n| !explicit_notes.contains(&n.note_id))
            .map(|n| n.total)
            .sum();

        BalanceBreakdown {
            total: invoice.total,
            paid,
            explicitly_applied,
            implicitly_applied,
            pending: invoice.total - paid - explicitly_applied - implicitly_applied,
        }
    }

    /// Pending amounts of every eligible invoice that still owes more than half a cent.
    ///
    /// Notes and invoices outside `CONFIRMED`/`PARTIAL_PAID` are skipped even
    /// if the adapter returned them. Input order is preserved.
    #[must_use]
    pub fn outstanding(
        invoices: &[InvoiceSnapshot],
        sources: &BalanceSources<'_>,
        exclude_note: Option<InvoiceId>,
    ) -> Vec<PendingInvoice> {
        invoices
            .iter()
            .filter(|inv| !inv.voucher_type.is_note() && inv.status.is_open())
            .filter_map(|inv| {
                let pending = Self::breakdown(inv, sources, exclude_note).pending;
                (!is_settled(pending)).then_some(PendingInvoice {
                    invoice_id: inv.id,
                    issue_date: inv.issue_date,
                    pending_amount: pending,
                })
            })
            .collect()
    }
}
