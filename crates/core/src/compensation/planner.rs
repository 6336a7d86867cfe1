//! Allocation planning.
//!
//! Orders eligible invoices (original invoice first, then oldest issue date
//! first) and greedily assigns the note value across them.

use rust_decimal::Decimal;

use offset_shared::types::{InvoiceId, is_settled, round_to_cents, truncate_to_cents};

use super::types::{Allocation, PendingInvoice};

/// Ordered allocations plus what is left of the note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    /// Allocations in application order.
    pub allocations: Vec<Allocation>,
    /// Note value not allocated.
    pub remaining: Decimal,
}

impl AllocationPlan {
    /// Sum of planned allocations.
    #[must_use]
    pub fn total_allocated(&self) -> Decimal {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    /// Returns true if the note value was fully absorbed.
    #[must_use]
    pub fn is_fully_applied(&self) -> bool {
        is_settled(self.remaining)
    }
}

/// Stateless allocation planner.
pub struct AllocationPlanner;

impl AllocationPlanner {
    /// Orders invoices for allocation.
    ///
    /// Ascending issue date, ties broken by invoice id so the order is total.
    /// If `original_invoice_id` is among the invoices it moves to the front.
    #[must_use]
    pub fn order(
        mut invoices: Vec<PendingInvoice>,
        original_invoice_id: Option<InvoiceId>,
    ) -> Vec<PendingInvoice> {
        invoices.sort_by(|a, b| {
            a.issue_date
                .cmp(&b.issue_date)
                .then_with(|| a.invoice_id.cmp(&b.invoice_id))
        });

        if let Some(original) = original_invoice_id
            && let Some(pos) = invoices.iter().position(|i| i.invoice_id == original)
        {
            let priority = invoices.remove(pos);
            invoices.insert(0, priority);
        }

        invoices
    }

    /// Greedily allocates `credit_total` over the invoices in priority order.
    ///
    /// Each allocation is `round_to_cents(min(remaining, pending))`, cut back
    /// to whole cents of `remaining` when rounding up would exceed it. Zero
    /// allocations are skipped. Planning stops once the remainder is settled.
    #[must_use]
    pub fn plan(
        invoices: Vec<PendingInvoice>,
        original_invoice_id: Option<InvoiceId>,
        credit_total: Decimal,
    ) -> AllocationPlan {
        let mut remaining = credit_total;
        let mut allocations = Vec::new();

        for invoice in Self::order(invoices, original_invoice_id) {
            if is_settled(remaining) {
                break;
            }

            let mut amount = round_to_cents(remaining.min(invoice.pending_amount));
            if amount > remaining {
                amount = truncate_to_cents(remaining);
            }
            if amount <= Decimal::ZERO {
                continue;
            }

            allocations.push(Allocation {
                invoice_id: invoice.invoice_id,
                amount,
            });
            remaining -= amount;
        }

        AllocationPlan {
            allocations,
            remaining,
        }
    }
}
