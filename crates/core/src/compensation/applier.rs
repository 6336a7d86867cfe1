//! State transitions for a compensation run.
//!
//! Turns an [`AllocationPlan`] into application rows and status updates and
//! writes them, in plan order, through the adapter. Atomicity is the
//! responsibility of the transaction the adapter runs in.

use std::collections::HashMap;

use rust_decimal::Decimal;

use offset_shared::types::{InvoiceId, is_settled};

use super::adapter::LedgerAdapter;
use super::error::CompensationError;
use super::planner::AllocationPlan;
use super::types::{InvoiceStatus, InvoiceTransition, NewApplication, PendingInvoice};

/// Everything a run will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    /// Application rows, sequence starting at 1.
    pub applications: Vec<NewApplication>,
    /// Status change per touched invoice.
    pub invoice_transitions: Vec<InvoiceTransition>,
    /// New status for the note; `None` leaves it untouched.
    pub credit_note_status: Option<InvoiceStatus>,
}

/// Stateless state transition applier.
pub struct StateTransitionApplier;

impl StateTransitionApplier {
    /// Status of an invoice that received a payment or application.
    #[must_use]
    pub fn status_after_payment(new_pending: Decimal) -> InvoiceStatus {
        if is_settled(new_pending) {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartialPaid
        }
    }

    /// Status of an invoice whose pending amount went back up.
    ///
    /// Nothing paid at all returns it to `CONFIRMED`.
    #[must_use]
    pub fn status_for_pending(total: Decimal, pending: Decimal) -> InvoiceStatus {
        if is_settled(pending) {
            InvoiceStatus::Paid
        } else if is_settled(total - pending) {
            InvoiceStatus::Confirmed
        } else {
            InvoiceStatus::PartialPaid
        }
    }

    /// Status of the note after a run; `None` when nothing was applied.
    #[must_use]
    pub fn credit_note_status(plan: &AllocationPlan) -> Option<InvoiceStatus> {
        if plan.allocations.is_empty() {
            None
        } else if plan.is_fully_applied() {
            Some(InvoiceStatus::Paid)
        } else {
            Some(InvoiceStatus::PartialPaid)
        }
    }

    /// Derives the rows and status changes for a plan.
    #[must_use]
    pub fn prepare(
        credit_note_id: InvoiceId,
        pending: &[PendingInvoice],
        plan: &AllocationPlan,
    ) -> TransitionPlan {
        let before: HashMap<InvoiceId, Decimal> = pending
            .iter()
            .map(|p| (p.invoice_id, p.pending_amount))
            .collect();

        let mut applications = Vec::with_capacity(plan.allocations.len());
        let mut invoice_transitions = Vec::with_capacity(plan.allocations.len());

        for (sequence, allocation) in (1u32..).zip(&plan.allocations) {
            let previous_pending = before
                .get(&allocation.invoice_id)
                .copied()
                .unwrap_or(allocation.amount);
            let new_pending = previous_pending - allocation.amount;

            applications.push(NewApplication {
                credit_note_id,
                invoice_id: allocation.invoice_id,
                amount: allocation.amount,
                sequence,
                reverses: None,
            });
            invoice_transitions.push(InvoiceTransition {
                invoice_id: allocation.invoice_id,
                previous_pending,
                new_pending,
                status: Self::status_after_payment(new_pending),
            });
        }

        TransitionPlan {
            applications,
            invoice_transitions,
            credit_note_status: Self::credit_note_status(plan),
        }
    }

    /// Writes application rows, then invoice statuses, then the note status.
    pub async fn apply<A>(
        adapter: &A,
        credit_note_id: InvoiceId,
        transitions: &TransitionPlan,
    ) -> Result<(), CompensationError>
    where
        A: LedgerAdapter + ?Sized,
    {
        for application in &transitions.applications {
            adapter.write_application(application).await?;
        }

        for transition in &transitions.invoice_transitions {
            adapter
                .update_invoice_status(transition.invoice_id, transition.status)
                .await?;
        }

        if let Some(status) = transitions.credit_note_status {
            adapter.update_invoice_status(credit_note_id, status).await?;
        }

        Ok(())
    }
}
