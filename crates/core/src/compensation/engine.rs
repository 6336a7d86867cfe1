//! Compensation engine.
//!
//! Runs the calculator, planner and applier for one note against a
//! [`LedgerAdapter`]. Callers own the transaction; a failed run must be
//! rolled back by them.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, info};

use offset_shared::types::{DebtorId, InvoiceId};

use super::adapter::LedgerAdapter;
use super::applier::StateTransitionApplier;
use super::calculator::{BalanceSources, OutstandingBalanceCalculator};
use super::error::CompensationError;
use super::planner::AllocationPlanner;
use super::reversal::ReversalService;
use super::types::{
    Allocation, CompensationOutcome, CreditNote, DirectPayment, InvoiceStatus, InvoiceTransition,
    LinkedNote, PendingInvoice, RecordedApplication, ReversalOutcome,
};

/// Stateless compensation engine.
pub struct CompensationEngine;

impl CompensationEngine {
    /// Applies a confirmed note's value against the debtor's open invoices.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the note is not a confirmed, positive
    /// note of the adapter's company and class, or was already compensated.
    /// Adapter errors are propagated unchanged.
    pub async fn compensate<A>(
        adapter: &A,
        credit_note: &CreditNote,
    ) -> Result<CompensationOutcome, CompensationError>
    where
        A: LedgerAdapter + ?Sized,
    {
        Self::validate_scope(adapter, credit_note)?;

        if credit_note.status != InvoiceStatus::Confirmed {
            return Err(CompensationError::InvalidCreditNoteState {
                credit_note_id: credit_note.id,
                status: credit_note.status,
                expected: "CONFIRMED",
            });
        }
        if credit_note.total <= Decimal::ZERO {
            return Err(CompensationError::NonPositiveTotal {
                credit_note_id: credit_note.id,
                total: credit_note.total,
            });
        }
        if !adapter
            .fetch_note_applications(credit_note.id)
            .await?
            .is_empty()
        {
            return Err(CompensationError::AlreadyCompensated(credit_note.id));
        }

        let pending =
            Self::outstanding_balances(adapter, credit_note.debtor_id, Some(credit_note.id))
                .await?;

        let plan = AllocationPlanner::plan(
            pending.clone(),
            credit_note.original_invoice_id,
            credit_note.total,
        );
        debug!(
            credit_note_id = %credit_note.id,
            eligible = pending.len(),
            planned = plan.allocations.len(),
            remaining = %plan.remaining,
            "allocation planned"
        );

        let transitions = StateTransitionApplier::prepare(credit_note.id, &pending, &plan);
        StateTransitionApplier::apply(adapter, credit_note.id, &transitions).await?;

        let outcome = CompensationOutcome {
            credit_note_id: credit_note.id,
            applications: plan.allocations,
            unapplied: plan.remaining.max(Decimal::ZERO),
            invoice_transitions: transitions.invoice_transitions,
            credit_note_status: transitions
                .credit_note_status
                .unwrap_or(credit_note.status),
        };

        info!(
            credit_note_id = %outcome.credit_note_id,
            document_class = %credit_note.document_class,
            debtor_role = credit_note.document_class.debtor_role(),
            debtor_id = %credit_note.debtor_id,
            applications = %serde_json::to_string(&outcome.applications).unwrap_or_default(),
            applied = %outcome.total_applied(),
            unapplied = %outcome.unapplied,
            credit_note_status = %outcome.credit_note_status,
            "credit note compensated"
        );

        Ok(outcome)
    }

    /// Pending amounts of the debtor's eligible invoices. Pure read.
    ///
    /// # Errors
    ///
    /// Propagates adapter errors.
    pub async fn outstanding_balances<A>(
        adapter: &A,
        debtor_id: DebtorId,
        exclude_note: Option<InvoiceId>,
    ) -> Result<Vec<PendingInvoice>, CompensationError>
    where
        A: LedgerAdapter + ?Sized,
    {
        let invoices = adapter.fetch_eligible_invoices(debtor_id).await?;
        if invoices.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<InvoiceId> = invoices.iter().map(|i| i.id).collect();
        let loaded = LoadedSources::load(adapter, &ids).await?;

        Ok(OutstandingBalanceCalculator::outstanding(
            &invoices,
            &loaded.sources(),
            exclude_note,
        ))
    }

    /// Undoes a note's applications with inverse rows and cancels the note.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the note is out of scope, not in an
    /// effective status, or has nothing left to reverse.
    #[allow(clippy::too_many_lines)]
    pub async fn reverse<A>(
        adapter: &A,
        credit_note: &CreditNote,
    ) -> Result<ReversalOutcome, CompensationError>
    where
        A: LedgerAdapter + ?Sized,
    {
        Self::validate_scope(adapter, credit_note)?;

        if !credit_note.status.is_effective() {
            return Err(CompensationError::InvalidCreditNoteState {
                credit_note_id: credit_note.id,
                status: credit_note.status,
                expected: "CONFIRMED, PARTIAL_PAID or PAID",
            });
        }

        let rows = adapter.fetch_note_applications(credit_note.id).await?;
        let reversals = ReversalService::create_reversing_applications(credit_note.id, &rows);
        if reversals.is_empty() {
            return Err(CompensationError::NothingToReverse(credit_note.id));
        }
        if !ReversalService::validate_reversal(&rows, &reversals) {
            return Err(CompensationError::Persistence(format!(
                "application history of credit note {} does not net to zero",
                credit_note.id
            )));
        }

        // Amount given back to each invoice, in first-seen order.
        let mut order = Vec::new();
        let mut restored: HashMap<InvoiceId, Decimal> = HashMap::new();
        for reversal in &reversals {
            restored
                .entry(reversal.invoice_id)
                .and_modify(|sum| *sum -= reversal.amount)
                .or_insert_with(|| {
                    order.push(reversal.invoice_id);
                    -reversal.amount
                });
        }

        // Balances are read before any write.
        let invoices = adapter.fetch_invoices(&order).await?;
        let loaded = LoadedSources::load(adapter, &order).await?;
        let sources = loaded.sources();

        let mut invoice_transitions = Vec::with_capacity(order.len());
        for invoice_id in &order {
            let invoice = invoices
                .iter()
                .find(|i| i.id == *invoice_id)
                .ok_or(CompensationError::InvoiceNotFound(*invoice_id))?;
            if !invoice.status.is_effective() {
                continue;
            }

            let previous_pending =
                OutstandingBalanceCalculator::breakdown(invoice, &sources, Some(credit_note.id))
                    .pending;
            let new_pending =
                previous_pending + restored.get(invoice_id).copied().unwrap_or_default();
            invoice_transitions.push(InvoiceTransition {
                invoice_id: *invoice_id,
                previous_pending,
                new_pending,
                status: StateTransitionApplier::status_for_pending(invoice.total, new_pending),
            });
        }

        for reversal in &reversals {
            adapter.write_application(reversal).await?;
        }
        for transition in &invoice_transitions {
            adapter
                .update_invoice_status(transition.invoice_id, transition.status)
                .await?;
        }
        adapter
            .update_invoice_status(credit_note.id, InvoiceStatus::Cancelled)
            .await?;

        let outcome = ReversalOutcome {
            credit_note_id: credit_note.id,
            reversals: reversals
                .iter()
                .map(|r| Allocation {
                    invoice_id: r.invoice_id,
                    amount: r.amount,
                })
                .collect(),
            invoice_transitions,
            credit_note_status: InvoiceStatus::Cancelled,
        };

        info!(
            credit_note_id = %outcome.credit_note_id,
            document_class = %credit_note.document_class,
            reversals = %serde_json::to_string(&outcome.reversals).unwrap_or_default(),
            "credit note compensation reversed"
        );

        Ok(outcome)
    }

    /// Checks the document is a note of the adapter's company and class.
    fn validate_scope<A>(adapter: &A, credit_note: &CreditNote) -> Result<(), CompensationError>
    where
        A: LedgerAdapter + ?Sized,
    {
        if !credit_note.voucher_type.is_note() {
            return Err(CompensationError::NotACreditNote {
                invoice_id: credit_note.id,
                voucher_type: credit_note.voucher_type,
            });
        }
        if credit_note.document_class != adapter.document_class() {
            return Err(CompensationError::DocumentClassMismatch {
                expected: adapter.document_class(),
                actual: credit_note.document_class,
            });
        }
        if credit_note.company_id != adapter.company_id() {
            return Err(CompensationError::TenantMismatch(credit_note.id));
        }
        Ok(())
    }
}

/// Balance inputs read for a set of invoices.
struct LoadedSources {
    payments: Vec<DirectPayment>,
    applications: Vec<RecordedApplication>,
    linked_notes: Vec<LinkedNote>,
    applied_notes: Vec<InvoiceId>,
}

impl LoadedSources {
    async fn load<A>(adapter: &A, invoice_ids: &[InvoiceId]) -> Result<Self, CompensationError>
    where
        A: LedgerAdapter + ?Sized,
    {
        let payments = adapter.fetch_direct_payments(invoice_ids).await?;
        let applications = adapter.fetch_applications(invoice_ids).await?;
        let linked_notes = adapter.fetch_linked_notes(invoice_ids).await?;

        let note_ids: Vec<InvoiceId> = linked_notes.iter().map(|n| n.note_id).collect();
        let applied_notes = if note_ids.is_empty() {
            Vec::new()
        } else {
            adapter.fetch_applied_notes(&note_ids).await?
        };

        Ok(Self {
            payments,
            applications,
            linked_notes,
            applied_notes,
        })
    }

    fn sources(&self) -> BalanceSources<'_> {
        BalanceSources {
            payments: &self.payments,
            applications: &self.applications,
            linked_notes: &self.linked_notes,
            applied_notes: &self.applied_notes,
        }
    }
}
