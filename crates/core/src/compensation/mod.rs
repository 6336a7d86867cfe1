//! Credit-note and debit-note compensation.
//!
//! When a note is confirmed its value is applied against the debtor's open
//! invoices on the same side of the ledger: the note's original invoice
//! first, then the rest oldest first. Each application is recorded and the
//! affected invoices and the note move to their new status.
//!
//! - `calculator` - Outstanding balance per invoice
//! - `planner` - Priority ordering and greedy allocation
//! - `applier` - Status transitions and application writes
//! - `reversal` - Inverse rows that undo a compensation
//! - `engine` - Orchestration over a [`LedgerAdapter`]

pub mod adapter;
pub mod applier;
pub mod calculator;
pub mod engine;
pub mod error;
pub mod planner;
pub mod reversal;
pub mod types;

#[cfg(test)]
mod memory;
#[cfg(test)]
mod planner_props;

pub use adapter::LedgerAdapter;
pub use applier::{StateTransitionApplier, TransitionPlan};
pub use calculator::{BalanceBreakdown, BalanceSources, OutstandingBalanceCalculator};
pub use engine::CompensationEngine;
pub use error::CompensationError;
pub use planner::{AllocationPlan, AllocationPlanner};
pub use reversal::ReversalService;
pub use types::{
    Allocation, CompensationOutcome, CreditNote, DirectPayment, DocumentClass, InvoiceSnapshot,
    InvoiceStatus, InvoiceTransition, LinkedNote, NewApplication, PendingInvoice,
    RecordedApplication, ReversalOutcome, VoucherTypeClass,
};
