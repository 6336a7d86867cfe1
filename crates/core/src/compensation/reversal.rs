//! Reversal of a note's applications.
//!
//! Application rows are immutable. Undoing a compensation writes one inverse
//! row per live application, carrying the negated amount and a pointer to the
//! row it cancels, so the ledger keeps its full history.

use std::collections::HashSet;

use rust_decimal::Decimal;

use offset_shared::types::{ApplicationId, InvoiceId};

use super::types::{NewApplication, RecordedApplication};

/// Stateless service for creating inverse application rows.
pub struct ReversalService;

impl ReversalService {
    /// Applications of the note that are neither reversal rows nor already reversed.
    #[must_use]
    pub fn live_applications(rows: &[RecordedApplication]) -> Vec<&RecordedApplication> {
        let reversed: HashSet<ApplicationId> = rows.iter().filter_map(|r| r.reverses).collect();

        rows.iter()
            .filter(|r| r.reverses.is_none() && !reversed.contains(&r.id))
            .collect()
    }

    /// Creates the inverse rows for every live application of the note.
    ///
    /// Sequences continue after the highest sequence already recorded so the
    /// persisted order reads as one history.
    #[must_use]
    pub fn create_reversing_applications(
        credit_note_id: InvoiceId,
        rows: &[RecordedApplication],
    ) -> Vec<NewApplication> {
        let next = rows.iter().map(|r| r.sequence).max().unwrap_or(0) + 1;

        (next..)
            .zip(Self::live_applications(rows))
            .map(|(sequence, row)| NewApplication {
                credit_note_id,
                invoice_id: row.invoice_id,
                amount: -row.amount,
                sequence,
                reverses: Some(row.id),
            })
            .collect()
    }

    /// Returns true if the rows plus the reversals net to zero.
    #[must_use]
    pub fn validate_reversal(rows: &[RecordedApplication], reversals: &[NewApplication]) -> bool {
        let recorded: Decimal = rows.iter().map(|r| r.amount).sum();
        let reversing: Decimal = reversals.iter().map(|r| r.amount).sum();

        recorded + reversing == Decimal::ZERO
    }
}
