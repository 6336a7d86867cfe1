//! Property-based tests for allocation planning.
//!
//! - Conservation: allocated plus remaining equals the note total, and the
//!   allocations never exceed it, even for sub-cent totals
//! - No overshoot: no invoice receives more than it owes
//! - Priority: the original invoice is served first
//! - FIFO: the rest are served oldest first

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use offset_shared::types::InvoiceId;

use super::planner::AllocationPlanner;
use super::types::PendingInvoice;

/// Cent amounts from 0.01 to 100,000.00.
fn cents() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|c| Decimal::new(c, 2))
}

/// Amounts at the stored four decimal places, from 0.0001 to 100,000.0000.
fn fine_amounts() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|units| Decimal::new(units, 4))
}

fn pending_invoices() -> impl Strategy<Value = Vec<PendingInvoice>> {
    prop::collection::vec((0u32..365, cents()), 0..12).prop_map(|items| {
        let base = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        items
            .into_iter()
            .map(|(offset, pending_amount)| PendingInvoice {
                invoice_id: InvoiceId::new(),
                issue_date: base + chrono::Days::new(u64::from(offset)),
                pending_amount,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_plan_conserves_note_total(
        invoices in pending_invoices(),
        total in fine_amounts(),
    ) {
        let plan = AllocationPlanner::plan(invoices, None, total);
        prop_assert_eq!(plan.total_allocated() + plan.remaining, total);
        prop_assert!(plan.total_allocated() <= total);
        prop_assert!(plan.remaining >= Decimal::ZERO);
    }

    #[test]
    fn prop_plan_never_overshoots_an_invoice(
        invoices in pending_invoices(),
        total in cents(),
    ) {
        let plan = AllocationPlanner::plan(invoices.clone(), None, total);
        for allocation in &plan.allocations {
            let invoice = invoices
                .iter()
                .find(|i| i.invoice_id == allocation.invoice_id)
                .unwrap();
            prop_assert!(allocation.amount > Decimal::ZERO);
            prop_assert!(allocation.amount <= invoice.pending_amount);
        }
    }

    #[test]
    fn prop_plan_leaves_remainder_only_when_all_covered(
        invoices in pending_invoices(),
        total in cents(),
    ) {
        let owed: Decimal = invoices.iter().map(|i| i.pending_amount).sum();
        let plan = AllocationPlanner::plan(invoices, None, total);
        if plan.remaining > Decimal::ZERO {
            prop_assert_eq!(plan.total_allocated(), owed);
        }
    }

    #[test]
    fn prop_original_invoice_served_first(
        invoices in pending_invoices(),
        pick in any::<prop::sample::Index>(),
        total in cents(),
    ) {
        prop_assume!(!invoices.is_empty());
        let original = invoices[pick.index(invoices.len())].invoice_id;

        let plan = AllocationPlanner::plan(invoices, Some(original), total);
        prop_assert_eq!(plan.allocations[0].invoice_id, original);
    }

    #[test]
    fn prop_remaining_invoices_served_oldest_first(
        invoices in pending_invoices(),
        total in cents(),
    ) {
        let plan = AllocationPlanner::plan(invoices.clone(), None, total);
        let dates: Vec<NaiveDate> = plan
            .allocations
            .iter()
            .map(|a| {
                invoices
                    .iter()
                    .find(|i| i.invoice_id == a.invoice_id)
                    .map(|i| i.issue_date)
                    .unwrap()
            })
            .collect();
        prop_assert!(dates.windows(2).all(|w| w[0] <= w[1]));
    }
}
