//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than bare `assert_eq!`.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_billing::{Invoice, InvoiceStatus};
use domain_claims::InsuranceClaim;
use domain_telehealth::{SessionStatus, TelehealthSession};

/// Asserts that two Money values are equal within `tolerance`
///
/// # Panics
///
/// Panics if the currencies differ or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

pub fn assert_invoice_status(invoice: &Invoice, expected: InvoiceStatus) {
    assert_eq!(
        invoice.status, expected,
        "Invoice {} ({}) has status {}, expected {} (total={}, paid={})",
        invoice.id, invoice.invoice_number, invoice.status, expected, invoice.total_amount, invoice.amount_paid
    );
}

/// Asserts the paid amount and that the balance is what remains of the total
pub fn assert_invoice_paid(invoice: &Invoice, expected_paid: Decimal) {
    assert_eq!(
        invoice.amount_paid, expected_paid,
        "Invoice {} has amount_paid {}, expected {}",
        invoice.id, invoice.amount_paid, expected_paid
    );
    assert_eq!(
        invoice.balance_due().amount(),
        invoice.total_amount - invoice.amount_paid
    );
}

/// Asserts that the invoice total is the sum of its line totals
pub fn assert_invoice_total_matches_items(invoice: &Invoice) {
    let sum: Decimal = invoice.items.iter().map(|item| item.line_total).sum();
    assert_eq!(
        invoice.total_amount, sum,
        "Invoice {} total {} does not match its {} line(s) summing to {}",
        invoice.id,
        invoice.total_amount,
        invoice.items.len(),
        sum
    );
}

/// Asserts that the claim amount is the sum of its items
pub fn assert_claim_amount_matches_items(claim: &InsuranceClaim) {
    let sum: Decimal = claim.items.iter().map(|item| item.amount).sum();
    assert_eq!(
        claim.claim_amount, sum,
        "Claim {} amount {} does not match its {} item(s) summing to {}",
        claim.claim_number,
        claim.claim_amount,
        claim.items.len(),
        sum
    );
}

/// Asserts status and that the start/end stamps fit that status
pub fn assert_session_state(session: &TelehealthSession, expected: SessionStatus) {
    assert_eq!(session.status, expected, "Session {} status", session.id);
    match expected {
        SessionStatus::Scheduled => {
            assert!(session.started_at.is_none(), "a scheduled session has not started");
            assert!(session.ended_at.is_none());
        }
        SessionStatus::InProgress => {
            assert!(session.started_at.is_some(), "an in-progress session has a start stamp");
            assert!(session.ended_at.is_none());
        }
        SessionStatus::Completed => {
            let (started, ended) = (session.started_at, session.ended_at);
            assert!(
                matches!((started, ended), (Some(s), Some(e)) if s <= e),
                "a completed session has ordered start and end stamps, got {:?} -> {:?}",
                started,
                ended
            );
        }
        SessionStatus::Cancelled | SessionStatus::NoShow => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_within_tolerance() {
        let a = Money::new(dec!(100.00), Currency::USD);
        let b = Money::new(dec!(100.01), Currency::USD);
        assert_money_approx_eq(&a, &b, dec!(0.01));
    }

    #[test]
    #[should_panic(expected = "Currency mismatch")]
    fn test_money_currency_mismatch_panics() {
        let a = Money::new(dec!(100), Currency::USD);
        let b = Money::new(dec!(100), Currency::EUR);
        assert_money_approx_eq(&a, &b, dec!(0));
    }
}
