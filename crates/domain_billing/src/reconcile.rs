//! Invoice status reconciliation

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::invoice::InvoiceStatus;

/// Derives an invoice status from its total and the sum of its payments
///
/// - paid covers the total → `Paid`
/// - something but not everything paid → `PartiallyPaid`
/// - nothing paid, past due, and currently `Sent` → `Overdue`
/// - otherwise the current status is kept
///
/// A zero-total invoice with nothing paid keeps its status, so empty drafts
/// are not reported as paid.
pub fn reconcile_status(
    total_amount: Decimal,
    amount_paid: Decimal,
    current: InvoiceStatus,
    due_date: NaiveDate,
    today: NaiveDate,
) -> InvoiceStatus {
    if amount_paid > Decimal::ZERO || total_amount > Decimal::ZERO {
        if amount_paid >= total_amount {
            return InvoiceStatus::Paid;
        }
        if amount_paid > Decimal::ZERO {
            return InvoiceStatus::PartiallyPaid;
        }
    }

    if amount_paid.is_zero() && due_date < today && current == InvoiceStatus::Sent {
        return InvoiceStatus::Overdue;
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_payment_is_paid() {
        let status = reconcile_status(dec!(100), dec!(100), InvoiceStatus::Sent, date(2024, 1, 31), date(2024, 1, 1));
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_overpayment_is_paid() {
        let status = reconcile_status(dec!(100), dec!(120), InvoiceStatus::PartiallyPaid, date(2024, 1, 31), date(2024, 1, 1));
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_partial_payment() {
        let status = reconcile_status(dec!(100), dec!(0.01), InvoiceStatus::PendingInsurance, date(2024, 1, 31), date(2024, 1, 1));
        assert_eq!(status, InvoiceStatus::PartiallyPaid);
    }

    #[test]
    fn test_sent_past_due_becomes_overdue() {
        let status = reconcile_status(dec!(100), dec!(0), InvoiceStatus::Sent, date(2024, 1, 31), date(2024, 2, 1));
        assert_eq!(status, InvoiceStatus::Overdue);
    }

    #[test]
    fn test_due_today_is_not_overdue() {
        let status = reconcile_status(dec!(100), dec!(0), InvoiceStatus::Sent, date(2024, 1, 31), date(2024, 1, 31));
        assert_eq!(status, InvoiceStatus::Sent);
    }

    #[test]
    fn test_draft_past_due_is_unchanged() {
        let status = reconcile_status(dec!(100), dec!(0), InvoiceStatus::Draft, date(2024, 1, 31), date(2024, 3, 1));
        assert_eq!(status, InvoiceStatus::Draft);
    }

    #[test]
    fn test_zero_total_zero_paid_is_unchanged() {
        let status = reconcile_status(dec!(0), dec!(0), InvoiceStatus::Draft, date(2024, 1, 31), date(2024, 1, 1));
        assert_eq!(status, InvoiceStatus::Draft);
    }
}
