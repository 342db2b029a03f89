//! Property-Based Test Generators
//!
//! Proptest strategies for billing data that respects the domain's
//! invariants: non-negative prices, currency-scaled amounts and session
//! durations within the bookable range.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, Money};
use domain_billing::{InvoiceStatus, NewInvoiceItem};
use domain_telehealth::{MAX_DURATION_MINUTES, MIN_DURATION_MINUTES};

pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::CAD),
        Just(Currency::AUD),
        Just(Currency::NZD),
        Just(Currency::JPY),
    ]
}

/// Positive amounts in cents, up to 100,000.00
pub fn positive_cents_strategy() -> impl Strategy<Value = i64> {
    1i64..10_000_000i64
}

pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_cents_strategy(), currency_strategy())
        .prop_map(|(minor, currency)| Money::from_minor(minor, currency))
}

/// A USD amount with two decimal places
pub fn usd_amount_strategy() -> impl Strategy<Value = Decimal> {
    positive_cents_strategy().prop_map(|cents| Decimal::new(cents, 2))
}

/// Quantities such as 1, 0.5 or 2.25 sessions
pub fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=4000i64).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

pub fn service_code_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("90834".to_string())),
        Just(Some("90837".to_string())),
        Just(Some("90791".to_string())),
        Just(Some("90847".to_string())),
    ]
}

pub fn invoice_item_strategy() -> impl Strategy<Value = NewInvoiceItem> {
    ("[A-Z][a-z]{3,12}( [a-z]{3,8}){0,3}", quantity_strategy(), usd_amount_strategy(), service_code_strategy())
        .prop_map(|(description, quantity, unit_price, service_code)| NewInvoiceItem {
            description,
            service_code,
            quantity,
            unit_price,
        })
}

pub fn invoice_items_strategy(max: usize) -> impl Strategy<Value = Vec<NewInvoiceItem>> {
    proptest::collection::vec(invoice_item_strategy(), 1..=max)
}

/// Splits `total_cents` into between one and `max_parts` positive payments
///
/// The parts always sum to the total.
pub fn payment_split_strategy(total_cents: i64, max_parts: usize) -> impl Strategy<Value = Vec<Decimal>> {
    let total = total_cents.max(1);
    let max_parts = max_parts.clamp(1, total as usize);
    proptest::collection::btree_set(1i64..total.max(2), 0..max_parts).prop_map(move |cuts| {
        let mut parts = Vec::with_capacity(cuts.len() + 1);
        let mut previous = 0i64;
        for cut in cuts.into_iter().filter(|c| *c < total) {
            parts.push(Decimal::new(cut - previous, 2));
            previous = cut;
        }
        parts.push(Decimal::new(total - previous, 2));
        parts
    })
}

pub fn invoice_status_strategy() -> impl Strategy<Value = InvoiceStatus> {
    prop_oneof![
        Just(InvoiceStatus::Draft),
        Just(InvoiceStatus::Sent),
        Just(InvoiceStatus::PartiallyPaid),
        Just(InvoiceStatus::Paid),
        Just(InvoiceStatus::Overdue),
        Just(InvoiceStatus::Cancelled),
        Just(InvoiceStatus::PendingInsurance),
        Just(InvoiceStatus::InsuranceDenied),
    ]
}

/// Dates during 2024
pub fn date_2024_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..366i64).prop_map(|days| {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(days)
    })
}

/// Session start times on the quarter hour during 2024
pub fn session_start_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..366i64, 8i64..19i64, 0i64..4i64).prop_map(|(day, hour, quarter)| {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::days(day)
            + Duration::hours(hour)
            + Duration::minutes(quarter * 15)
    })
}

pub fn session_duration_strategy() -> impl Strategy<Value = i32> {
    MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn payment_split_sums_to_total(
            (total, split) in (1i64..1_000_000i64, 1usize..6)
                .prop_flat_map(|(total, parts)| (Just(total), payment_split_strategy(total, parts)))
        ) {
            let sum: Decimal = split.iter().sum();
            prop_assert_eq!(sum, Decimal::new(total, 2));
            prop_assert!(split.iter().all(|part| *part > Decimal::ZERO));
        }

        #[test]
        fn generated_items_pass_validation(item in invoice_item_strategy()) {
            prop_assert!(item.validate().is_ok());
        }

        #[test]
        fn session_durations_are_bookable(minutes in session_duration_strategy()) {
            prop_assert!((5..=480).contains(&minutes));
        }
    }
}
