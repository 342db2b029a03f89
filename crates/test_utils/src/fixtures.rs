//! Pre-built Test Fixtures
//!
//! Consistent, predictable data for unit and integration tests. Names come
//! from `fake` so fixtures read like real practice data.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal_macros::dec;

use core_kernel::{ClientId, Currency, FixedClock, Money, TenantId};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A typical session fee
    pub fn usd_session_fee() -> Money {
        Money::new(dec!(120.00), Currency::USD)
    }

    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }

    /// For currency mismatch tests
    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }

    /// Zero decimal places
    pub fn jpy_10000() -> Money {
        Money::new(dec!(10000), Currency::JPY)
    }
}

/// Fixture for dates and instants
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// The date every fixed test clock starts on
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    pub fn due_in_30_days() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
    }

    /// Already past due relative to [`TemporalFixtures::today`]
    pub fn last_month() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    /// Mid-afternoon the day after `today`
    pub fn tomorrow_afternoon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 15, 0, 0).unwrap()
    }

    pub fn fixed_clock() -> FixedClock {
        FixedClock::at_date(Self::today())
    }
}

/// Fixture for tenant and client ids
pub struct IdFixtures;

impl IdFixtures {
    pub fn tenant() -> TenantId {
        TenantId::new(1)
    }

    pub fn other_tenant() -> TenantId {
        TenantId::new(2)
    }

    pub fn client() -> ClientId {
        ClientId::new(100)
    }
}

/// Fixture for realistic strings
pub struct StringFixtures;

impl StringFixtures {
    pub fn clinician_name() -> String {
        format!("Dr. {}", Name().fake::<String>())
    }

    pub fn payer_name() -> String {
        CompanyName().fake()
    }

    pub fn policy_number() -> &'static str {
        "POL-884-2201"
    }
}

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// A number unique within the test process
///
/// Fixed clocks make generated invoice and claim numbers collide, so
/// builders use this instead.
pub fn unique_number(prefix: &str) -> String {
    format!("{}-{:06}", prefix, SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Clock;

    #[test]
    fn test_unique_numbers_differ() {
        assert_ne!(unique_number("INV"), unique_number("INV"));
    }

    #[test]
    fn test_fixed_clock_starts_today() {
        assert_eq!(TemporalFixtures::fixed_clock().today(), TemporalFixtures::today());
    }

    #[test]
    fn test_fake_names_are_not_blank() {
        assert!(StringFixtures::clinician_name().len() > 4);
        assert!(!StringFixtures::payer_name().trim().is_empty());
    }
}
