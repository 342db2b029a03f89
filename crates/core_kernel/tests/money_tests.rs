//! Unit tests for the Money module
//!
//! Tests cover money creation, checked arithmetic, currency parsing,
//! rounding of line totals, and display.

use core_kernel::{Money, Currency, MoneyError};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_creates_money_with_correct_amount() {
        let m = Money::new(dec!(100.50), Currency::USD);
        assert_eq!(m.amount(), dec!(100.50));
        assert_eq!(m.currency(), Currency::USD);
    }

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::USD);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_from_minor_handles_jpy_no_decimals() {
        let m = Money::from_minor(10000, Currency::JPY);
        assert_eq!(m.amount(), dec!(10000));
    }

    #[test]
    fn test_zero_is_neither_positive_nor_negative() {
        let m = Money::zero(Currency::EUR);
        assert!(m.is_zero());
        assert!(!m.is_positive());
        assert!(!m.is_negative());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_add_same_currency() {
        let a = Money::new(dec!(40.00), Currency::USD);
        let b = Money::new(dec!(60.00), Currency::USD);
        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(100.00));
    }

    #[test]
    fn test_checked_sub_can_go_negative() {
        let a = Money::new(dec!(10.00), Currency::USD);
        let b = Money::new(dec!(25.00), Currency::USD);
        let result = a.checked_sub(&b).unwrap();
        assert!(result.is_negative());
    }

    #[test]
    fn test_checked_sub_currency_mismatch() {
        let a = Money::new(dec!(10.00), Currency::USD);
        let b = Money::new(dec!(10.00), Currency::GBP);
        assert_eq!(
            a.checked_sub(&b),
            Err(MoneyError::CurrencyMismatch("USD".into(), "GBP".into()))
        );
    }

    #[test]
    fn test_multiply_quantity_then_round() {
        let unit = Money::new(dec!(33.333), Currency::USD);
        let line = unit.multiply(dec!(3)).unwrap().round_to_currency();
        assert_eq!(line.amount(), dec!(100.00));
    }

    #[test]
    fn test_sum_of_empty_is_zero() {
        let total = Money::sum(&[], Currency::CAD).unwrap();
        assert!(total.is_zero());
        assert_eq!(total.currency(), Currency::CAD);
    }

    #[test]
    fn test_sum_rejects_mixed_currencies() {
        let parts = [
            Money::new(dec!(1), Currency::USD),
            Money::new(dec!(1), Currency::EUR),
        ];
        assert!(Money::sum(&parts, Currency::USD).is_err());
    }
}

mod currency {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!(" NZD ".parse::<Currency>().unwrap(), Currency::NZD);
    }

    #[test]
    fn test_parse_unknown_currency() {
        assert!(matches!(
            "XYZ".parse::<Currency>(),
            Err(MoneyError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn test_code_round_trips_through_parse() {
        for c in [Currency::USD, Currency::EUR, Currency::GBP, Currency::CAD, Currency::AUD, Currency::NZD, Currency::JPY] {
            assert_eq!(c.code().parse::<Currency>().unwrap(), c);
        }
    }

    #[test]
    fn test_serde_uses_uppercase_code() {
        assert_eq!(serde_json::to_string(&Currency::AUD).unwrap(), "\"AUD\"");
    }
}

mod display {
    use super::*;

    #[test]
    fn test_money_display_usd() {
        let m = Money::new(dec!(1234.5), Currency::USD);
        assert_eq!(m.to_string(), "$ 1234.50");
    }

    #[test]
    fn test_money_display_jpy() {
        let m = Money::new(dec!(500), Currency::JPY);
        assert_eq!(m.to_string(), "¥ 500");
    }
}
