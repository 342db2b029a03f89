//! Tests for the clock abstraction

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use core_kernel::{Clock, FixedClock, SystemClock};
use std::sync::Arc;

mod fixed_clock {
    use super::*;

    #[test]
    fn test_at_date_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let clock = FixedClock::at_date(date);
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        assert_eq!(clock.today(), date);
    }

    #[test]
    fn test_set_replaces_instant() {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let later = Utc.with_ymd_and_hms(2025, 6, 30, 8, 0, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_advance_by_days() {
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
        clock.advance(Duration::days(3));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
    }

    #[test]
    fn test_usable_as_trait_object() {
        let clock: Arc<dyn Clock> =
            Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
        assert_eq!(clock.today().to_string(), "2024-05-01");
    }
}

mod system_clock {
    use super::*;

    #[test]
    fn test_system_clock_is_close_to_now() {
        let before = Utc::now();
        let observed = SystemClock.now();
        let after = Utc::now();
        assert!(observed >= before && observed <= after);
    }
}
