//! Repository implementations for domain entities
//!
//! Each module owns the SQL for one table family and maps rows to domain
//! types. Functions take `&mut PgConnection` so callers decide whether a
//! statement runs inside a transaction.
//!
//! Enum columns are stored as TEXT using each enum's `as_str` form and parsed
//! back with `FromStr`.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::DatabaseError;

pub mod invoices;
pub mod payments;
pub mod claims;
pub mod sessions;

/// Parses a TEXT column into a domain value
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|e| DatabaseError::decode(column, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    #[test]
    fn test_parse_column_reports_column_name() {
        let currency: Currency = parse_column("currency", "usd").unwrap();
        assert_eq!(currency, Currency::USD);

        let err = parse_column::<Currency>("currency", "XYZ").unwrap_err();
        assert!(err.to_string().contains("currency"));
    }
}
